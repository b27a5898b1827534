use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::FeedFetcher;
use crate::models::NewPost;

/// Parses an interval like "30s", "1m", or "1m30s" (units: ms, s, m, h).
/// Zero or unparsable intervals are rejected before any network activity.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AppError::Config("interval must not be empty".to_string()));
    }

    let bytes = s.as_bytes();
    let mut total = Duration::ZERO;
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return Err(AppError::Config(format!("invalid interval {s:?}")));
        }
        let value: u64 = s[start..i]
            .parse()
            .map_err(|_| AppError::Config(format!("invalid interval {s:?}")))?;

        let unit_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_digit() {
            i += 1;
        }
        total += match &s[unit_start..i] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value * 60),
            "h" => Duration::from_secs(value * 3600),
            unit => {
                return Err(AppError::Config(format!(
                    "invalid interval unit {unit:?} in {s:?}"
                )))
            }
        };
    }

    if total.is_zero() {
        return Err(AppError::Config("interval must be positive".to_string()));
    }
    Ok(total)
}

/// Runs the ingestion loop until the process is stopped. The first cycle
/// starts immediately; per-cycle failures are reported and never break
/// the loop.
pub async fn run(db: &Repository, fetcher: &FeedFetcher, interval: Duration) -> Result<()> {
    println!("Collecting feeds every {interval:?}");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = scrape_once(db, fetcher).await {
            println!("error during fetch cycle: {err}");
            tracing::warn!("fetch cycle failed: {err}");
        }
    }
}

/// One scheduler tick: pick the stalest feed, stamp its cursor, fetch it,
/// and store each item as a post.
///
/// The cursor is stamped before the network call so a slow or failing feed
/// costs at most one cycle and cannot starve the others.
pub async fn scrape_once(db: &Repository, fetcher: &FeedFetcher) -> Result<()> {
    let Some(feed) = db.next_feed_to_fetch().await? else {
        tracing::debug!("no feeds to fetch");
        return Ok(());
    };

    db.mark_feed_fetched(feed.id).await?;

    let content = fetcher.fetch(&feed.url).await?;
    tracing::debug!(
        "fetched {} items from {} ({})",
        content.items.len(),
        content.title,
        feed.url
    );

    for item in content.items {
        let Some(link) = item.link else {
            tracing::debug!("skipping item without link in {}", feed.url);
            continue;
        };

        let post = NewPost {
            feed_id: feed.id,
            title: item.title,
            url: link,
            description: item.description,
            published_at: item.published_at.unwrap_or_else(Utc::now),
        };

        match db.create_post(post).await {
            Ok(_) => {}
            // Already ingested on an earlier cycle.
            Err(err) if err.is_unique_violation() => {}
            // A bad item aborts that item only, not the feed or the cycle.
            Err(err) => tracing::warn!("failed to store post from {}: {err}", feed.url),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_intervals() {
        assert_eq!(parse_interval("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_interval("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_interval("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn parses_compound_intervals() {
        assert_eq!(parse_interval("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("1h5m").unwrap(), Duration::from_secs(3900));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_interval("abc").unwrap_err(),
            AppError::Config(_)
        ));
        assert!(matches!(
            parse_interval("10").unwrap_err(),
            AppError::Config(_)
        ));
        assert!(matches!(
            parse_interval("10x").unwrap_err(),
            AppError::Config(_)
        ));
        assert!(matches!(parse_interval("").unwrap_err(), AppError::Config(_)));
    }

    #[test]
    fn rejects_non_positive_intervals() {
        assert!(matches!(
            parse_interval("0s").unwrap_err(),
            AppError::Config(_)
        ));
        assert!(matches!(
            parse_interval("0m0s").unwrap_err(),
            AppError::Config(_)
        ));
    }
}
