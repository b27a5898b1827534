use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;

use crate::error::FetchError;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A fetched feed, normalized from the RSS/Atom document.
#[derive(Debug, Clone)]
pub struct FeedContent {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    /// Parsed from the RFC 822-style date the feed emits; `None` when the
    /// feed supplies nothing parseable.
    pub published_at: Option<DateTime<Utc>>,
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetches and decodes a single feed. No retries at this layer; the
    /// scheduler simply comes back to the feed on a later cycle.
    pub async fn fetch(&self, url: &str) -> Result<FeedContent, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let bytes = response.bytes().await?;
        let feed = parser::parse(&bytes[..]).map_err(|e| FetchError::Parse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| FeedItem {
                title: entry
                    .title
                    .map(|t| unescape_entities(&t.content))
                    .unwrap_or_else(|| "Untitled".to_string()),
                link: entry.links.first().map(|l| l.href.clone()),
                description: entry.summary.map(|s| unescape_entities(&s.content)),
                published_at: entry.published.or(entry.updated),
            })
            .collect();

        Ok(FeedContent {
            title: feed
                .title
                .map(|t| unescape_entities(&t.content))
                .unwrap_or_default(),
            link: feed
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            description: feed
                .description
                .map(|d| unescape_entities(&d.content))
                .unwrap_or_default(),
            items,
        })
    }
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes residual XML/HTML entities in already-parsed text. Feeds often
/// double-escape titles ("AT&amp;amp;T"), so one more pass is needed on top
/// of the XML decoding. Text that is not valid escape syntax (a bare `&`)
/// is returned unchanged.
fn unescape_entities(text: &str) -> String {
    match quick_xml::escape::unescape(text) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_double_escaped_entities() {
        assert_eq!(unescape_entities("Hello &amp; World"), "Hello & World");
        assert_eq!(unescape_entities("AT&amp;amp;T"), "AT&amp;T");
        assert_eq!(unescape_entities("&lt;b&gt;bold&lt;/b&gt;"), "<b>bold</b>");
    }

    #[test]
    fn leaves_plain_and_malformed_text_alone() {
        assert_eq!(unescape_entities("plain title"), "plain title");
        assert_eq!(unescape_entities("fish & chips"), "fish & chips");
    }
}
