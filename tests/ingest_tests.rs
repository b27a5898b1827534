use chrono::Utc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rssagg::db::Repository;
use rssagg::error::AppError;
use rssagg::feed::FeedFetcher;
use rssagg::scheduler::scrape_once;

fn sample_rss() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>http://example.com/</link>
    <description>Test description</description>
    <item>
      <title>Hello &amp;amp; World</title>
      <link>http://example.com/1</link>
      <guid>1</guid>
      <pubDate>Mon, 21 Oct 2024 07:28:00 GMT</pubDate>
      <description>First</description>
    </item>
    <item>
      <title>Item 2</title>
      <link>http://example.com/2</link>
      <guid>2</guid>
      <pubDate>not a real date</pubDate>
      <description>Second</description>
    </item>
  </channel>
</rss>"#
        .to_string()
}

async fn repo_with_feed(dir: &TempDir, url: &str) -> (Repository, i64) {
    let db_path = dir.path().join("test.db");
    let repo = Repository::new(db_path.to_str().unwrap()).await.unwrap();
    let user = repo.create_user("alice").await.unwrap();
    let feed = repo.create_feed("test", url, user.id).await.unwrap();
    repo.create_feed_follow(user.id, feed.id).await.unwrap();
    (repo, feed.id)
}

fn count_posts(dir: &TempDir) -> i64 {
    let conn = rusqlite::Connection::open(dir.path().join("test.db")).unwrap();
    conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
        .unwrap()
}

fn cursor_is_stamped(dir: &TempDir, feed_id: i64) -> bool {
    let conn = rusqlite::Connection::open(dir.path().join("test.db")).unwrap();
    let value: Option<String> = conn
        .query_row(
            "SELECT last_fetched_at FROM feeds WHERE id = ?1",
            rusqlite::params![feed_id],
            |row| row.get(0),
        )
        .unwrap();
    value.is_some()
}

async fn mock_feed_server(body: &str, status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body.to_string()),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn one_tick_ingests_items_and_stamps_the_cursor() {
    let server = mock_feed_server(&sample_rss(), 200).await;
    let dir = tempfile::tempdir().unwrap();
    let (repo, feed_id) = repo_with_feed(&dir, &format!("{}/feed", server.uri())).await;
    let fetcher = FeedFetcher::new();

    scrape_once(&repo, &fetcher).await.unwrap();

    assert_eq!(count_posts(&dir), 2);
    assert!(cursor_is_stamped(&dir, feed_id));

    let posts = repo.get_posts_for_user("alice", 10).await.unwrap();
    let hello = posts
        .iter()
        .find(|p| p.url == "http://example.com/1")
        .unwrap();
    // Entity-unescaped title, RFC 822 publish date parsed as-is.
    assert_eq!(hello.title, "Hello & World");
    assert_eq!(
        hello.published_at,
        "2024-10-21T07:28:00Z".parse::<chrono::DateTime<Utc>>().unwrap()
    );
}

#[tokio::test]
async fn unparsable_publish_date_falls_back_to_now() {
    let server = mock_feed_server(&sample_rss(), 200).await;
    let dir = tempfile::tempdir().unwrap();
    let (repo, _) = repo_with_feed(&dir, &format!("{}/feed", server.uri())).await;
    let fetcher = FeedFetcher::new();

    let before = Utc::now();
    scrape_once(&repo, &fetcher).await.unwrap();
    let after = Utc::now();

    let posts = repo.get_posts_for_user("alice", 10).await.unwrap();
    let fallback = posts
        .iter()
        .find(|p| p.url == "http://example.com/2")
        .unwrap();
    assert!(fallback.published_at >= before - chrono::Duration::seconds(1));
    assert!(fallback.published_at <= after + chrono::Duration::seconds(1));
}

#[tokio::test]
async fn second_tick_with_same_items_is_a_noop() {
    let server = mock_feed_server(&sample_rss(), 200).await;
    let dir = tempfile::tempdir().unwrap();
    let (repo, _) = repo_with_feed(&dir, &format!("{}/feed", server.uri())).await;
    let fetcher = FeedFetcher::new();

    scrape_once(&repo, &fetcher).await.unwrap();
    scrape_once(&repo, &fetcher).await.unwrap();

    assert_eq!(count_posts(&dir), 2);
}

#[tokio::test]
async fn http_500_is_a_fetch_error_but_still_stamps_the_cursor() {
    let server = mock_feed_server("server on fire", 500).await;
    let dir = tempfile::tempdir().unwrap();
    let (repo, feed_id) = repo_with_feed(&dir, &format!("{}/feed", server.uri())).await;
    let fetcher = FeedFetcher::new();

    let err = scrape_once(&repo, &fetcher).await.unwrap_err();
    assert!(matches!(err, AppError::Fetch(_)));

    assert_eq!(count_posts(&dir), 0);
    assert!(cursor_is_stamped(&dir, feed_id));
}

#[tokio::test]
async fn malformed_xml_is_a_fetch_error() {
    let server = mock_feed_server("this is not xml at all", 200).await;
    let dir = tempfile::tempdir().unwrap();
    let (repo, _) = repo_with_feed(&dir, &format!("{}/feed", server.uri())).await;
    let fetcher = FeedFetcher::new();

    let err = scrape_once(&repo, &fetcher).await.unwrap_err();
    assert!(matches!(err, AppError::Fetch(_)));
}

#[tokio::test]
async fn tick_with_no_feeds_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let repo = Repository::new(db_path.to_str().unwrap()).await.unwrap();
    let fetcher = FeedFetcher::new();

    scrape_once(&repo, &fetcher).await.unwrap();
}
