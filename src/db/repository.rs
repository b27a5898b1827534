use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Feed, FeedFollow, FeedInfo, NewPost, Post, User};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_url: &str) -> Result<Self> {
        let conn = Connection::open(db_url).await?;

        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // User operations

    pub async fn create_user(&self, name: &str) -> Result<User> {
        let name = name.to_string();
        let user = self
            .conn
            .call(move |conn| {
                conn.execute("INSERT INTO users (name) VALUES (?1)", params![name])?;
                let id = conn.last_insert_rowid();
                let user = conn.query_row(
                    "SELECT id, name, created_at, updated_at FROM users WHERE id = ?1",
                    params![id],
                    |row| Ok(user_from_row(row)),
                )?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, name: &str) -> Result<Option<User>> {
        let name = name.to_string();
        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
                        params![name],
                        |row| Ok(user_from_row(row)),
                    )
                    .optional()?;
                Ok(user)
            })
            .await?;
        Ok(user)
    }

    pub async fn get_users(&self) -> Result<Vec<User>> {
        let users = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, created_at, updated_at FROM users ORDER BY name",
                )?;
                let users = stmt
                    .query_map([], |row| Ok(user_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(users)
            })
            .await?;
        Ok(users)
    }

    /// Full reset. Feeds, follows, and posts go with their owners through
    /// the cascading foreign keys.
    pub async fn delete_users(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute("DELETE FROM users", [])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Feed operations

    pub async fn create_feed(&self, name: &str, url: &str, user_id: i64) -> Result<Feed> {
        let name = name.to_string();
        let url = url.to_string();
        let feed = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO feeds (name, url, user_id) VALUES (?1, ?2, ?3)",
                    params![name, url, user_id],
                )?;
                let id = conn.last_insert_rowid();
                let feed = conn.query_row(
                    "SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
                     FROM feeds WHERE id = ?1",
                    params![id],
                    |row| Ok(feed_from_row(row)),
                )?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }

    pub async fn list_feeds(&self) -> Result<Vec<FeedInfo>> {
        let feeds = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT f.name, f.url, u.name
                     FROM feeds f JOIN users u ON f.user_id = u.id
                     ORDER BY f.name",
                )?;
                let feeds = stmt
                    .query_map([], |row| {
                        Ok(FeedInfo {
                            name: row.get(0)?,
                            url: row.get(1)?,
                            user_name: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feeds)
            })
            .await?;
        Ok(feeds)
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let url = url.to_string();
        let feed = self
            .conn
            .call(move |conn| {
                let feed = conn
                    .query_row(
                        "SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
                         FROM feeds WHERE url = ?1",
                        params![url],
                        |row| Ok(feed_from_row(row)),
                    )
                    .optional()?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }

    /// The feed with the oldest fetch cursor, never-fetched feeds first.
    /// Ties are broken by ascending feed id so selection is deterministic.
    pub async fn next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let feed = self
            .conn
            .call(|conn| {
                let feed = conn
                    .query_row(
                        "SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
                         FROM feeds
                         ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
                         LIMIT 1",
                        [],
                        |row| Ok(feed_from_row(row)),
                    )
                    .optional()?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }

    pub async fn mark_feed_fetched(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE feeds SET last_fetched_at = datetime('now'), updated_at = datetime('now')
                     WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Follow operations

    pub async fn create_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let follow = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO feed_follows (user_id, feed_id) VALUES (?1, ?2)",
                    params![user_id, feed_id],
                )?;
                let id = conn.last_insert_rowid();
                let follow = conn.query_row(
                    "SELECT id, user_id, feed_id, created_at, updated_at
                     FROM feed_follows WHERE id = ?1",
                    params![id],
                    |row| Ok(follow_from_row(row)),
                )?;
                Ok(follow)
            })
            .await?;
        Ok(follow)
    }

    pub async fn feed_follows_for_user(&self, user_name: &str) -> Result<Vec<String>> {
        let user_name = user_name.to_string();
        let names = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT f.name
                     FROM feed_follows ff
                     JOIN users u ON ff.user_id = u.id
                     JOIN feeds f ON ff.feed_id = f.id
                     WHERE u.name = ?1
                     ORDER BY f.name",
                )?;
                let names = stmt
                    .query_map(params![user_name], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await?;
        Ok(names)
    }

    /// Returns the number of follow rows removed (0 when the user was not
    /// following the feed).
    pub async fn delete_feed_follow_for_user(&self, url: &str, user_id: i64) -> Result<usize> {
        let url = url.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM feed_follows
                     WHERE user_id = ?1
                       AND feed_id IN (SELECT id FROM feeds WHERE url = ?2)",
                    params![user_id, url],
                )?;
                Ok(removed)
            })
            .await?;
        Ok(removed)
    }

    // Post operations

    /// Append-only insert. A UNIQUE(feed_id, url) violation surfaces as a
    /// storage error; the ingestion loop treats it as "already have it".
    pub async fn create_post(&self, post: NewPost) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO posts (feed_id, title, url, description, published_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        post.feed_id,
                        post.title,
                        post.url,
                        post.description,
                        post.published_at.to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn get_posts_for_user(&self, user_name: &str, limit: i64) -> Result<Vec<Post>> {
        let user_name = user_name.to_string();
        let posts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                            p.created_at, p.updated_at
                     FROM posts p
                     JOIN feed_follows ff ON p.feed_id = ff.feed_id
                     JOIN users u ON ff.user_id = u.id
                     WHERE u.name = ?1
                     ORDER BY p.published_at DESC
                     LIMIT ?2",
                )?;
                let posts = stmt
                    .query_map(params![user_name, limit], |row| Ok(post_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(posts)
            })
            .await?;
        Ok(posts)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get(0).unwrap(),
        name: row.get(1).unwrap(),
        created_at: row
            .get::<_, String>(2)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

fn feed_from_row(row: &Row) -> Feed {
    Feed {
        id: row.get(0).unwrap(),
        name: row.get(1).unwrap(),
        url: row.get(2).unwrap(),
        user_id: row.get(3).unwrap(),
        last_fetched_at: row
            .get::<_, Option<String>>(4)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        created_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

fn follow_from_row(row: &Row) -> FeedFollow {
    FeedFollow {
        id: row.get(0).unwrap(),
        user_id: row.get(1).unwrap(),
        feed_id: row.get(2).unwrap(),
        created_at: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

fn post_from_row(row: &Row) -> Post {
    Post {
        id: row.get(0).unwrap(),
        feed_id: row.get(1).unwrap(),
        title: row.get(2).unwrap(),
        url: row.get(3).unwrap(),
        description: row.get(4).unwrap(),
        published_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        created_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}
