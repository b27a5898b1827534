use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::FeedFetcher;
use crate::models::User;

/// Shared command-execution context: configuration, the feed store, and
/// the HTTP fetcher.
pub struct App {
    pub config: Config,
    pub db: Repository,
    pub fetcher: FeedFetcher,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let db = Repository::new(&config.db_url).await?;
        let fetcher = FeedFetcher::new();

        Ok(Self {
            config,
            db,
            fetcher,
        })
    }

    /// Resolves the current user named in the config through the store.
    /// Commands that need an authenticated context call this explicitly
    /// before doing any work.
    pub async fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user_name
            .as_deref()
            .ok_or_else(|| AppError::Auth("no user is logged in; run `login` first".to_string()))?;

        self.db
            .get_user(name)
            .await?
            .ok_or_else(|| AppError::Auth(format!("user {name:?} is not registered")))
    }
}
