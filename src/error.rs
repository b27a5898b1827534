use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors surfaced by the feed fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid feed document: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("storage error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{0}")]
    Argument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// True when the underlying storage error is a SQLite constraint
    /// violation (duplicate user name, feed URL, follow, or post URL).
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            AppError::Storage(tokio_rusqlite::Error::Rusqlite(
                rusqlite::Error::SqliteFailure(err, _),
            )) if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
