use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Unknown package size {0:?}")]
    InvalidSize(String),
    #[error("Search response has no items array")]
    MissingItems,
}

pub type Result<T> = std::result::Result<T, Error>;
