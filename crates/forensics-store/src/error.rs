use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("image decode failed: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
