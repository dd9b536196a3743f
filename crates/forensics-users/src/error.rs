use thiserror::Error;

/// All user-layer errors. Kept separate from ForensicsError so the gateway
/// can map them to user-facing text without coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Raised when the daily free-tier quota is exhausted (spec §3, §4.2).
    #[error("Quota exhausted: {remaining} remaining, resets {reset_date:?}")]
    QuotaExhausted {
        remaining: i64,
        reset_date: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, UserError>;
