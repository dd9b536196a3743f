use thiserror::Error;

/// Errors that can occur during conversation-state operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The stored state payload didn't deserialize to a known variant.
    #[error("corrupt conversation state for ({chat_id}, {user_id}): {reason}")]
    CorruptState {
        chat_id: String,
        user_id: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
