use thiserror::Error;

/// Errors that can occur within the job queue subsystem.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Underlying SQLite / rusqlite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No job with the given ID exists in the store.
    #[error("job not found: {id}")]
    JobNotFound { id: String },

    /// Enqueue was refused because the queue is at capacity (spec §5 backpressure).
    #[error("queue is at capacity")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, QueueError>;
