use thiserror::Error;

/// Top-level error kinds for the forensics pipeline (spec §7).
///
/// Every variant carries both a short `.code()` for logs/metrics and a
/// `.user_message()` that is the *only* text ever shown to the end user —
/// internal identifiers, stack traces, and DB details never cross that
/// boundary.
#[derive(Debug, Error)]
pub enum ForensicsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Quota exhausted for user")]
    QuotaExhausted,

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Unsupported media: {reason}")]
    UnsupportedMedia { reason: String },

    #[error("Duplicate upload, reusing {analysis_id}")]
    DuplicateUpload { analysis_id: String },

    #[error("Object store transient error: {0}")]
    StoreTransient(String),

    #[error("Analysis API timed out after {ms}ms")]
    AnalysisTimeout { ms: u64 },

    #[error("Analysis API error ({status}): {message}")]
    AnalysisError { status: u16, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Malformed job: {reason}")]
    FatalBadJob { reason: String },

    #[error("Queue is at capacity")]
    QueueFull,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForensicsError {
    /// Short error code for logs and metrics — never shown to the user.
    pub fn code(&self) -> &'static str {
        match self {
            ForensicsError::Config(_) => "CONFIG_ERROR",
            ForensicsError::QuotaExhausted => "QUOTA_EXHAUSTED",
            ForensicsError::RateLimited { .. } => "RATE_LIMITED",
            ForensicsError::UnsupportedMedia { .. } => "UNSUPPORTED_MEDIA",
            ForensicsError::DuplicateUpload { .. } => "DUPLICATE_UPLOAD",
            ForensicsError::StoreTransient(_) => "STORE_TRANSIENT",
            ForensicsError::AnalysisTimeout { .. } => "ANALYSIS_TIMEOUT",
            ForensicsError::AnalysisError { .. } => "ANALYSIS_ERROR",
            ForensicsError::Persistence(_) => "PERSISTENCE_ERROR",
            ForensicsError::Notification(_) => "NOTIFICATION_ERROR",
            ForensicsError::FatalBadJob { .. } => "FATAL_BAD_JOB",
            ForensicsError::QueueFull => "QUEUE_FULL",
            ForensicsError::Database(_) => "DATABASE_ERROR",
            ForensicsError::Serialization(_) => "SERIALIZATION_ERROR",
            ForensicsError::Io(_) => "IO_ERROR",
            ForensicsError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Short, non-technical text safe to show the end user. Never includes
    /// DB ids, stack traces, or other internal identifiers.
    pub fn user_message(&self) -> String {
        match self {
            ForensicsError::QuotaExhausted => {
                "You've used today's free analyses. Try again after your quota resets.".into()
            }
            ForensicsError::RateLimited { retry_after_secs } => {
                format!("Too many requests, wait {retry_after_secs} seconds and try again.")
            }
            ForensicsError::UnsupportedMedia { reason } => {
                format!("That image couldn't be processed: {reason}")
            }
            ForensicsError::DuplicateUpload { analysis_id } => {
                format!("We've already analyzed this image — see {analysis_id}.")
            }
            ForensicsError::StoreTransient(_) | ForensicsError::AnalysisTimeout { .. } => {
                "Analysis is taking longer than expected and couldn't complete. Your quota has been refunded — please try again.".into()
            }
            ForensicsError::AnalysisError { .. } => {
                "We couldn't analyze that image right now. Your quota has been refunded — please try again shortly.".into()
            }
            ForensicsError::QueueFull => {
                "We're temporarily overloaded. Please try again in a few minutes.".into()
            }
            _ => "Something went wrong on our end. Please try again.".into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForensicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_never_leaks_internal_detail() {
        let e = ForensicsError::Persistence("duplicate key analyses.pk at row 42".into());
        let msg = e.user_message();
        assert!(!msg.contains("row 42"));
        assert!(!msg.contains("analyses.pk"));
    }

    #[test]
    fn quota_exhausted_message_is_actionable() {
        let e = ForensicsError::QuotaExhausted;
        assert!(e.user_message().to_lowercase().contains("quota"));
    }
}
