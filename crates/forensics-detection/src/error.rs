use thiserror::Error;

/// Errors from the analysis API client (spec §6).
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The 30 s hard timeout (§4.4 step 3) elapsed before a response arrived.
    #[error("analysis API request timed out")]
    Timeout,

    /// Non-2xx response.
    #[error("analysis API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (connection refused, DNS, TLS, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not parse as the expected JSON shape.
    #[error("failed to parse analysis response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, DetectionError>;
