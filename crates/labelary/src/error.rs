//! Typed errors for the rendering client.

/// Failures talking to the rendering service.
///
/// Use [`LabelaryError::is_retryable()`] to tell throttling apart from
/// permanent failures.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LabelaryError {
    /// The service answered with a non-200 status.
    #[error("labelary error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, usually a plain-text explanation.
        body: String,
    },

    /// The request never produced a response (connect, timeout, body read).
    #[error("labelary request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Every attempt was throttled.
    #[error("all {attempts} attempts failed; last error: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last_error: Box<LabelaryError>,
    },

    /// Client settings were unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LabelaryError {
    /// Whether another attempt may succeed (HTTP 429 only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LabelaryError::Http { status: 429, .. })
    }
}
