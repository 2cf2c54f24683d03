//! Client configuration.

use std::time::Duration;

/// Environment variable that opts tests and tools into live requests.
pub const LABELARY_ENABLE_ENV: &str = "LABELARY_ENABLE";

/// Settings for a [`LabelaryClient`](crate::LabelaryClient).
///
/// Defaults target the public service, which throttles clients that send
/// more than a few requests per second.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct LabelaryConfig {
    /// Service root, without the `/v1/...` path.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Minimum spacing between two requests from the same client.
    pub min_request_interval: Duration,
    /// Retry policy for throttled (HTTP 429) responses.
    pub retry: RetryConfig,
}

impl Default for LabelaryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.labelary.com".into(),
            timeout: Duration::from_secs(30),
            min_request_interval: Duration::from_millis(400),
            retry: RetryConfig::default(),
        }
    }
}

impl LabelaryConfig {
    /// Same settings pointed at another service root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `true` when `LABELARY_ENABLE=1`.
    pub fn network_enabled_from_env() -> bool {
        std::env::var(LABELARY_ENABLE_ENV).is_ok_and(|v| v.trim() == "1")
    }
}

/// Retry behavior for throttled requests.
///
/// Only errors for which [`LabelaryError::is_retryable()`](crate::LabelaryError::is_retryable)
/// returns `true` are retried.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Whether to randomize delays within `[delay/2, delay]`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(750),
            max_delay: Duration::from_millis(750),
            jitter: false,
        }
    }
}
