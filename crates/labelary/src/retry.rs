//! Exponential backoff for throttled requests.

use std::time::{Duration, SystemTime};

use crate::config::RetryConfig;
use crate::error::LabelaryError;

/// Execute `op`, retrying retryable errors with exponential backoff.
///
/// Non-retryable errors are returned immediately. On exhausting all attempts
/// the last error is wrapped in [`LabelaryError::RetriesExhausted`].
pub(crate) fn retry_op<T, F>(config: &RetryConfig, mut op: F) -> Result<T, LabelaryError>
where
    F: FnMut() -> Result<T, LabelaryError>,
{
    if config.max_attempts == 0 {
        return Err(LabelaryError::InvalidConfig("max_attempts must be >= 1".into()));
    }

    let mut last_error = None;
    for attempt in 0..config.max_attempts {
        match op() {
            Ok(val) => return Ok(val),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                last_error = Some(e);
                if attempt + 1 < config.max_attempts {
                    let delay = compute_delay(config, attempt);
                    tracing::debug!(attempt = attempt + 1, ?delay, "throttled; retrying");
                    std::thread::sleep(delay);
                }
            }
        }
    }

    match last_error {
        Some(last) => Err(LabelaryError::RetriesExhausted {
            attempts: config.max_attempts,
            last_error: Box::new(last),
        }),
        None => Err(LabelaryError::InvalidConfig("max_attempts must be >= 1".into())),
    }
}

/// Backoff before retry number `attempt + 1` (0-indexed).
///
/// delay = min(initial_delay * 2^attempt, max_delay), optionally jittered
/// into `[delay/2, delay]`.
fn compute_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config
        .initial_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    let capped = base.min(config.max_delay);
    if !config.jitter {
        return capped;
    }

    // System time nanoseconds are enough entropy to spread retries.
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    let half = capped / 2;
    let range = capped.as_nanos().saturating_sub(half.as_nanos());
    if range == 0 {
        return capped;
    }
    let offset = u64::try_from(u128::from(nanos) % range).unwrap_or(0);
    half + Duration::from_nanos(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
        }
    }

    fn throttled() -> LabelaryError {
        LabelaryError::Http {
            status: 429,
            body: String::new(),
        }
    }

    #[test]
    fn delay_doubles_up_to_cap() {
        let cfg = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            jitter: false,
        };
        assert_eq!(compute_delay(&cfg, 0), Duration::from_millis(100));
        assert_eq!(compute_delay(&cfg, 1), Duration::from_millis(200));
        assert_eq!(compute_delay(&cfg, 2), Duration::from_millis(300));
        assert_eq!(compute_delay(&cfg, 31), Duration::from_millis(300));
    }

    #[test]
    fn jitter_stays_within_half_range() {
        let cfg = RetryConfig {
            jitter: true,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(100),
            ..config(3)
        };
        for _ in 0..20 {
            let d = compute_delay(&cfg, 0);
            assert!(d >= Duration::from_millis(50) && d <= Duration::from_millis(100), "{d:?}");
        }
    }

    #[test]
    fn succeeds_after_throttling() {
        let mut calls = 0;
        let out = retry_op(&config(3), || {
            calls += 1;
            if calls < 3 { Err(throttled()) } else { Ok(calls) }
        })
        .unwrap();
        assert_eq!(out, 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let mut calls = 0;
        let err = retry_op::<(), _>(&config(3), || {
            calls += 1;
            Err(LabelaryError::Http {
                status: 400,
                body: "bad".into(),
            })
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, LabelaryError::Http { status: 400, .. }));
    }

    #[test]
    fn exhaustion_wraps_last_error() {
        let mut calls = 0;
        let err = retry_op::<(), _>(&config(2), || {
            calls += 1;
            Err(throttled())
        })
        .unwrap_err();
        assert_eq!(calls, 2);
        match err {
            LabelaryError::RetriesExhausted { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(last_error.is_retryable());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = retry_op(&config(0), || Ok(())).unwrap_err();
        assert!(matches!(err, LabelaryError::InvalidConfig(_)));
    }
}
