//! Minimum spacing between requests.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Blocks callers until `interval` has passed since the previous request.
///
/// Clones share one clock, so every clone of a client is throttled together.
#[derive(Debug, Clone)]
pub(crate) struct RateLimiter {
    interval: Duration,
    last: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait for the next slot and claim it.
    pub(crate) fn wait(&self) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                let pause = self.interval - elapsed;
                tracing::debug!(?pause, "spacing labelary requests");
                thread::sleep(pause);
            }
        }
        *last = Some(Instant::now());
    }
}
