//! Fixed-backoff retry policy shared by the provider crates.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::{DataError, Result};

/// Default number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

/// How many times to attempt an operation and how long to wait in between.
///
/// The delay is fixed. A policy with a zero backoff never sleeps, which is what
/// tests use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Pause after each failed attempt that is followed by another one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempts and fixed backoff.
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Creates a policy that retries without sleeping.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Effective number of attempts.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Transient errors (see
    /// [`DataError::is_transient`]) are logged and retried after the backoff;
    /// any other error is returned immediately. When every attempt fails the
    /// last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.attempts();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    warn!(
                        label,
                        attempt,
                        max_attempts,
                        backoff_secs = self.backoff.as_secs_f64(),
                        error = %e,
                        "Attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < max_attempts && !self.backoff.is_zero() {
                        sleep(self.backoff).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::DataNotAvailable(label.to_string())))
    }
}
