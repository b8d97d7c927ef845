//! Retry with exponential backoff for fallible async operations.
//!
//! [`RetryPolicy`] runs an operation up to `max_attempts` times, sleeping
//! `base_delay * 2^attempt` between attempts. Whether a failure is worth
//! another attempt is decided by the error itself through [`Retryable`], so a
//! permanent failure (for example an HTTP 400) returns immediately.
//!
//! # Backoff Strategy
//!
//! With the default policy (3 attempts, 1 second base):
//! ```text
//! attempt 1 fails -> sleep 1s
//! attempt 2 fails -> sleep 2s
//! attempt 3 fails -> give up
//! ```

use crate::clock::Clock;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{error, instrument, warn};

/// Classifies an error as transient or permanent.
pub trait Retryable {
    /// `true` if repeating the operation may succeed.
    fn is_retryable(&self) -> bool;
}

/// Attempt cap and backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    max_attempts: usize,
    /// Delay after the first failed attempt; doubles each time.
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay to wait after the zero-based attempt `attempt` has failed.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempts run out.
    ///
    /// # Arguments
    ///
    /// * `clock` - Where backoff sleeps happen
    /// * `op` - Called with the zero-based attempt number; builds a fresh future each time
    ///
    /// # Errors
    ///
    /// The first error whose [`Retryable::is_retryable`] is `false`, or the
    /// last error once `max_attempts` is reached.
    #[instrument(level = "debug", skip_all, fields(max_attempts = self.max_attempts))]
    pub async fn run<C, T, E, F, Fut>(&self, clock: &C, mut op: F) -> Result<T, E>
    where
        C: Clock,
        E: Retryable + fmt::Display,
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    warn!(attempt = attempt + 1, error = %e, "Permanent failure; not retrying");
                    return Err(e);
                }
                Err(e) => {
                    if attempt + 1 >= self.max_attempts {
                        error!(
                            attempt = attempt + 1,
                            max = self.max_attempts,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "Retries exhausted"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max = self.max_attempts,
                        ?delay,
                        error = %e,
                        "Attempt failed; backing off"
                    );
                    clock.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
