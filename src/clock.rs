//! Time source used by the rate limiter and the retry policy.
//!
//! All waiting in the fetch loop goes through [`Clock`] so that throttling and
//! backoff can be exercised in tests without real sleeps.

use std::time::{Duration, Instant};

/// A monotonic clock that can also suspend the caller.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspend the current fetch stream for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::time::Instant` and `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

#[cfg(test)]
pub use manual::ManualClock;


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_clock_records_sleeps() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        clock.sleep(Duration::from_secs(2)).await;
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now() - t0, Duration::from_secs(3));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_system_clock_sleeps() {
        let clock = SystemClock;
        let t0 = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.now() - t0 >= Duration::from_millis(5));
    }
}
