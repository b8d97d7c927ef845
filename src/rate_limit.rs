//! Per-minute request budget for the news API.
//!
//! A [`RateBudget`] counts requests issued in the current 60-second period.
//! Once the count reaches the limit, the next [`RateBudget::acquire`] blocks
//! until the period has elapsed and then starts a fresh one. This is a
//! throttle for a single sequential stream, not a queue.

use crate::clock::Clock;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Default number of requests allowed per period.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 200;

/// Length of one budget period.
pub const BUDGET_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct BudgetState {
    count: u32,
    window_started_at: Instant,
}

/// Rolling request counter owned by the fetch loop.
#[derive(Debug)]
pub struct RateBudget {
    limit: u32,
    period: Duration,
    state: Mutex<BudgetState>,
}

impl RateBudget {
    /// Create a budget of `limit` requests per minute, starting its first period at `now`.
    pub fn new(limit: u32, now: Instant) -> Self {
        Self::with_period(limit, BUDGET_PERIOD, now)
    }

    pub fn with_period(limit: u32, period: Duration, now: Instant) -> Self {
        Self {
            limit: limit.max(1),
            period,
            state: Mutex::new(BudgetState {
                count: 0,
                window_started_at: now,
            }),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Requests counted in the current period.
    pub fn used(&self) -> u32 {
        self.lock().count
    }

    /// Reserve one request, suspending on `clock` first if the period's budget is spent.
    ///
    /// # Arguments
    ///
    /// * `clock` - Time source used both to measure the period and to sleep
    ///
    /// # Returns
    ///
    /// How long the caller was suspended; [`Duration::ZERO`] when the budget
    /// had room.
    #[instrument(level = "debug", skip_all, fields(limit = self.limit))]
    pub async fn acquire<C: Clock>(&self, clock: &C) -> Duration {
        let wait = {
            let mut state = self.lock();
            let elapsed = clock.now().saturating_duration_since(state.window_started_at);
            if elapsed >= self.period {
                state.count = 0;
                state.window_started_at = clock.now();
                None
            } else if state.count >= self.limit {
                Some(self.period - elapsed)
            } else {
                None
            }
        };

        let waited = match wait {
            Some(wait) => {
                info!(
                    used = self.limit,
                    wait_ms = wait.as_millis() as u64,
                    "Request budget exhausted; waiting for next period"
                );
                clock.sleep(wait).await;
                let mut state = self.lock();
                state.count = 0;
                state.window_started_at = clock.now();
                wait
            }
            None => Duration::ZERO,
        };

        let mut state = self.lock();
        state.count += 1;
        debug!(used = state.count, "Request budget reserved");
        waited
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BudgetState> {
        // The state is plain counters; a poisoned lock still holds usable values.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_no_wait_under_limit() {
        let clock = ManualClock::new();
        let budget = RateBudget::new(3, clock.now());
        for _ in 0..3 {
            assert_eq!(budget.acquire(&clock).await, Duration::ZERO);
        }
        assert_eq!(budget.used(), 3);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_waits_out_remainder_of_period() {
        let clock = ManualClock::new();
        let budget = RateBudget::new(3, clock.now());

        budget.acquire(&clock).await;
        clock.advance(Duration::from_secs(10));
        budget.acquire(&clock).await;
        clock.advance(Duration::from_secs(10));
        budget.acquire(&clock).await;
        clock.advance(Duration::from_secs(10));

        // Fourth request at t=30s must wait the remaining 30s.
        let waited = budget.acquire(&clock).await;
        assert_eq!(waited, Duration::from_secs(30));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(30)]);
        assert_eq!(budget.used(), 1);
    }

    #[tokio::test]
    async fn test_default_limit_suspends_before_201st_request() {
        let clock = ManualClock::new();
        let budget = RateBudget::new(DEFAULT_REQUESTS_PER_MINUTE, clock.now());
        for _ in 0..DEFAULT_REQUESTS_PER_MINUTE {
            budget.acquire(&clock).await;
            clock.advance(Duration::from_millis(100));
        }
        assert!(clock.sleeps().is_empty());

        budget.acquire(&clock).await;
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(40)]);
    }

    #[tokio::test]
    async fn test_period_rolls_over_without_waiting() {
        let clock = ManualClock::new();
        let budget = RateBudget::new(2, clock.now());
        budget.acquire(&clock).await;
        budget.acquire(&clock).await;
        clock.advance(Duration::from_secs(61));

        assert_eq!(budget.acquire(&clock).await, Duration::ZERO);
        assert_eq!(budget.used(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let budget = RateBudget::new(0, Instant::now());
        assert_eq!(budget.limit(), 1);
    }
}
