use std::time::{Duration, Instant};

/// Per-source pacing state
///
/// Tracks the shared "last satisfied time" stamp workers pace themselves
/// against, the consecutive-failure streak driving exponential backoff, and
/// the cumulative time spent backing off for observability. Mutated only
/// behind the rate limiter's per-source lock.
#[derive(Debug, Clone)]
pub struct PaceState {
    /// Minimum delay between requests to this source
    pub min_delay: Duration,

    /// When the last request was allowed through
    pub last_issued: Option<Instant>,

    /// Consecutive failures since the last success
    pub consecutive_failures: u32,

    /// Total backoff time handed out for this source
    pub cumulative_backoff: Duration,
}

impl PaceState {
    /// Creates pacing state with the given minimum inter-request delay
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_issued: None,
            consecutive_failures: 0,
            cumulative_backoff: Duration::ZERO,
        }
    }

    /// Calculates the time until the next request may be issued
    ///
    /// Returns `None` if a request can go out now, or the duration to wait.
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let last = self.last_issued?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.min_delay {
            Some(self.min_delay - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was allowed through at `now`
    pub fn record_issued(&mut self, now: Instant) {
        self.last_issued = Some(now);
    }

    /// Records a failure and returns the backoff delay to apply
    ///
    /// The schedule is `base * 2^(streak - 1)` capped at `cap`, so the first
    /// failure waits `base` and each further failure doubles the wait.
    pub fn record_failure(&mut self, base: Duration, cap: Duration) -> Duration {
        self.consecutive_failures += 1;

        // Exponent clamped so the shift can never overflow the multiplier
        let exponent = (self.consecutive_failures - 1).min(16);
        let delay = base.saturating_mul(1u32 << exponent).min(cap);

        self.cumulative_backoff += delay;
        delay
    }

    /// Clears the failure streak after a successful request
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(500);
    const CAP: Duration = Duration::from_secs(30);

    #[test]
    fn test_new_pace_state() {
        let state = PaceState::new(Duration::from_millis(1000));
        assert!(state.last_issued.is_none());
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.cumulative_backoff, Duration::ZERO);
    }

    #[test]
    fn test_ready_immediately_with_no_history() {
        let state = PaceState::new(Duration::from_millis(1000));
        assert!(state.time_until_ready(Instant::now()).is_none());
    }

    #[test]
    fn test_not_ready_too_soon() {
        let mut state = PaceState::new(Duration::from_millis(1000));
        let now = Instant::now();
        state.record_issued(now);

        let wait = state.time_until_ready(now + Duration::from_millis(400));
        assert_eq!(wait, Some(Duration::from_millis(600)));
    }

    #[test]
    fn test_ready_after_min_delay() {
        let mut state = PaceState::new(Duration::from_millis(1000));
        let now = Instant::now();
        state.record_issued(now);

        assert!(state
            .time_until_ready(now + Duration::from_millis(1100))
            .is_none());
    }

    #[test]
    fn test_backoff_doubles_per_failure() {
        let mut state = PaceState::new(Duration::from_millis(100));

        assert_eq!(state.record_failure(BASE, CAP), Duration::from_millis(500));
        assert_eq!(state.record_failure(BASE, CAP), Duration::from_millis(1000));
        assert_eq!(state.record_failure(BASE, CAP), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_is_monotonic_and_capped() {
        let mut state = PaceState::new(Duration::from_millis(100));

        let mut last = Duration::ZERO;
        for _ in 0..12 {
            let delay = state.record_failure(BASE, CAP);
            assert!(delay >= last);
            assert!(delay <= CAP);
            last = delay;
        }
        assert_eq!(last, CAP);
    }

    #[test]
    fn test_success_resets_streak() {
        let mut state = PaceState::new(Duration::from_millis(100));

        state.record_failure(BASE, CAP);
        state.record_failure(BASE, CAP);
        state.record_success();

        // Back to the base of the schedule
        assert_eq!(state.record_failure(BASE, CAP), Duration::from_millis(500));
    }

    #[test]
    fn test_cumulative_backoff_accumulates() {
        let mut state = PaceState::new(Duration::from_millis(100));

        state.record_failure(BASE, CAP);
        state.record_failure(BASE, CAP);

        assert_eq!(state.cumulative_backoff, Duration::from_millis(1500));
    }
}
