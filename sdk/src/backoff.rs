//! Exponential backoff.
//!
//! The Nth consecutive failure waits `min(min_backoff * 2^(N-1), max_backoff)`.
//! No jitter: requests are already spread across nodes, and a deterministic
//! schedule is what lets the retry tests assert exact timings.

use std::time::Duration;

/// Delay after the `failures`-th consecutive failure (1-based).
/// Zero failures means no delay.
pub fn exponential_delay(min: Duration, max: Duration, failures: u32) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    // 2^31 * anything sensible is already past any sane cap.
    let factor = 1u32 << (failures - 1).min(31);
    min.saturating_mul(factor).min(max)
}

/// A running backoff schedule for one retry axis.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before the next try.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        exponential_delay(self.min, self.max, self.failures)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_millis(250);
    const MAX: Duration = Duration::from_secs(8);

    #[test]
    fn doubles_then_caps() {
        let mut backoff = Backoff::new(MIN, MAX);
        let delays: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![250, 500, 1000, 2000, 4000, 8000, 8000, 8000]);
    }

    #[test]
    fn nth_delay_formula_holds() {
        for n in 1..=40u32 {
            let expected = MIN
                .checked_mul(2u32.saturating_pow(n - 1))
                .map_or(MAX, |d| d.min(MAX));
            assert_eq!(exponential_delay(MIN, MAX, n), expected, "n = {n}");
        }
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = Backoff::new(MIN, MAX);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(), MIN);
    }

    #[test]
    fn zero_failures_is_no_delay() {
        assert_eq!(exponential_delay(MIN, MAX, 0), Duration::ZERO);
    }
}
