//! Exponential backoff, capped, for retry policies.

use std::time::Duration;

/// Exponentially increasing delay with an optional cap. This is the only
/// backoff shape the retry budget (`src/retry.rs`) ever constructs; the
/// BOJ retry formula is `base * 2^(attempt-1)` clamped to `max_backoff`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Option<Duration>,
}

impl Backoff {
    /// Create an exponential backoff strategy
    pub fn exponential(base: Duration) -> Self {
        Backoff { base, max: None }
    }

    /// Set a maximum delay
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = Some(max);
        self
    }

    /// Calculate the delay for a given attempt number (1-indexed)
    pub fn delay(&self, attempt: usize) -> Duration {
        // Calculate 2^(attempt-1) with overflow protection
        let exponent = (attempt.saturating_sub(1)) as u32;
        let multiplier = 2u32.saturating_pow(exponent);

        let exp_delay = self.base.checked_mul(multiplier).unwrap_or(Duration::from_secs(u64::MAX));

        match self.max {
            Some(max) => exp_delay.min(max),
            None => exp_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles_each_time() {
        let backoff = Backoff::exponential(Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(100)); // 100 * 2^0
        assert_eq!(backoff.delay(2), Duration::from_millis(200)); // 100 * 2^1
        assert_eq!(backoff.delay(3), Duration::from_millis(400)); // 100 * 2^2
        assert_eq!(backoff.delay(4), Duration::from_millis(800)); // 100 * 2^3
        assert_eq!(backoff.delay(5), Duration::from_millis(1600)); // 100 * 2^4
    }

    #[test]
    fn exponential_backoff_respects_max() {
        let backoff = Backoff::exponential(Duration::from_millis(100)).with_max(Duration::from_secs(1));

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_secs(1)); // Capped
        assert_eq!(backoff.delay(10), Duration::from_secs(1)); // Still capped
    }

    #[test]
    fn exponential_backoff_handles_overflow() {
        let backoff = Backoff::exponential(Duration::from_secs(1));
        // Attempt 64 would overflow u32, should saturate
        let delay = backoff.delay(64);
        assert!(delay > Duration::from_secs(1_000_000)); // Very large but not panicking
    }
}
