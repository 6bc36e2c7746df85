//! Jitter to prevent thundering herd.

use rand::Rng;
use std::time::Duration;

/// Symmetric jitter: `delay ± delay*factor`, uniformly distributed, clamped
/// to zero. This is the BOJ transport's own retry formula (`factor = 0.1`)
/// and the only jitter shape `src/retry.rs` ever constructs.
#[derive(Debug, Clone)]
pub struct Jitter {
    factor: f64,
}

impl Jitter {
    /// Create a symmetric jitter strategy with the given factor (e.g. `0.1`
    /// for ±10%).
    pub fn symmetric(factor: f64) -> Self {
        Jitter { factor }
    }

    /// Apply jitter to a delay duration
    pub fn apply(&self, delay: Duration) -> Duration {
        self.apply_with_rng(delay, &mut rand::thread_rng())
    }

    /// Apply jitter with a custom RNG (for testing)
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        let millis = delay.as_millis() as f64;
        let spread = millis * self.factor;
        let offset = if spread > 0.0 { rng.gen_range(-spread..=spread) } else { 0.0 };
        Duration::from_millis((millis + offset).max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn symmetric_jitter_stays_within_factor_band() {
        let jitter = Jitter::symmetric(0.1);
        let delay = Duration::from_secs(10);

        for _ in 0..200 {
            let jittered = jitter.apply(delay);
            assert!(jittered >= Duration::from_secs(9));
            assert!(jittered <= Duration::from_secs(11));
        }
    }

    #[test]
    fn symmetric_jitter_of_zero_delay_is_zero() {
        assert_eq!(Jitter::symmetric(0.1).apply(Duration::from_millis(0)), Duration::from_millis(0));
    }

    #[test]
    fn symmetric_jitter_with_deterministic_rng_is_reproducible() {
        let jitter = Jitter::symmetric(0.1);
        let delay = Duration::from_millis(1000);
        let mut rng = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        assert_eq!(jitter.apply_with_rng(delay, &mut rng), jitter.apply_with_rng(delay, &mut rng2));
    }
}
