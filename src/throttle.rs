//! Min-interval spacing between outbound requests.
//!
//! The throttle is per-transport, not global: concurrent callers sharing a
//! transport share throttle state, but two independently constructed
//! transports never contend with each other.

use std::sync::Mutex;
use std::time::Duration;

use crate::clock::Clock;
use crate::sleeper::Sleeper;

/// Blocking throttle: enforces a monotonic minimum wall-clock gap since the
/// last request. The first call never waits.
#[derive(Debug)]
pub struct MinIntervalThrottler<C: Clock> {
    min_interval: Duration,
    clock: C,
    last_request_millis: Mutex<Option<u64>>,
}

impl<C: Clock> MinIntervalThrottler<C> {
    pub fn new(min_interval: Duration, clock: C) -> Self {
        Self { min_interval, clock, last_request_millis: Mutex::new(None) }
    }

    /// Block the current thread until the min-interval gap has elapsed,
    /// then record this call as the new "last request" instant.
    pub fn wait(&self) {
        let now = self.clock.now_millis();
        let mut last = self.last_request_millis.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(prev) = *last {
            let elapsed = Duration::from_millis(now.saturating_sub(prev));
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(self.clock.now_millis());
    }
}

/// Async throttle: mirrors [`MinIntervalThrottler`] but awaits a
/// [`Sleeper`] instead of blocking the calling thread.
#[derive(Debug)]
pub struct AsyncMinIntervalThrottler<C: Clock> {
    min_interval: Duration,
    clock: C,
    sleeper: std::sync::Arc<dyn Sleeper>,
    last_request_millis: tokio::sync::Mutex<Option<u64>>,
}

impl<C: Clock> AsyncMinIntervalThrottler<C> {
    pub fn new(min_interval: Duration, clock: C, sleeper: std::sync::Arc<dyn Sleeper>) -> Self {
        Self {
            min_interval,
            clock,
            sleeper,
            last_request_millis: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let now = self.clock.now_millis();
        let mut last = self.last_request_millis.lock().await;
        if let Some(prev) = *last {
            let elapsed = Duration::from_millis(now.saturating_sub(prev));
            if elapsed < self.min_interval {
                self.sleeper.sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(self.clock.now_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Default)]
    struct FakeClock {
        millis: AtomicU64,
    }

    impl FakeClock {
        fn advance(&self, by: u64) {
            self.millis.fetch_add(by, Ordering::SeqCst);
        }
    }

    impl Clock for FakeClock {
        fn now_millis(&self) -> u64 {
            self.millis.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn first_call_never_waits() {
        let throttler = MinIntervalThrottler::new(Duration::from_secs(100), FakeClock::default());
        let start = std::time::Instant::now();
        throttler.wait();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn async_first_call_never_waits() {
        use crate::sleeper::TrackingSleeper;
        let sleeper = TrackingSleeper::new();
        let throttler = AsyncMinIntervalThrottler::new(
            Duration::from_secs(100),
            FakeClock::default(),
            std::sync::Arc::new(sleeper.clone()),
        );
        throttler.wait().await;
        assert_eq!(sleeper.calls(), 0);
    }

    #[tokio::test]
    async fn async_second_call_sleeps_the_remaining_gap() {
        use crate::sleeper::TrackingSleeper;
        let sleeper = TrackingSleeper::new();
        let clock = FakeClock::default();
        let throttler = AsyncMinIntervalThrottler::new(
            Duration::from_millis(1000),
            FakeClock::default(),
            std::sync::Arc::new(sleeper.clone()),
        );
        let _ = &clock; // throttler owns its own clock copy
        throttler.wait().await;
        throttler.wait().await;
        assert_eq!(sleeper.calls(), 1);
    }
}
