use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;

/// Time source for the polling loops.
///
/// The dim ramp and the long-press measurement both reconstruct button hold
/// duration from repeated sensor reads separated by sleeps. Going through
/// this trait lets tests drive those loops with virtual time instead of
/// real sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the tokio timer.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock for tests: `sleep` advances `now` without waiting.
#[cfg(test)]
pub struct MockClock {
    base: Instant,
    advanced: std::sync::Mutex<Duration>,
}

#[cfg(test)]
impl MockClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            advanced: std::sync::Mutex::new(Duration::ZERO),
        }
    }

    /// Total virtual time slept so far.
    pub fn elapsed(&self) -> Duration {
        *self.advanced.lock().unwrap()
    }
}

#[cfg(test)]
#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        *self.advanced.lock().unwrap() += duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_clock_advances_without_waiting() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_secs(5)).await;
        clock.sleep(Duration::from_millis(500)).await;

        assert_eq!(clock.now() - start, Duration::from_millis(5500));
        assert_eq!(clock.elapsed(), Duration::from_millis(5500));
    }
}
