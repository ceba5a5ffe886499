//! Time primitives injected into the polling loop.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Monotonic timestamp source and sleep primitive.
///
/// Injected into the runner so tests can drive the deadline/poll loop with
/// simulated time and count sleeps instead of waiting them out.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Suspend the caller for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by `Instant` and tokio's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.now() >= before);
    }
}
