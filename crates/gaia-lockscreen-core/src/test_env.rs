//! Environment for unit tests, backed by the tokio clock.

use std::time::Duration;

use crate::env::Environment;

/// Fixed wall clock: 2014-01-01 08:30:00 UTC.
pub const TEST_WALL_CLOCK_SECS: u64 = 1_388_565_000;

/// Tokio-clock environment. Pair with `start_paused = true` for fake timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestEnv;

impl Environment for TestEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn wall_clock_secs(&self) -> u64 {
        TEST_WALL_CLOCK_SECS
    }
}
