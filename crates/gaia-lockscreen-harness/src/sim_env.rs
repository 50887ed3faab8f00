//! Simulated environment on the tokio clock.
//!
//! With a paused clock (`#[tokio::test(start_paused = true)]`) every sleep
//! completes as soon as the runtime is idle, and time only moves when tasks
//! wait on it. Runs are reproducible regardless of machine speed.

use std::time::Duration;

use gaia_lockscreen_core::Environment;
use tokio::time::Instant;

/// Wall clock at simulation start: 2014-01-01 08:30:00 UTC.
pub const DEFAULT_WALL_CLOCK_SECS: u64 = 1_388_565_000;

/// Environment for deterministic simulation.
///
/// Monotonic time is the tokio clock. The wall clock starts at a fixed epoch
/// and advances with virtual time.
#[derive(Debug, Clone, Copy)]
pub struct SimEnv {
    started_at: Instant,
    wall_clock_base: u64,
}

impl SimEnv {
    /// Create an environment starting at [`DEFAULT_WALL_CLOCK_SECS`].
    pub fn new() -> Self {
        Self::with_wall_clock(DEFAULT_WALL_CLOCK_SECS)
    }

    /// Create an environment whose wall clock starts at `secs`.
    pub fn with_wall_clock(secs: u64) -> Self {
        Self { started_at: Instant::now(), wall_clock_base: secs }
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        Instant::now() - self.started_at
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn wall_clock_secs(&self) -> u64 {
        self.wall_clock_base + self.elapsed().as_secs()
    }
}
