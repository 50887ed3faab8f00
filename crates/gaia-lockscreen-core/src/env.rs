//! Environment abstraction for deterministic testing.
//!
//! Decouples LockScreen logic from system time. Enables deterministic
//! simulation with a paused tokio clock and production use with the real
//! monotonic and wall clocks.

use std::time::Duration;

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// Implementations MUST guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time (`tokio::time::Instant` with a paused
    /// clock).
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::ops::Sub<Output = Duration>
        + std::ops::Add<Duration, Output = Self::Instant>
        + std::fmt::Debug;

    /// Current time (monotonic).
    ///
    /// Subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Transition delays and widget timers are the only users. Dropping the
    /// returned future cancels the timer.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Seconds since the Unix epoch, for the clock widget display.
    fn wall_clock_secs(&self) -> u64;
}
