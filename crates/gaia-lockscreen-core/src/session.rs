//! Lock session timing.
//!
//! Tracks how long the device stayed locked and unlocked, so the passcode can
//! be skipped when the user relocks within the configured timeout. Until the
//! first unlock there is no unlocked session to measure, and the passcode is
//! always required.
//!
//! Pure: time is passed in, nothing is read from a clock.

use std::{ops::Sub, time::Duration};

/// Locked/unlocked interval bookkeeping.
#[derive(Debug, Clone)]
pub struct LockSession<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    locked: bool,
    unlocked_once: bool,
    last_locked_at: I,
    last_unlocked_at: I,
    last_locked_interval: Duration,
    last_unlocked_interval: Duration,
}

impl<I> LockSession<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Start a session that is locked since `now`.
    pub fn new(now: I) -> Self {
        Self {
            locked: true,
            unlocked_once: false,
            last_locked_at: now,
            last_unlocked_at: now,
            last_locked_interval: Duration::ZERO,
            last_unlocked_interval: Duration::ZERO,
        }
    }

    /// Returns true while locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// End the unlocked session. No-op if already locked.
    pub fn lock(&mut self, now: I) {
        if self.locked {
            return;
        }
        self.locked = true;
        self.last_unlocked_interval = now - self.last_unlocked_at;
        self.last_locked_at = now;
    }

    /// End the locked session. No-op if already unlocked.
    pub fn unlock(&mut self, now: I) {
        if !self.locked {
            return;
        }
        self.locked = false;
        self.unlocked_once = true;
        self.last_locked_interval = now - self.last_locked_at;
        self.last_unlocked_at = now;
    }

    /// Length of the current locked session, or of the last one if unlocked.
    pub fn locked_interval(&self, now: I) -> Duration {
        if self.locked { now - self.last_locked_at } else { self.last_locked_interval }
    }

    /// Length of the current unlocked session, or of the last one if locked.
    pub fn unlocked_interval(&self, now: I) -> Duration {
        if self.locked { self.last_unlocked_interval } else { now - self.last_unlocked_at }
    }

    /// Returns true if the passcode must be entered.
    ///
    /// Without a configured timeout, or before the first unlock, the passcode
    /// is always required. Otherwise it is required once either interval
    /// exceeds the timeout.
    pub fn passcode_timeout_expired(&self, now: I, timeout: Option<Duration>) -> bool {
        let Some(timeout) = timeout else {
            return true;
        };
        if !self.unlocked_once {
            return true;
        }
        self.locked_interval(now) > timeout || self.unlocked_interval(now) > timeout
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn no_timeout_always_requires_passcode() {
        let t0 = Instant::now();
        let session = LockSession::new(t0);
        assert!(session.passcode_timeout_expired(t0, None));
    }

    #[test]
    fn passcode_required_before_first_unlock() {
        let t0 = Instant::now();
        let session = LockSession::new(t0);
        assert!(session.passcode_timeout_expired(t0 + Duration::from_secs(1), Some(Duration::from_secs(30))));
    }

    #[test]
    fn quick_relock_skips_passcode() {
        let t0 = Instant::now();
        let mut session = LockSession::new(t0);
        session.unlock(t0);
        session.lock(t0 + Duration::from_secs(10));

        let timeout = Some(Duration::from_secs(30));
        assert!(!session.passcode_timeout_expired(t0 + Duration::from_secs(20), timeout));
        assert!(session.passcode_timeout_expired(t0 + Duration::from_secs(41), timeout));
    }

    #[test]
    fn long_unlocked_session_requires_passcode() {
        let t0 = Instant::now();
        let mut session = LockSession::new(t0);
        session.unlock(t0);
        session.lock(t0 + Duration::from_secs(120));

        let now = t0 + Duration::from_secs(121);
        assert_eq!(session.unlocked_interval(now), Duration::from_secs(120));
        assert!(session.passcode_timeout_expired(now, Some(Duration::from_secs(60))));
    }

    #[test]
    fn repeated_lock_keeps_first_timestamp() {
        let t0 = Instant::now();
        let mut session = LockSession::new(t0);
        session.lock(t0 + Duration::from_secs(5));

        assert!(session.is_locked());
        assert_eq!(session.locked_interval(t0 + Duration::from_secs(7)), Duration::from_secs(7));
    }

    proptest! {
        #[test]
        fn intervals_never_exceed_elapsed(steps in proptest::collection::vec((any::<bool>(), 0u64..1_000), 0..32)) {
            let t0 = Instant::now();
            let mut session = LockSession::new(t0);
            let mut elapsed = 0u64;
            for (lock, dt) in steps {
                elapsed += dt;
                let now = t0 + Duration::from_millis(elapsed);
                if lock { session.lock(now) } else { session.unlock(now) }
                prop_assert!(session.locked_interval(now) <= Duration::from_millis(elapsed));
                prop_assert!(session.unlocked_interval(now) <= Duration::from_millis(elapsed));
            }
        }
    }
}
