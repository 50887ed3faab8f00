//! Observable state extracted for invariant checking.

use gaia_lockscreen_app::{Driver, Runtime, StateManager, Transition};
use gaia_lockscreen_core::{Environment, LockScreenView, StateType};

/// Everything the invariants look at, detached from the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockScreenSnapshot {
    /// Current top-level state
    pub state: StateType,
    /// LockScreen display
    pub view: LockScreenView,
    /// Configured passcode length
    pub passcode_length: usize,
    /// Recorded transitions, oldest first
    pub transitions: Vec<Transition>,
    /// True once the passcode setting was read
    pub passcode_resolved: bool,
    /// Requests waiting for the passcode setting
    pub queued_requests: usize,
    /// Notification ids, newest first
    pub notification_ids: Vec<String>,
    /// Highlighted notification
    pub highlighted: Option<String>,
}

impl LockScreenSnapshot {
    /// Capture the manager's state. The notification fields stay empty.
    pub fn from_manager<E: Environment>(manager: &StateManager<E>) -> Self {
        Self {
            state: manager.current(),
            view: manager.lock_screen().view().clone(),
            passcode_length: manager.lock_screen().config().passcode_length,
            transitions: manager.history().iter().cloned().collect(),
            passcode_resolved: manager.inputs().is_resolved(),
            queued_requests: manager.queued_requests(),
            notification_ids: Vec::new(),
            highlighted: None,
        }
    }

    /// Capture the whole runtime.
    pub fn capture<D, E>(runtime: &Runtime<D, E>) -> Self
    where
        D: Driver<Instant = E::Instant>,
        E: Environment,
    {
        let notifications = runtime.notifications();
        Self {
            notification_ids: notifications.nodes().iter().map(|n| n.notification_id.clone()).collect(),
            highlighted: notifications.current_highlighted().map(str::to_string),
            ..Self::from_manager(runtime.manager())
        }
    }
}
