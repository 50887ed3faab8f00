//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the LockScreen runtime from the platform.
//! Each frontend implements it to deliver input events, perform the side
//! effects the LockScreen asks for and display the result, while the generic
//! [`crate::Runtime`] handles all orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use gaia_lockscreen_core::{
    LockScreenNotifications, LockScreenView, StateType,
    widget::{ClockView, ConnectionView},
};

use crate::{ActionExecutor, LockScreenEvent};

/// Everything a frontend needs to draw the LockScreen.
#[derive(Debug)]
pub struct Snapshot<'a, I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Current top-level state
    pub state: StateType,
    /// LockScreen display
    pub view: &'a LockScreenView,
    /// Clock widget display
    pub clock: &'a ClockView,
    /// Connection widget display
    pub connection: &'a ConnectionView,
    /// Notification list
    pub notifications: &'a LockScreenNotifications<I>,
}

/// Abstracts I/O operations for the LockScreen runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. The same
/// orchestration code runs against the simulation driver and a real device.
///
/// Actions the runtime does not handle itself (panel changes, input pad
/// requests, secure app launches, vibration, unlock requests) reach the
/// driver through its [`ActionExecutor`] implementation.
///
/// # Associated Types
///
/// - [`Error`](ActionExecutor::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: ActionExecutor {
    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait for the next input event.
    ///
    /// Returns `None` once the frontend wants the LockScreen to stop. Must
    /// be cancel safe: the runtime drops the future whenever another source
    /// is ready first.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<LockScreenEvent>, Self::Error>> + Send;

    /// Display the LockScreen.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, snapshot: &Snapshot<'_, Self::Instant>) -> Result<(), Self::Error>;

    /// Release platform resources.
    fn stop(&mut self);
}
