//! Core logic for the Gaia LockScreen
//!
//! Pure, deterministic building blocks of the LockScreen: the mutable
//! LockScreen context, its top-level state set, passcode validation,
//! notification decoration and the widget sub-machines. Nothing here owns an
//! event loop; the controller lives in `gaia-lockscreen-app`.
//!
//! # Components
//!
//! - [`LockScreen`]: visible state and outbox of side-effect requests
//! - [`state`]: one struct per top-level mode, dispatched by [`StateType`]
//! - [`PasscodeValidator`]: checks submitted passcodes against the secret
//! - [`NotificationBuilder`] and [`LockScreenNotifications`]: notification
//!   controls and the list they live in
//! - [`widget`]: clock and connection sub-machines fed by event sources
//! - [`Environment`]: time abstraction for simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod action;
pub mod env;
pub mod error;
pub mod inputs;
pub mod lockscreen;
pub mod notification;
pub mod notifications;
pub mod passcode;
pub mod session;
pub mod settings;
pub mod state;
pub mod widget;

#[cfg(test)]
mod test_env;

pub use action::{LockScreenAction, SecureApp, UnlockingMessage};
pub use env::Environment;
pub use error::{SettingsError, SourceError};
pub use inputs::{InputPad, LockScreenInputs};
pub use lockscreen::{KeypadKey, LockScreen, LockScreenConfig, LockScreenView, Panel, ValidationStatus};
pub use notification::{ActivationRequest, NotificationBuilder, NotificationNode};
pub use notifications::{LockScreenNotifications, NotificationsConfig};
pub use passcode::{Passcode, PasscodeSecret, PasscodeValidationRequest, PasscodeValidator};
pub use session::LockSession;
pub use settings::{MemorySettings, SettingValue, SettingsStore};
pub use state::{LockScreenState, StateSet, StateType};
