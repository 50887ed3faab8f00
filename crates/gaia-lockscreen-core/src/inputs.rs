//! Transition inputs.
//!
//! A transfer request carries a full [`LockScreenInputs`] snapshot. Some
//! fields describe lasting conditions (screen on, unlocking in progress) and
//! are kept by the controller between requests. The others are one-shot
//! signals (home pressed, a key, an input app notification) that only apply
//! to the request that carries them.

use crate::lockscreen::KeypadKey;

/// Input app (keypad) notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPad {
    /// Input app is opening
    Open,
    /// Input app finished opening
    Show,
    /// Input app closed
    Close,
}

/// Conditions the rule table matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockScreenInputs {
    /// Screen is on
    pub screen_on: bool,
    /// Passcode lock enabled. `None` until the setting was read.
    pub passcode_enabled: Option<bool>,
    /// Passcode required because the timeout expired
    pub passcode_timeout: bool,
    /// Home key pressed
    pub home_pressed: bool,
    /// User asked to unlock (slide right or notification)
    pub activate_unlock: bool,
    /// Unlock in progress
    pub unlocking: bool,
    /// Key pressed on the passcode pad
    pub keypad_input: Option<KeypadKey>,
    /// Unlock without animation
    pub forcibly_unlock: bool,
    /// Input app notification
    pub inputpad: Option<InputPad>,
    /// Passcode validated
    pub passcode_validated: bool,
    /// A secure app opened
    pub secure_app_open: bool,
    /// A secure app closed
    pub secure_app_close: bool,
    /// User activated an app from the LockScreen (slide left)
    pub unlocking_app_activated: bool,
}

impl Default for LockScreenInputs {
    /// The screen is assumed on after boot, and the passcode assumed expired.
    fn default() -> Self {
        Self {
            screen_on: true,
            passcode_enabled: None,
            passcode_timeout: true,
            home_pressed: false,
            activate_unlock: false,
            unlocking: false,
            keypad_input: None,
            forcibly_unlock: false,
            inputpad: None,
            passcode_validated: false,
            secure_app_open: false,
            secure_app_close: false,
            unlocking_app_activated: false,
        }
    }
}

impl LockScreenInputs {
    /// Copy of the lasting conditions with every one-shot signal reset.
    pub fn persistent(&self) -> Self {
        Self {
            screen_on: self.screen_on,
            passcode_enabled: self.passcode_enabled,
            passcode_timeout: self.passcode_timeout,
            unlocking: self.unlocking,
            ..Self::default()
        }
    }

    /// Returns true once the passcode setting was read.
    pub fn is_resolved(&self) -> bool {
        self.passcode_enabled.is_some()
    }
}
