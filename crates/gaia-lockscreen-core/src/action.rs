//! Actions the LockScreen asks the outside world to perform.
//!
//! The LockScreen context is pure: entering a state or handling a key only
//! mutates its view and queues [`LockScreenAction`]s. The controller drains
//! the queue after each step and hands every action to an executor.

use std::time::Duration;

use crate::{lockscreen::Panel, passcode::Passcode};

/// Side effect requested by the LockScreen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockScreenAction {
    /// The visible panel changed.
    PanelChanged {
        /// Panel before the switch
        from: Panel,
        /// Panel after the switch
        to: Panel,
    },

    /// Ask the input app to open the keypad.
    OpenInputPad,

    /// Ask the input app to close the keypad.
    CloseInputPad,

    /// Launch a secure app. Fire-and-forget.
    InvokeSecureApp(SecureApp),

    /// Validate the entered passcode.
    RequestPasscodeValidation {
        /// Entered digits
        passcode: Passcode,
    },

    /// Tell the keypad that validation failed.
    NotifyValidationFailed,

    /// Vibrate with the given on/off pattern in milliseconds.
    Vibrate {
        /// Alternating on/off durations
        pattern: Vec<u32>,
    },

    /// Clear the validation status once `after` elapses.
    ScheduleStatusReset {
        /// Delay before the reset
        after: Duration,
    },

    /// Ask the system to unlock.
    RequestUnlock {
        /// What triggered the unlock
        message: UnlockingMessage,
    },
}

/// Context attached to an unlock request.
///
/// Set when the unlock was triggered by activating a notification or by an
/// app that wants to open once the screen is unlocked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockingMessage {
    /// Notification the user activated
    pub notification_id: Option<String>,
    /// Activity waiting for the unlock
    pub activity: Option<String>,
}

impl UnlockingMessage {
    /// Message for an activated notification.
    pub fn notification(id: impl Into<String>) -> Self {
        Self { notification_id: Some(id.into()), activity: None }
    }

    /// Returns true if nothing triggered the unlock.
    pub fn is_empty(&self) -> bool {
        self.notification_id.is_none() && self.activity.is_none()
    }
}

/// A secure app launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureApp {
    /// App name, e.g. `camera`
    pub name: String,
    /// Launch URL, ending in `#secure`
    pub url: String,
    /// Manifest URL derived from the launch URL
    pub manifest_url: String,
}

impl SecureApp {
    /// Derive the launch and manifest URLs from the system app URL.
    ///
    /// The first `system` in `system_url` is replaced by `name`. The manifest
    /// sits next to the app root, after trailing slashes and `index.html`
    /// segments are stripped.
    pub fn from_system_url(system_url: &str, name: &str) -> Self {
        let url = system_url.replacen("system", name, 1);

        let mut root = url.as_str();
        while let Some(stripped) =
            root.strip_suffix("index.html#").or_else(|| root.strip_suffix("index.html"))
        {
            root = stripped;
        }
        let manifest_url = format!("{}/manifest.webapp", root.trim_end_matches('/'));

        Self { name: name.to_string(), url: format!("{url}#secure"), manifest_url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_app_urls_follow_system_url() {
        let app = SecureApp::from_system_url("app://system.gaiamobile.org/index.html", "camera");

        assert_eq!(app.url, "app://camera.gaiamobile.org/index.html#secure");
        assert_eq!(app.manifest_url, "app://camera.gaiamobile.org/manifest.webapp");
    }

    #[test]
    fn secure_app_urls_handle_bare_origin() {
        let app = SecureApp::from_system_url("app://system.gaiamobile.org/", "emergency-call");

        assert_eq!(app.url, "app://emergency-call.gaiamobile.org/#secure");
        assert_eq!(app.manifest_url, "app://emergency-call.gaiamobile.org/manifest.webapp");
    }

    #[test]
    fn unlocking_message_for_notification() {
        let message = UnlockingMessage::notification("sms-7");
        assert_eq!(message.notification_id.as_deref(), Some("sms-7"));
        assert!(!message.is_empty());
        assert!(UnlockingMessage::default().is_empty());
    }
}
