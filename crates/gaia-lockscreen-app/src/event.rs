//! LockScreen input events.
//!
//! This module defines [`LockScreenEvent`], everything that can happen to the
//! LockScreen from the outside: platform notifications (screen, home key,
//! input app, secure apps), user gestures (slide, keypad, notification taps)
//! and settings changes.
//!
//! Most events drive the [`crate::StateManager`]. Notification and raw
//! setting events are handled by the [`crate::Runtime`] itself.

use std::time::Duration;

use gaia_lockscreen_core::{KeypadKey, SettingValue, notification::TouchEvent};

/// Events fed to the LockScreen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockScreenEvent {
    /// Screen turned on or off.
    ScreenChanged {
        /// True if the screen is now on.
        enabled: bool,
        /// Turned off by the proximity sensor. Such changes do not move the
        /// LockScreen.
        by_proximity: bool,
    },

    /// Home key pressed.
    HomePressed,

    /// Slide handle released at the left end (camera).
    SlideActivateLeft,

    /// Slide handle released at the right end (unlock).
    SlideActivateRight,

    /// Slide handle dragged.
    SlideDragged {
        /// Distance moved, negative towards the left.
        delta: i32,
    },

    /// Slide handle released.
    SlideReleased,

    /// An activated notification asks to unlock.
    NotificationActivateUnlock {
        /// Activated notification.
        notification_id: String,
    },

    /// The system asks to unlock.
    RequestUnlock {
        /// Unlock immediately, without the keypad or animations.
        forcibly: bool,
    },

    /// The system asks to lock.
    RequestLock,

    /// The LockScreen window finished closing.
    AppClosed,

    /// Input app started opening.
    InputAppOpening,

    /// Input app finished opening.
    InputAppOpened,

    /// Input app closed.
    InputAppClosed,

    /// Key pressed on the passcode pad.
    KeypadInput(KeypadKey),

    /// Validator accepted the passcode.
    PasscodeValidated,

    /// Validator rejected the passcode.
    PasscodeValidationFailed,

    /// The error timeout of a rejected passcode elapsed.
    PasscodeStatusExpired,

    /// A secure app opened.
    SecureAppOpened,

    /// A secure app is closing.
    SecureAppClosing,

    /// A secure app was killed.
    SecureAppTerminated,

    /// `lockscreen.passcode-lock.enabled` was read or changed.
    PasscodeEnabledChanged(bool),

    /// `lockscreen.passcode-lock.timeout` was read or changed. `None` when
    /// no timeout is configured.
    PasscodeTimeoutChanged(Option<Duration>),

    /// A notification arrived.
    NotificationAdded {
        /// Notification id.
        notification_id: String,
        /// Title line.
        title: String,
        /// Body text.
        body: String,
    },

    /// A notification was dismissed.
    NotificationRemoved {
        /// Notification id.
        notification_id: String,
    },

    /// Raw touch on a notification.
    NotificationTouched {
        /// Touched notification.
        notification_id: String,
        /// Touch phase and target.
        touch: TouchEvent,
    },

    /// Complete tap on a notification: highlights it, or activates it if it
    /// is already highlighted.
    NotificationTapped {
        /// Tapped notification.
        notification_id: String,
    },

    /// Touch outside every notification.
    NotificationsBlurred,

    /// Write a setting.
    SettingChanged {
        /// Setting key.
        key: String,
        /// New value.
        value: SettingValue,
    },
}
