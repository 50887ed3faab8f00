//! LockScreen context.
//!
//! [`LockScreen`] owns everything the states mutate: the visible view, the
//! entered digits, the pending unlocking message and the validation back-off.
//! It performs no I/O. Every externally visible effect is queued as a
//! [`LockScreenAction`] and drained by the controller.
//!
//! # Checkpoints
//!
//! The controller takes a [`checkpoint`](LockScreen::checkpoint) before each
//! transition. If executing the transition's actions fails it calls
//! [`rollback`](LockScreen::rollback), which restores the view exactly as it
//! was, so a failed transition leaves no partial state behind.

use std::{fmt, time::Duration};

use crate::{
    action::{LockScreenAction, SecureApp, UnlockingMessage},
    passcode::Passcode,
};

/// Default number of digits in a passcode.
pub const DEFAULT_PASSCODE_LENGTH: usize = 4;

/// Default delay before a failed validation status clears.
pub const DEFAULT_ERROR_TIMEOUT: Duration = Duration::from_millis(500);

/// Failed attempts tolerated before the error timeout starts doubling.
pub const ERROR_BACKOFF_THRESHOLD: u32 = 5;

/// Default system app URL, used to derive secure app URLs.
pub const DEFAULT_SYSTEM_URL: &str = "app://system.gaiamobile.org/index.html";

/// Default slide handle travel, in pixels from the centre.
pub const DEFAULT_SLIDE_RANGE: i32 = 70;

/// LockScreen configuration
#[derive(Debug, Clone)]
pub struct LockScreenConfig {
    /// Digits entered before validation is requested
    pub passcode_length: usize,
    /// Initial delay before a failed validation status clears
    pub error_timeout: Duration,
    /// Vibration pattern on failed validation
    pub error_vibration: Vec<u32>,
    /// System app URL that secure app URLs are derived from
    pub system_url: String,
    /// Slide handle travel in each direction
    pub slide_range: i32,
}

impl Default for LockScreenConfig {
    fn default() -> Self {
        Self {
            passcode_length: DEFAULT_PASSCODE_LENGTH,
            error_timeout: DEFAULT_ERROR_TIMEOUT,
            error_vibration: vec![50, 50, 50],
            system_url: DEFAULT_SYSTEM_URL.to_string(),
            slide_range: DEFAULT_SLIDE_RANGE,
        }
    }
}

/// Visible LockScreen panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Panel {
    /// Slide, clock and notifications
    #[default]
    Main,
    /// Passcode pad
    Passcode,
}

impl Panel {
    /// Panel name as shown to the platform.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Passcode => "passcode",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome shown on the passcode pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// Passcode accepted; fulfilled feedback is showing
    Success,
    /// Passcode rejected; cleared after the error timeout
    Error,
}

/// Keypad (input app) visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeypadVisibility {
    /// Not shown
    #[default]
    Hidden,
    /// Open requested, animation running
    Rising,
    /// Fully shown
    Shown,
    /// Close requested, animation running
    Hiding,
}

/// Side the slide handle was released at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideSide {
    /// Secure app (camera)
    Left,
    /// Unlock
    Right,
}

/// Key pressed on the passcode pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadKey {
    /// A digit `0`-`9`
    Digit(char),
    /// `b`: remove the last digit
    Backspace,
    /// `c`: leave the passcode pad
    Cancel,
    /// `e`: launch the emergency dialer
    EmergencyCall,
}

impl KeypadKey {
    /// Parse the key code used by the pad (`0`-`9`, `b`, `c`, `e`).
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '0'..='9' => Some(Self::Digit(code)),
            'b' => Some(Self::Backspace),
            'c' => Some(Self::Cancel),
            'e' => Some(Self::EmergencyCall),
            _ => None,
        }
    }

    /// Key code used by the pad.
    pub fn code(self) -> char {
        match self {
            Self::Digit(digit) => digit,
            Self::Backspace => 'b',
            Self::Cancel => 'c',
            Self::EmergencyCall => 'e',
        }
    }
}

/// Snapshot of everything the LockScreen displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockScreenView {
    /// Current panel
    pub panel: Panel,
    /// Validation feedback. `None` while the user is typing.
    pub passcode_status: Option<ValidationStatus>,
    /// Number of entered digits (the digits themselves are never exposed)
    pub passcode_len: usize,
    /// Input app visibility
    pub keypad: KeypadVisibility,
    /// Slide handle offset from the centre
    pub slide_offset: i32,
    /// True while every panel is hidden for the unlock animation
    pub panels_hidden: bool,
    /// True while the screen is locked
    pub locked: bool,
}

impl Default for LockScreenView {
    fn default() -> Self {
        Self {
            panel: Panel::Main,
            passcode_status: None,
            passcode_len: 0,
            keypad: KeypadVisibility::Hidden,
            slide_offset: 0,
            panels_hidden: false,
            locked: true,
        }
    }
}

#[derive(Debug)]
struct Checkpoint {
    view: LockScreenView,
    passcode: Passcode,
    unlocking_message: UnlockingMessage,
    failures: u32,
    error_timeout: Duration,
    outbox_len: usize,
}

/// LockScreen context shared by every state.
#[derive(Debug)]
pub struct LockScreen {
    view: LockScreenView,
    passcode: Passcode,
    unlocking_message: UnlockingMessage,
    outbox: Vec<LockScreenAction>,
    config: LockScreenConfig,
    /// Consecutive failed validations
    failures: u32,
    /// Current error timeout, doubled past the back-off threshold
    error_timeout: Duration,
    checkpoint: Option<Checkpoint>,
}

impl Default for LockScreen {
    fn default() -> Self {
        Self::new(LockScreenConfig::default())
    }
}

impl LockScreen {
    /// Create a locked LockScreen showing the main panel.
    pub fn new(config: LockScreenConfig) -> Self {
        Self {
            view: LockScreenView::default(),
            passcode: Passcode::default(),
            unlocking_message: UnlockingMessage::default(),
            outbox: Vec::new(),
            error_timeout: config.error_timeout,
            config,
            failures: 0,
            checkpoint: None,
        }
    }

    /// Current view.
    pub fn view(&self) -> &LockScreenView {
        &self.view
    }

    /// Current panel.
    pub fn panel(&self) -> Panel {
        self.view.panel
    }

    /// Configuration.
    pub fn config(&self) -> &LockScreenConfig {
        &self.config
    }

    /// Consecutive failed validations.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay the next failed validation will use.
    pub fn error_timeout(&self) -> Duration {
        self.error_timeout
    }

    /// Pending unlocking message.
    pub fn unlocking_message(&self) -> &UnlockingMessage {
        &self.unlocking_message
    }

    /// Actions queued since the last drain.
    pub fn pending_actions(&self) -> &[LockScreenAction] {
        &self.outbox
    }

    /// Take every queued action.
    pub fn drain_actions(&mut self) -> Vec<LockScreenAction> {
        std::mem::take(&mut self.outbox)
    }

    /// Remember the current view, digits and validation back-off so a failed
    /// transition can be undone.
    pub fn checkpoint(&mut self) {
        self.checkpoint = Some(Checkpoint {
            view: self.view.clone(),
            passcode: self.passcode.clone(),
            unlocking_message: self.unlocking_message.clone(),
            failures: self.failures,
            error_timeout: self.error_timeout,
            outbox_len: self.outbox.len(),
        });
    }

    /// Restore the last checkpoint. No-op without one.
    pub fn rollback(&mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            self.view = checkpoint.view;
            self.passcode = checkpoint.passcode;
            self.unlocking_message = checkpoint.unlocking_message;
            self.failures = checkpoint.failures;
            self.error_timeout = checkpoint.error_timeout;
            self.outbox.truncate(checkpoint.outbox_len);
        }
    }

    /// Discard the last checkpoint.
    pub fn commit(&mut self) {
        self.checkpoint = None;
    }

    /// Switch to `panel`.
    ///
    /// Leaving the passcode pad resets it, unless it shows an error: the
    /// error timeout clears that one. Switching to the current panel is a
    /// no-op.
    pub fn switch_panel(&mut self, panel: Panel) {
        let from = self.view.panel;
        if from == panel {
            return;
        }

        if from == Panel::Passcode && self.view.passcode_status != Some(ValidationStatus::Error) {
            self.view.passcode_status = None;
            self.clear_passcode();
        }

        self.outbox.push(LockScreenAction::PanelChanged { from, to: panel });
        self.view.panel = panel;
    }

    /// Forget every entered digit.
    pub fn clear_passcode(&mut self) {
        self.passcode.clear();
        self.view.passcode_len = 0;
    }

    /// Hide any validation feedback.
    pub fn reset_passcode_status(&mut self) {
        self.view.passcode_status = None;
    }

    /// Show the "passcode accepted" feedback.
    pub fn show_fulfilled(&mut self) {
        self.view.passcode_status = Some(ValidationStatus::Success);
    }

    /// Handle a key from the passcode pad.
    ///
    /// Digits and backspace are ignored while feedback is showing. Entering
    /// the last digit requests validation.
    pub fn input_key(&mut self, key: KeypadKey) {
        match key {
            KeypadKey::EmergencyCall => {
                self.invoke_secure_app("emergency-call");
                self.switch_panel(Panel::Passcode);
            },
            KeypadKey::Cancel => self.switch_panel(Panel::Main),
            KeypadKey::Backspace => {
                if self.view.passcode_status.is_some() {
                    return;
                }
                self.passcode.pop();
                self.view.passcode_len = self.passcode.len();
            },
            KeypadKey::Digit(digit) => {
                if self.view.panel != Panel::Passcode
                    || self.view.passcode_status.is_some()
                    || self.passcode.len() >= self.config.passcode_length
                {
                    return;
                }
                self.passcode.push(digit);
                self.view.passcode_len = self.passcode.len();

                if self.passcode.len() == self.config.passcode_length {
                    tracing::debug!("passcode complete, requesting validation");
                    self.outbox
                        .push(LockScreenAction::RequestPasscodeValidation { passcode: self.passcode.clone() });
                }
            },
        }
    }

    /// Record a successful validation. Resets the back-off.
    pub fn validation_succeeded(&mut self) {
        self.failures = 0;
        self.error_timeout = self.config.error_timeout;
    }

    /// Record a failed validation.
    ///
    /// Shows the error, vibrates and schedules the status reset. Past the
    /// back-off threshold every failure doubles the reset delay.
    pub fn validation_failed(&mut self) {
        self.view.passcode_status = Some(ValidationStatus::Error);
        self.outbox.push(LockScreenAction::NotifyValidationFailed);

        self.failures += 1;
        if self.failures > ERROR_BACKOFF_THRESHOLD {
            self.error_timeout = self.error_timeout.saturating_mul(2);
        }
        tracing::info!(failures = self.failures, timeout = ?self.error_timeout, "passcode rejected");

        self.outbox.push(LockScreenAction::Vibrate { pattern: self.config.error_vibration.clone() });
        self.outbox.push(LockScreenAction::ScheduleStatusReset { after: self.error_timeout });
    }

    /// The error timeout elapsed: clear the error and the digits.
    pub fn expire_validation_status(&mut self) {
        if self.view.passcode_status == Some(ValidationStatus::Error) {
            self.view.passcode_status = None;
            self.clear_passcode();
        }
    }

    /// Ask the input app to open.
    pub fn open_input_pad(&mut self) {
        self.view.keypad = KeypadVisibility::Rising;
        self.outbox.push(LockScreenAction::OpenInputPad);
    }

    /// Mark the keypad fully shown.
    pub fn show_keypad(&mut self) {
        self.view.keypad = KeypadVisibility::Shown;
    }

    /// Ask the input app to close.
    pub fn close_input_pad(&mut self) {
        self.view.keypad = KeypadVisibility::Hiding;
        self.outbox.push(LockScreenAction::CloseInputPad);
    }

    /// Mark the keypad gone.
    pub fn hide_keypad(&mut self) {
        self.view.keypad = KeypadVisibility::Hidden;
    }

    /// Move the slide handle by `delta`, clamped to the slide range.
    pub fn drag_slide(&mut self, delta: i32) -> i32 {
        let range = self.config.slide_range;
        self.view.slide_offset = self.view.slide_offset.saturating_add(delta).clamp(-range, range);
        self.view.slide_offset
    }

    /// Release the slide handle.
    ///
    /// Released at either end it activates that side; anywhere else it springs
    /// back to the centre.
    pub fn release_slide(&mut self) -> Option<SlideSide> {
        let range = self.config.slide_range;
        let side = match self.view.slide_offset {
            offset if offset <= -range => Some(SlideSide::Left),
            offset if offset >= range => Some(SlideSide::Right),
            _ => None,
        };
        if side.is_none() {
            self.view.slide_offset = 0;
        }
        side
    }

    /// Put the slide handle back in the centre.
    pub fn restore_slide(&mut self) {
        self.view.slide_offset = 0;
    }

    /// Hide every panel for the unlock animation.
    pub fn hide_panels(&mut self) {
        self.view.panels_hidden = true;
    }

    /// Show the panels again.
    pub fn show_panels(&mut self) {
        self.view.panels_hidden = false;
    }

    /// Launch the secure variant of `name`.
    pub fn invoke_secure_app(&mut self, name: &str) {
        let app = SecureApp::from_system_url(&self.config.system_url, name);
        tracing::info!(app = %app.name, url = %app.url, "invoking secure app");
        self.outbox.push(LockScreenAction::InvokeSecureApp(app));
    }

    /// Remember what triggered the upcoming unlock.
    pub fn set_unlocking_message(&mut self, message: UnlockingMessage) {
        self.unlocking_message = message;
    }

    /// Lock the screen. No-op if already locked.
    pub fn lock(&mut self) {
        if self.view.locked {
            return;
        }
        self.view.locked = true;
        self.view.panels_hidden = false;
        tracing::info!("locked");
    }

    /// Unlock and request the system to dismiss the LockScreen.
    ///
    /// The pending unlocking message travels with the request and is then
    /// cleared. No-op if already unlocked.
    pub fn unlock(&mut self) {
        if !self.view.locked {
            return;
        }
        self.view.locked = false;
        let message = std::mem::take(&mut self.unlocking_message);
        tracing::info!(notification = ?message.notification_id, "unlocking");
        self.outbox.push(LockScreenAction::RequestUnlock { message });
    }
}
