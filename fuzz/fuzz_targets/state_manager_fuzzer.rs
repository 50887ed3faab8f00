//! Fuzz target for the rule-driven state manager
//!
//! # Strategy
//!
//! - Arbitrary platform and user events, delivered before and after the
//!   passcode setting is known
//! - The executor refuses actions at fuzzer-chosen points, forcing rollbacks
//!   in the middle of transfer chains
//!
//! # Invariants
//!
//! - Every standard LockScreen invariant holds after every event
//! - A refused action leaves the state it was refused in, with the view of
//!   that state
//! - No request stays queued once the passcode setting is known
//! - NEVER panic

#![no_main]

use std::{fmt, time::Duration};

use arbitrary::Arbitrary;
use gaia_lockscreen_app::{ActionExecutor, LockScreenEvent, ManagerConfig, StateManager, SystemEnv};
use gaia_lockscreen_core::{KeypadKey, LockScreenAction, LockScreenConfig};
use gaia_lockscreen_harness::{InvariantRegistry, LockScreenSnapshot};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Event {
    Screen { enabled: bool, by_proximity: bool },
    Home,
    SlideLeft,
    SlideRight,
    Drag(i8),
    Release,
    NotificationUnlock,
    Unlock { forcibly: bool },
    Lock,
    AppClosed,
    InputAppOpening,
    InputAppOpened,
    InputAppClosed,
    Key(u8),
    Validated,
    ValidationFailed,
    StatusExpired,
    SecureAppOpened,
    SecureAppClosing,
    SecureAppTerminated,
    PasscodeEnabled(bool),
    PasscodeTimeout(Option<u8>),
}

impl Event {
    fn into_lock_screen_event(self) -> LockScreenEvent {
        match self {
            Self::Screen { enabled, by_proximity } => LockScreenEvent::ScreenChanged { enabled, by_proximity },
            Self::Home => LockScreenEvent::HomePressed,
            Self::SlideLeft => LockScreenEvent::SlideActivateLeft,
            Self::SlideRight => LockScreenEvent::SlideActivateRight,
            Self::Drag(delta) => LockScreenEvent::SlideDragged { delta: i32::from(delta) },
            Self::Release => LockScreenEvent::SlideReleased,
            Self::NotificationUnlock => {
                LockScreenEvent::NotificationActivateUnlock { notification_id: "fuzz".to_string() }
            }
            Self::Unlock { forcibly } => LockScreenEvent::RequestUnlock { forcibly },
            Self::Lock => LockScreenEvent::RequestLock,
            Self::AppClosed => LockScreenEvent::AppClosed,
            Self::InputAppOpening => LockScreenEvent::InputAppOpening,
            Self::InputAppOpened => LockScreenEvent::InputAppOpened,
            Self::InputAppClosed => LockScreenEvent::InputAppClosed,
            Self::Key(code) => {
                let key = match code % 13 {
                    10 => KeypadKey::Backspace,
                    11 => KeypadKey::Cancel,
                    12 => KeypadKey::EmergencyCall,
                    digit => KeypadKey::Digit(char::from(b'0' + digit)),
                };
                LockScreenEvent::KeypadInput(key)
            }
            Self::Validated => LockScreenEvent::PasscodeValidated,
            Self::ValidationFailed => LockScreenEvent::PasscodeValidationFailed,
            Self::StatusExpired => LockScreenEvent::PasscodeStatusExpired,
            Self::SecureAppOpened => LockScreenEvent::SecureAppOpened,
            Self::SecureAppClosing => LockScreenEvent::SecureAppClosing,
            Self::SecureAppTerminated => LockScreenEvent::SecureAppTerminated,
            Self::PasscodeEnabled(enabled) => LockScreenEvent::PasscodeEnabledChanged(enabled),
            Self::PasscodeTimeout(secs) => {
                LockScreenEvent::PasscodeTimeoutChanged(secs.map(|s| Duration::from_secs(u64::from(s))))
            }
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct Input {
    events: Vec<Event>,
    /// Refuse every n-th action; 0 never refuses
    refuse_every: u8,
}

#[derive(Debug)]
struct Refused;

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("refused")
    }
}

impl std::error::Error for Refused {}

struct FlakyExecutor {
    refuse_every: u8,
    count: u64,
}

impl ActionExecutor for FlakyExecutor {
    type Error = Refused;

    async fn execute(&mut self, _action: LockScreenAction) -> Result<(), Refused> {
        self.count += 1;
        if self.refuse_every != 0 && self.count % u64::from(self.refuse_every) == 0 {
            return Err(Refused);
        }
        Ok(())
    }
}

fuzz_target!(|input: Input| {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().enable_time().build() else {
        return;
    };

    runtime.block_on(async move {
        let config = ManagerConfig { fulfilled_delay: Duration::ZERO, ..ManagerConfig::default() };
        let mut manager = StateManager::new(SystemEnv, LockScreenConfig::default(), config);
        let mut executor = FlakyExecutor { refuse_every: input.refuse_every, count: 0 };
        let invariants = InvariantRegistry::standard();

        if manager.start(&mut executor).await.is_err() {
            return;
        }

        for event in input.events {
            let event = event.into_lock_screen_event();
            // A refused action undoes its own step; the invariants below
            // catch a state left half-entered
            let _ = manager.handle_event(event.clone(), &mut executor).await;

            invariants.assert_all(&LockScreenSnapshot::from_manager(&manager), &format!("after {event:?}"));
        }
    });
});
