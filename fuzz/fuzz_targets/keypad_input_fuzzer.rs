//! Fuzz target for keypad entry on the LockScreen context
//!
//! # Strategy
//!
//! - Arbitrary key presses mixed with panel switches, validation outcomes,
//!   status resets and slide drags
//! - Steps are grouped into checkpointed batches; some batches are rolled
//!   back instead of committed, as a failed side effect would
//!
//! # Invariants
//!
//! - The buffer never holds more digits than the configured length
//! - Validation is requested exactly when the buffer fills up
//! - Digits are only accepted on the passcode panel with no status showing
//! - The slide offset stays within the slide range
//! - Rolling back restores the view of the checkpoint
//! - NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use gaia_lockscreen_core::{KeypadKey, LockScreen, LockScreenAction, Panel};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Digit(u8),
    Backspace,
    Cancel,
    EmergencyCall,
    ShowPasscodePanel,
    ShowMainPanel,
    ValidationFailed,
    ValidationSucceeded,
    StatusExpired,
    Drag(i16),
    Release,
}

#[derive(Debug, Clone, Arbitrary)]
struct Batch {
    steps: Vec<Step>,
    roll_back: bool,
}

fuzz_target!(|batches: Vec<Batch>| {
    let mut lock_screen = LockScreen::default();
    let length = lock_screen.config().passcode_length;
    let range = lock_screen.config().slide_range;

    for batch in batches {
        lock_screen.checkpoint();
        let before = lock_screen.view().clone();

        for step in batch.steps {
            let len_before = lock_screen.view().passcode_len;
            let accepting = lock_screen.view().panel == Panel::Passcode
                && lock_screen.view().passcode_status.is_none()
                && len_before < length;

            match step {
                Step::Digit(d) => {
                    lock_screen.input_key(KeypadKey::Digit(char::from(b'0' + d % 10)));
                    let expected = if accepting { len_before + 1 } else { len_before };
                    assert_eq!(lock_screen.view().passcode_len, expected);

                    let requested = lock_screen
                        .pending_actions()
                        .iter()
                        .any(|a| matches!(a, LockScreenAction::RequestPasscodeValidation { .. }));
                    assert_eq!(requested, accepting && expected == length);
                    lock_screen.drain_actions();
                },
                Step::Backspace => lock_screen.input_key(KeypadKey::Backspace),
                Step::Cancel => lock_screen.input_key(KeypadKey::Cancel),
                Step::EmergencyCall => lock_screen.input_key(KeypadKey::EmergencyCall),
                Step::ShowPasscodePanel => lock_screen.switch_panel(Panel::Passcode),
                Step::ShowMainPanel => lock_screen.switch_panel(Panel::Main),
                Step::ValidationFailed => lock_screen.validation_failed(),
                Step::ValidationSucceeded => lock_screen.validation_succeeded(),
                Step::StatusExpired => lock_screen.expire_validation_status(),
                Step::Drag(delta) => {
                    lock_screen.drag_slide(i32::from(delta));
                },
                Step::Release => {
                    lock_screen.release_slide();
                },
            }

            assert!(lock_screen.view().passcode_len <= length);
            assert!(lock_screen.view().slide_offset.abs() <= range);
        }

        lock_screen.drain_actions();
        if batch.roll_back {
            lock_screen.rollback();
            assert_eq!(lock_screen.view(), &before);
        } else {
            lock_screen.commit();
        }
    }
});
