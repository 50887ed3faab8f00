//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use gaia_lockscreen_core::{Panel, StateType};

use super::{Invariant, InvariantResult, LockScreenSnapshot, Violation};

/// The slide state shows a clean main panel.
///
/// Entering `slideShow` clears the passcode buffer and switches to the main
/// panel, and keypad input is ignored until the keypad shows again.
pub struct SlideShowIsClean;

impl Invariant for SlideShowIsClean {
    fn name(&self) -> &'static str {
        "slide_show_is_clean"
    }

    fn check(&self, state: &LockScreenSnapshot) -> InvariantResult {
        if state.state != StateType::SlideShow {
            return Ok(());
        }
        if state.view.panel != Panel::Main || state.view.passcode_len != 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "slideShow with panel {} and {} digits",
                    state.view.panel.as_str(),
                    state.view.passcode_len
                ),
            });
        }
        Ok(())
    }
}

/// The passcode buffer never outgrows the configured length.
pub struct PasscodeWithinLength;

impl Invariant for PasscodeWithinLength {
    fn name(&self) -> &'static str {
        "passcode_within_length"
    }

    fn check(&self, state: &LockScreenSnapshot) -> InvariantResult {
        if state.view.passcode_len > state.passcode_length {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} digits entered, length is {}", state.view.passcode_len, state.passcode_length),
            });
        }
        Ok(())
    }
}

/// The accepted-passcode feedback is only entered from the shown keypad.
pub struct FulfilledOnlyFromKeypadShow;

impl Invariant for FulfilledOnlyFromKeypadShow {
    fn name(&self) -> &'static str {
        "fulfilled_only_from_keypad_show"
    }

    fn check(&self, state: &LockScreenSnapshot) -> InvariantResult {
        let bad = state
            .transitions
            .iter()
            .find(|t| t.to == StateType::KeypadShowFulfilledPasscode && t.from != StateType::KeypadShow);
        match bad {
            Some(transition) => Err(Violation { invariant: self.name(), message: transition.to_string() }),
            None => Ok(()),
        }
    }
}

/// Every transition leaves the state the previous one entered, and the last
/// one entered the current state.
pub struct HistoryIsContiguous;

impl Invariant for HistoryIsContiguous {
    fn name(&self) -> &'static str {
        "history_is_contiguous"
    }

    fn check(&self, state: &LockScreenSnapshot) -> InvariantResult {
        for window in state.transitions.windows(2) {
            if window[0].to != window[1].from {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("gap between `{}` and `{}`", window[0], window[1]),
                });
            }
        }
        if let Some(last) = state.transitions.last()
            && last.to != state.state
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("last transition entered {} but current state is {}", last.to, state.state),
            });
        }
        Ok(())
    }
}

/// Queued requests are replayed as soon as the passcode setting is known.
pub struct QueueDrainedOnceResolved;

impl Invariant for QueueDrainedOnceResolved {
    fn name(&self) -> &'static str {
        "queue_drained_once_resolved"
    }

    fn check(&self, state: &LockScreenSnapshot) -> InvariantResult {
        if state.passcode_resolved && state.queued_requests > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} requests still queued", state.queued_requests),
            });
        }
        Ok(())
    }
}

/// The highlighted notification is in the list.
pub struct HighlightIsListed;

impl Invariant for HighlightIsListed {
    fn name(&self) -> &'static str {
        "highlight_is_listed"
    }

    fn check(&self, state: &LockScreenSnapshot) -> InvariantResult {
        match &state.highlighted {
            Some(id) if !state.notification_ids.contains(id) => Err(Violation {
                invariant: self.name(),
                message: format!("{id} highlighted but not in {:?}", state.notification_ids),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use gaia_lockscreen_app::Transition;
    use gaia_lockscreen_core::LockScreenView;

    use super::*;

    fn snapshot(state: StateType) -> LockScreenSnapshot {
        LockScreenSnapshot {
            state,
            view: LockScreenView::default(),
            passcode_length: 4,
            transitions: Vec::new(),
            passcode_resolved: true,
            queued_requests: 0,
            notification_ids: Vec::new(),
            highlighted: None,
        }
    }

    fn transition(from: StateType, to: StateType) -> Transition {
        Transition { from, to, reason: "test".to_string() }
    }

    #[test]
    fn slide_show_is_clean_passes_on_main_panel() {
        assert!(SlideShowIsClean.check(&snapshot(StateType::SlideShow)).is_ok());
    }

    #[test]
    fn slide_show_is_clean_fails_with_digits() {
        let mut state = snapshot(StateType::SlideShow);
        state.view.passcode_len = 2;
        assert!(SlideShowIsClean.check(&state).is_err());

        state.state = StateType::KeypadShow;
        assert!(SlideShowIsClean.check(&state).is_ok());
    }

    #[test]
    fn passcode_within_length_fails_when_overfull() {
        let mut state = snapshot(StateType::KeypadShow);
        state.view.passcode_len = 5;
        assert!(PasscodeWithinLength.check(&state).is_err());
    }

    #[test]
    fn fulfilled_only_from_keypad_show_fails_from_slide() {
        let mut state = snapshot(StateType::KeypadShowFulfilledPasscode);
        state.transitions = vec![transition(StateType::SlideShow, StateType::KeypadShowFulfilledPasscode)];
        assert!(FulfilledOnlyFromKeypadShow.check(&state).is_err());

        state.transitions = vec![transition(StateType::KeypadShow, StateType::KeypadShowFulfilledPasscode)];
        assert!(FulfilledOnlyFromKeypadShow.check(&state).is_ok());
    }

    #[test]
    fn history_is_contiguous_fails_on_gap() {
        let mut state = snapshot(StateType::KeypadShow);
        state.transitions = vec![
            transition(StateType::SlideShow, StateType::KeypadRising),
            transition(StateType::KeypadHiding, StateType::KeypadShow),
        ];
        assert!(HistoryIsContiguous.check(&state).is_err());
    }

    #[test]
    fn history_is_contiguous_fails_on_stale_current() {
        let mut state = snapshot(StateType::SlideShow);
        state.transitions = vec![transition(StateType::SlideShow, StateType::KeypadRising)];
        assert!(HistoryIsContiguous.check(&state).is_err());
    }

    #[test]
    fn queue_drained_once_resolved_ignores_unresolved() {
        let mut state = snapshot(StateType::SlideShow);
        state.queued_requests = 2;
        assert!(QueueDrainedOnceResolved.check(&state).is_err());

        state.passcode_resolved = false;
        assert!(QueueDrainedOnceResolved.check(&state).is_ok());
    }

    #[test]
    fn highlight_is_listed_fails_for_removed_notification() {
        let mut state = snapshot(StateType::SlideShow);
        state.highlighted = Some("sms-1".to_string());
        assert!(HighlightIsListed.check(&state).is_err());

        state.notification_ids.push("sms-1".to_string());
        assert!(HighlightIsListed.check(&state).is_ok());
    }
}
