//! Keypad states: rising, shown, fulfilled and hiding.

use std::time::Duration;

use crate::{
    env::Environment,
    inputs::LockScreenInputs,
    lockscreen::{LockScreen, Panel},
    state::{LockScreenState, StateType},
};

/// Keypad opening. Requests the input app and waits for it to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeypadRising;

impl LockScreenState for KeypadRising {
    fn state_type(&self) -> StateType {
        StateType::KeypadRising
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, _env: &E, _inputs: &LockScreenInputs) {
        lock_screen.open_input_pad();
    }
}

/// Passcode pad shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeypadShow;

impl LockScreenState for KeypadShow {
    fn state_type(&self) -> StateType {
        StateType::KeypadShow
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, _env: &E, _inputs: &LockScreenInputs) {
        lock_screen.show_keypad();
        lock_screen.restore_slide();
        lock_screen.switch_panel(Panel::Passcode);
    }
}

/// Passcode accepted.
///
/// Shows the fulfilled feedback and resolves once the display delay elapsed.
/// Only reachable from [`KeypadShow`].
#[derive(Debug, Clone, Copy)]
pub struct KeypadShowFulfilledPasscode {
    delay: Duration,
}

impl KeypadShowFulfilledPasscode {
    /// Create the state with the given display delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Display delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for KeypadShowFulfilledPasscode {
    fn default() -> Self {
        Self::new(super::DEFAULT_FULFILLED_DELAY)
    }
}

impl LockScreenState for KeypadShowFulfilledPasscode {
    fn state_type(&self) -> StateType {
        StateType::KeypadShowFulfilledPasscode
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, env: &E, _inputs: &LockScreenInputs) {
        lock_screen.show_fulfilled();
        env.sleep(self.delay).await;
    }
}

/// Keypad closing. Requests the input app to close.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeypadHiding;

impl LockScreenState for KeypadHiding {
    fn state_type(&self) -> StateType {
        StateType::KeypadHiding
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, _env: &E, _inputs: &LockScreenInputs) {
        lock_screen.close_input_pad();
    }
}
