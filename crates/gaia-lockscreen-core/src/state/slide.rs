//! Slide states: the main panel and its restore step.

use crate::{
    env::Environment,
    inputs::LockScreenInputs,
    lockscreen::{LockScreen, Panel},
    state::{LockScreenState, StateType},
};

/// Main panel with the slide handle.
///
/// Clears entered digits, resets the passcode display and shows the main
/// panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlideShow;

impl LockScreenState for SlideShow {
    fn state_type(&self) -> StateType {
        StateType::SlideShow
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, _env: &E, _inputs: &LockScreenInputs) {
        lock_screen.clear_passcode();
        lock_screen.reset_passcode_status();
        lock_screen.hide_keypad();
        lock_screen.show_panels();
        lock_screen.switch_panel(Panel::Main);
    }
}

/// Returns the slide handle to the centre.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlideRestore;

impl LockScreenState for SlideRestore {
    fn state_type(&self) -> StateType {
        StateType::SlideRestore
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, _env: &E, _inputs: &LockScreenInputs) {
        lock_screen.clear_passcode();
        lock_screen.restore_slide();
    }
}
