//! Unlock path: hide every panel, then unlock.

use crate::{
    env::Environment,
    inputs::LockScreenInputs,
    lockscreen::LockScreen,
    state::{LockScreenState, StateType},
};

/// Every panel hidden while the unlock animation runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelHide;

impl LockScreenState for PanelHide {
    fn state_type(&self) -> StateType {
        StateType::PanelHide
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, _env: &E, _inputs: &LockScreenInputs) {
        lock_screen.hide_keypad();
        lock_screen.hide_panels();
    }
}

/// Unlocked. Recentres the slide and emits the unlock request with the
/// pending unlocking message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlock;

impl LockScreenState for Unlock {
    fn state_type(&self) -> StateType {
        StateType::Unlock
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, _env: &E, _inputs: &LockScreenInputs) {
        lock_screen.clear_passcode();
        lock_screen.restore_slide();
        lock_screen.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::{LockScreenAction, UnlockingMessage},
        test_env::TestEnv,
    };

    #[tokio::test]
    async fn unlock_requests_dismissal_once() {
        let mut ls = LockScreen::default();
        let inputs = LockScreenInputs::default();
        ls.set_unlocking_message(UnlockingMessage::notification("email-1"));

        PanelHide.start(&mut ls).transfer_to(&TestEnv, &inputs).await;
        assert!(ls.view().panels_hidden);

        Unlock.start(&mut ls).transfer_to(&TestEnv, &inputs).await;
        Unlock.start(&mut ls).transfer_to(&TestEnv, &inputs).await;

        assert!(!ls.view().locked);
        assert_eq!(ls.drain_actions(), vec![LockScreenAction::RequestUnlock {
            message: UnlockingMessage::notification("email-1")
        }]);
    }
}
