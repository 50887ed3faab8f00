//! LockScreen state set.
//!
//! Each top-level mode of the LockScreen is a small struct implementing
//! [`LockScreenState`]. A state is constructed once, reused for every visit
//! and never destroyed. It holds no reference to the LockScreen: the
//! controller lends it one for the duration of a transfer through
//! [`LockScreenState::start`], which returns a [`BoundState`].
//!
//! Transfers cannot fail. [`BoundState::transfer_to`] resolves to `()` once
//! the entry side effects are applied. The user-visible panel switch is
//! always the last mutation of an entry.
//!
//! # Serialization
//!
//! A [`BoundState`] holds the only `&mut LockScreen`, so a second transfer
//! cannot begin until the first one resolved or was dropped.

mod keypad;
mod secure_app;
mod slide;
mod unlock;

use std::{fmt, future::Future, str::FromStr, time::Duration};

pub use keypad::{KeypadHiding, KeypadRising, KeypadShow, KeypadShowFulfilledPasscode};
pub use secure_app::SecureAppLaunching;
pub use slide::{SlideRestore, SlideShow};
pub use unlock::{PanelHide, Unlock};

use crate::{env::Environment, inputs::LockScreenInputs, lockscreen::LockScreen};

/// Default display time of the "passcode accepted" feedback.
pub const DEFAULT_FULFILLED_DELAY: Duration = Duration::from_millis(100);

/// Tag naming one top-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateType {
    /// Slide handle returns to the centre
    SlideRestore,
    /// Main panel with the slide
    SlideShow,
    /// Keypad opening
    KeypadRising,
    /// Passcode pad shown
    KeypadShow,
    /// Passcode accepted, feedback showing
    KeypadShowFulfilledPasscode,
    /// Keypad closing
    KeypadHiding,
    /// Every panel hidden before unlocking
    PanelHide,
    /// Unlocked
    Unlock,
    /// A secure app is being launched
    SecureAppLaunching,
}

impl StateType {
    /// Every state type, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::SlideRestore,
        Self::SlideShow,
        Self::KeypadRising,
        Self::KeypadShow,
        Self::KeypadShowFulfilledPasscode,
        Self::KeypadHiding,
        Self::PanelHide,
        Self::Unlock,
        Self::SecureAppLaunching,
    ];

    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlideRestore => "slideRestore",
            Self::SlideShow => "slideShow",
            Self::KeypadRising => "keypadRising",
            Self::KeypadShow => "keypadShow",
            Self::KeypadShowFulfilledPasscode => "keypadShowFulfilledPasscode",
            Self::KeypadHiding => "keypadHiding",
            Self::PanelHide => "panelHide",
            Self::Unlock => "unlock",
            Self::SecureAppLaunching => "secureAppLaunching",
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown state name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state type: {0}")]
pub struct UnknownStateType(pub String);

impl FromStr for StateType {
    type Err = UnknownStateType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or_else(|| UnknownStateType(s.to_string()))
    }
}

/// One top-level LockScreen mode.
pub trait LockScreenState: Send + Sync {
    /// Tag of this state.
    fn state_type(&self) -> StateType;

    /// Apply the entry side effects to `lock_screen`.
    ///
    /// Resolves once every effect is applied. Dropping the future abandons the
    /// entry and cancels any pending delay.
    fn enter<E: Environment>(
        &self,
        lock_screen: &mut LockScreen,
        env: &E,
        inputs: &LockScreenInputs,
    ) -> impl Future<Output = ()> + Send;

    /// Bind this state to `lock_screen` for one transfer.
    fn start<'a>(&'a self, lock_screen: &'a mut LockScreen) -> BoundState<'a, Self>
    where
        Self: Sized,
    {
        BoundState { state: self, lock_screen }
    }
}

/// A state bound to the LockScreen it will mutate.
#[derive(Debug)]
pub struct BoundState<'a, S> {
    state: &'a S,
    lock_screen: &'a mut LockScreen,
}

impl<S: LockScreenState> BoundState<'_, S> {
    /// Tag of the bound state.
    pub fn state_type(&self) -> StateType {
        self.state.state_type()
    }

    /// Enter the state. Resolves once the entry side effects are applied.
    pub async fn transfer_to<E: Environment>(self, env: &E, inputs: &LockScreenInputs) {
        tracing::trace!(state = %self.state.state_type(), "entering");
        self.state.enter(self.lock_screen, env, inputs).await;
    }
}

/// Registry of every state, one instance per type.
#[derive(Debug, Clone)]
pub struct StateSet {
    slide_restore: SlideRestore,
    slide_show: SlideShow,
    keypad_rising: KeypadRising,
    keypad_show: KeypadShow,
    keypad_fulfilled: KeypadShowFulfilledPasscode,
    keypad_hiding: KeypadHiding,
    panel_hide: PanelHide,
    unlock: Unlock,
    secure_app_launching: SecureAppLaunching,
}

impl Default for StateSet {
    fn default() -> Self {
        Self::new(DEFAULT_FULFILLED_DELAY)
    }
}

impl StateSet {
    /// Build the set. `fulfilled_delay` is how long the accepted passcode
    /// feedback stays before the fulfilled state resolves.
    pub fn new(fulfilled_delay: Duration) -> Self {
        Self {
            slide_restore: SlideRestore,
            slide_show: SlideShow,
            keypad_rising: KeypadRising,
            keypad_show: KeypadShow,
            keypad_fulfilled: KeypadShowFulfilledPasscode::new(fulfilled_delay),
            keypad_hiding: KeypadHiding,
            panel_hide: PanelHide,
            unlock: Unlock,
            secure_app_launching: SecureAppLaunching::default(),
        }
    }

    /// Transfer `lock_screen` into the state tagged `target`.
    pub async fn transfer<E: Environment>(
        &self,
        target: StateType,
        lock_screen: &mut LockScreen,
        env: &E,
        inputs: &LockScreenInputs,
    ) {
        match target {
            StateType::SlideRestore => self.slide_restore.start(lock_screen).transfer_to(env, inputs).await,
            StateType::SlideShow => self.slide_show.start(lock_screen).transfer_to(env, inputs).await,
            StateType::KeypadRising => self.keypad_rising.start(lock_screen).transfer_to(env, inputs).await,
            StateType::KeypadShow => self.keypad_show.start(lock_screen).transfer_to(env, inputs).await,
            StateType::KeypadShowFulfilledPasscode => {
                self.keypad_fulfilled.start(lock_screen).transfer_to(env, inputs).await;
            },
            StateType::KeypadHiding => self.keypad_hiding.start(lock_screen).transfer_to(env, inputs).await,
            StateType::PanelHide => self.panel_hide.start(lock_screen).transfer_to(env, inputs).await,
            StateType::Unlock => self.unlock.start(lock_screen).transfer_to(env, inputs).await,
            StateType::SecureAppLaunching => {
                self.secure_app_launching.start(lock_screen).transfer_to(env, inputs).await;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for state in StateType::ALL {
            assert_eq!(state.as_str().parse::<StateType>(), Ok(state));
        }
        assert!("keypad".parse::<StateType>().is_err());
    }

    #[test]
    fn names_are_camel_case() {
        assert_eq!(StateType::KeypadShowFulfilledPasscode.to_string(), "keypadShowFulfilledPasscode");
        assert_eq!(StateType::SecureAppLaunching.to_string(), "secureAppLaunching");
    }
}
