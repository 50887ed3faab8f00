//! Secure app launch.

use crate::{
    env::Environment,
    inputs::LockScreenInputs,
    lockscreen::LockScreen,
    state::{LockScreenState, StateType},
};

/// App launched from the slide's left side.
pub const DEFAULT_SECURE_APP: &str = "camera";

/// Launches exactly one secure app per entry, then resolves immediately.
#[derive(Debug, Clone)]
pub struct SecureAppLaunching {
    app_name: String,
}

impl SecureAppLaunching {
    /// Launch `app_name` on entry.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self { app_name: app_name.into() }
    }
}

impl Default for SecureAppLaunching {
    fn default() -> Self {
        Self::new(DEFAULT_SECURE_APP)
    }
}

impl LockScreenState for SecureAppLaunching {
    fn state_type(&self) -> StateType {
        StateType::SecureAppLaunching
    }

    async fn enter<E: Environment>(&self, lock_screen: &mut LockScreen, _env: &E, _inputs: &LockScreenInputs) {
        lock_screen.invoke_secure_app(&self.app_name);
    }
}
