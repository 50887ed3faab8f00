//! Scenario runner.
//!
//! A [`Scenario`] describes the initial settings and a script of input events
//! and waits. Running it wires a [`Runtime`] to a [`SimDriver`] on the
//! virtual clock, checks every invariant after each cycle and returns what
//! the LockScreen ended up doing.
//!
//! ```ignore
//! let outcome = Scenario::new()
//!     .passcode("1234")
//!     .event(LockScreenEvent::SlideActivateRight)
//!     .keys("1234")
//!     .wait(Duration::from_secs(1))
//!     .run()
//!     .await?;
//! assert_eq!(outcome.state, StateType::SlideShow);
//! ```

use std::{sync::Arc, time::Duration};

use gaia_lockscreen_app::{LockScreenEvent, Runtime, RuntimeConfig, TransitionLog};
use gaia_lockscreen_core::{
    KeypadKey, LockScreenAction, LockScreenView, MemorySettings, SettingValue, SettingsStore, StateType,
    settings::{PASSCODE_CODE, PASSCODE_ENABLED, PASSCODE_TIMEOUT},
    widget::{ClockView, ConnectionView},
};

use crate::{
    InvariantRegistry, LockScreenSnapshot, SimEnv, Violation,
    sim_driver::{RenderedFrame, ScriptStep, SimDriver, SimDriverError},
};

/// Why a scenario stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    /// The driver failed an action or a render.
    Driver(SimDriverError),
    /// An invariant broke.
    Invariant {
        /// Cycles completed before the check
        cycle: usize,
        /// Every broken invariant
        violations: Vec<Violation>,
    },
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Driver(error) => write!(f, "{error}"),
            Self::Invariant { cycle, violations } => {
                let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
                write!(f, "invariant violation after cycle {cycle}: {}", messages.join("; "))
            },
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<SimDriverError> for ScenarioError {
    fn from(error: SimDriverError) -> Self {
        Self::Driver(error)
    }
}

/// Result of a completed scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Final top-level state
    pub state: StateType,
    /// Final LockScreen display
    pub view: LockScreenView,
    /// Every recorded transition
    pub history: TransitionLog,
    /// Actions the driver performed
    pub actions: Vec<LockScreenAction>,
    /// Last rendered frame
    pub frame: Option<RenderedFrame>,
    /// Final clock display
    pub clock: ClockView,
    /// Final connection display
    pub connection: ConnectionView,
    /// Completed event loop cycles
    pub cycles: usize,
    /// Virtual time spent
    pub elapsed: Duration,
    /// Settings store, as the scenario left it
    pub settings: Arc<MemorySettings>,
}

impl ScenarioOutcome {
    /// Number of unlock requests sent to the system.
    pub fn unlock_requests(&self) -> usize {
        self.actions.iter().filter(|a| matches!(a, LockScreenAction::RequestUnlock { .. })).count()
    }

    /// States entered, in order.
    pub fn path(&self) -> Vec<StateType> {
        self.history.iter().map(|t| t.to).collect()
    }
}

/// Scripted LockScreen session.
#[derive(Debug, Default)]
pub struct Scenario {
    settings: Vec<(String, SettingValue)>,
    script: Vec<ScriptStep>,
    config: RuntimeConfig,
    invariants: Option<InvariantRegistry>,
    fail_on: Option<fn(&LockScreenAction) -> bool>,
    manual_platform: bool,
}

impl Scenario {
    /// Empty scenario with default configuration and every standard
    /// invariant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a setting before the LockScreen starts.
    #[must_use]
    pub fn setting(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.settings.push((key.to_string(), value.into()));
        self
    }

    /// Enable the passcode lock with `code`.
    #[must_use]
    pub fn passcode(self, code: &str) -> Self {
        self.setting(PASSCODE_ENABLED, true).setting(PASSCODE_CODE, code)
    }

    /// Skip the passcode when relocking within `timeout`.
    #[must_use]
    pub fn passcode_timeout(self, timeout: Duration) -> Self {
        let secs = i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX);
        self.setting(PASSCODE_TIMEOUT, secs)
    }

    /// Deliver `event`.
    #[must_use]
    pub fn event(mut self, event: LockScreenEvent) -> Self {
        self.script.push(ScriptStep::Event(event));
        self
    }

    /// Deliver every event in order.
    #[must_use]
    pub fn events(mut self, events: impl IntoIterator<Item = LockScreenEvent>) -> Self {
        self.script.extend(events.into_iter().map(ScriptStep::Event));
        self
    }

    /// Type `keys` on the keypad. Characters without a key are skipped.
    #[must_use]
    pub fn keys(self, keys: &str) -> Self {
        self.events(keys.chars().filter_map(KeypadKey::from_code).map(LockScreenEvent::KeypadInput))
    }

    /// Let virtual time pass.
    #[must_use]
    pub fn wait(mut self, duration: Duration) -> Self {
        self.script.push(ScriptStep::Wait(duration));
        self
    }

    /// Runtime configuration.
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the standard invariants.
    #[must_use]
    pub fn invariants(mut self, invariants: InvariantRegistry) -> Self {
        self.invariants = Some(invariants);
        self
    }

    /// Fail the first driver action matching `predicate`.
    #[must_use]
    pub fn fail_on(mut self, predicate: fn(&LockScreenAction) -> bool) -> Self {
        self.fail_on = Some(predicate);
        self
    }

    /// Leave input app and window events to the script.
    #[must_use]
    pub fn manual_platform(mut self) -> Self {
        self.manual_platform = true;
        self
    }

    /// Run until the script is exhausted.
    ///
    /// Call from a paused-clock test so waits and timers take no real time.
    pub async fn run(self) -> Result<ScenarioOutcome, ScenarioError> {
        let Self { settings, script, config, invariants, fail_on, manual_platform } = self;
        let invariants = invariants.unwrap_or_else(InvariantRegistry::standard);
        let store = Arc::new(MemorySettings::with_values(settings));
        let env = SimEnv::new();

        let mut driver = SimDriver::new(script);
        if manual_platform {
            driver = driver.with_manual_platform();
        }
        if let Some(predicate) = fail_on {
            driver.fail_next(predicate);
        }

        let mut runtime = Runtime::new(driver, env, Arc::clone(&store) as Arc<dyn SettingsStore>, config);
        runtime.start().await?;

        let mut cycles = 0;
        loop {
            invariants
                .check_all(&LockScreenSnapshot::capture(&runtime))
                .map_err(|violations| ScenarioError::Invariant { cycle: cycles, violations })?;
            if runtime.process_cycle().await? {
                break;
            }
            cycles += 1;
        }
        runtime.shutdown();
        tracing::debug!(cycles, elapsed = ?env.elapsed(), "scenario finished");

        let actions = runtime.driver_mut().take_actions();
        let manager = runtime.manager();
        Ok(ScenarioOutcome {
            state: manager.current(),
            view: manager.lock_screen().view().clone(),
            history: manager.history().clone(),
            frame: runtime.driver().last_frame().cloned(),
            clock: runtime.clock().view().clone(),
            connection: runtime.connection().view().clone(),
            actions,
            cycles,
            elapsed: env.elapsed(),
            settings: store,
        })
    }
}
