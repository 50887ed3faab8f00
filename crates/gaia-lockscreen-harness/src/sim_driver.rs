//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` plays a script of input events and virtual-time waits, records
//! every action the runtime hands it and answers the platform requests a real
//! device would (the input app opening and closing, the window closing after
//! an unlock). It implements [`Driver`] so the same
//! [`gaia_lockscreen_app::Runtime`] orchestration code runs in both production
//! and simulation.

use std::{collections::VecDeque, time::Duration};

use gaia_lockscreen_app::{ActionExecutor, Driver, LockScreenEvent, Snapshot};
use gaia_lockscreen_core::{
    LockScreenAction, Panel, StateType, ValidationStatus, lockscreen::KeypadVisibility,
};
use tokio::time::Instant;

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// One step of a driver script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Deliver an input event.
    Event(LockScreenEvent),
    /// Let virtual time pass before the next step.
    Wait(Duration),
}

impl From<LockScreenEvent> for ScriptStep {
    fn from(event: LockScreenEvent) -> Self {
        Self::Event(event)
    }
}

/// What the last render showed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    /// Top-level state
    pub state: StateType,
    /// Visible panel
    pub panel: Panel,
    /// Entered digits
    pub passcode_len: usize,
    /// Validation feedback
    pub passcode_status: Option<ValidationStatus>,
    /// Input app visibility
    pub keypad: KeypadVisibility,
    /// Locked flag
    pub locked: bool,
    /// Clock text
    pub clock: String,
    /// Airplane mode indicator
    pub airplane_mode: bool,
    /// Notification ids, newest first
    pub notifications: Vec<String>,
    /// Highlighted notification
    pub highlighted: Option<String>,
}

/// Simulation driver for deterministic testing.
///
/// Returns `None` from [`Driver::poll_event`] once the script is exhausted
/// and no platform answer is pending, which stops the runtime.
#[derive(Debug, Default)]
pub struct SimDriver {
    script: VecDeque<ScriptStep>,
    /// Platform answers, delivered before the next script step
    replies: VecDeque<LockScreenEvent>,
    manual_platform: bool,
    wait_until: Option<Instant>,
    actions: Vec<LockScreenAction>,
    fail_on: Option<fn(&LockScreenAction) -> bool>,
    last_frame: Option<RenderedFrame>,
    renders: usize,
    stopped: bool,
}

impl SimDriver {
    /// Create a driver playing `script`.
    pub fn new(script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self { script: script.into_iter().collect(), ..Self::default() }
    }

    /// Stop answering platform requests. The script must then deliver the
    /// input app and window events itself.
    #[must_use]
    pub fn with_manual_platform(mut self) -> Self {
        self.manual_platform = true;
        self
    }

    /// Fail the next action matching `predicate`.
    pub fn fail_next(&mut self, predicate: fn(&LockScreenAction) -> bool) {
        self.fail_on = Some(predicate);
    }

    /// Append a step to the script.
    pub fn push(&mut self, step: impl Into<ScriptStep>) {
        self.script.push_back(step.into());
    }

    /// Actions performed so far.
    pub fn actions(&self) -> &[LockScreenAction] {
        &self.actions
    }

    /// Take the actions performed so far.
    pub fn take_actions(&mut self) -> Vec<LockScreenAction> {
        std::mem::take(&mut self.actions)
    }

    /// Last rendered frame.
    pub fn last_frame(&self) -> Option<&RenderedFrame> {
        self.last_frame.as_ref()
    }

    /// Number of renders.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Script steps not played yet.
    pub fn remaining_steps(&self) -> usize {
        self.script.len()
    }

    /// Returns true once the runtime stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn answer(&mut self, action: &LockScreenAction) {
        let reply = match action {
            LockScreenAction::OpenInputPad => LockScreenEvent::InputAppOpening,
            LockScreenAction::CloseInputPad => LockScreenEvent::InputAppClosed,
            LockScreenAction::RequestUnlock { .. } => LockScreenEvent::AppClosed,
            _ => return,
        };
        self.replies.push_back(reply);
    }
}

impl ActionExecutor for SimDriver {
    type Error = SimDriverError;

    async fn execute(&mut self, action: LockScreenAction) -> Result<(), SimDriverError> {
        if let Some(fail) = self.fail_on
            && fail(&action)
        {
            self.fail_on = None;
            return Err(SimDriverError(format!("injected failure on {action:?}")));
        }
        if !self.manual_platform {
            self.answer(&action);
        }
        tracing::trace!(?action, "sim action");
        self.actions.push(action);
        Ok(())
    }
}

impl Driver for SimDriver {
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<LockScreenEvent>, SimDriverError> {
        loop {
            if let Some(reply) = self.replies.pop_front() {
                return Ok(Some(reply));
            }
            if let Some(deadline) = self.wait_until {
                tokio::time::sleep_until(deadline).await;
                self.wait_until = None;
            }
            match self.script.pop_front() {
                Some(ScriptStep::Event(event)) => return Ok(Some(event)),
                Some(ScriptStep::Wait(duration)) => self.wait_until = Some(Instant::now() + duration),
                None => return Ok(None),
            }
        }
    }

    fn render(&mut self, snapshot: &Snapshot<'_, Instant>) -> Result<(), SimDriverError> {
        self.renders += 1;
        self.last_frame = Some(RenderedFrame {
            state: snapshot.state,
            panel: snapshot.view.panel,
            passcode_len: snapshot.view.passcode_len,
            passcode_status: snapshot.view.passcode_status,
            keypad: snapshot.view.keypad,
            locked: snapshot.view.locked,
            clock: snapshot.clock.time.clone(),
            airplane_mode: snapshot.connection.airplane_mode,
            notifications: snapshot.notifications.nodes().iter().map(|n| n.notification_id.clone()).collect(),
            highlighted: snapshot.notifications.current_highlighted().map(str::to_string),
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
