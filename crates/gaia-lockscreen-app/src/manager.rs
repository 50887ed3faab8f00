//! LockScreen state manager.
//!
//! The [`StateManager`] owns the [`LockScreen`], the state set and the rule
//! table, and holds the current state. Every event becomes a transfer request
//! carrying a full [`LockScreenInputs`] snapshot. The first matching rule
//! names the target state, which is entered and awaited before anything else
//! happens. Once a transfer resolves, the table is matched again with the
//! lasting inputs so that multi-step sequences (keypad hidden, panels hidden,
//! unlocked) chain on their own.
//!
//! # Side effects
//!
//! States only queue [`LockScreenAction`]s. After each step the manager hands
//! them to an [`ActionExecutor`]. If one fails, the LockScreen is rolled back
//! to its checkpoint, the current state stays as it was and the error is
//! returned.
//!
//! # Deferred passcode setting
//!
//! Until `lockscreen.passcode-lock.enabled` has been read, no rule can be
//! matched reliably. Requests made before are queued and replayed, in order,
//! once the setting arrives.

use std::{collections::VecDeque, future::Future, time::Duration};

use gaia_lockscreen_core::{
    Environment, InputPad, KeypadKey, LockScreen, LockScreenAction, LockScreenConfig, LockScreenInputs, LockSession,
    StateSet, StateType, UnlockingMessage, lockscreen::SlideSide, state::DEFAULT_FULFILLED_DELAY,
};

use crate::{
    LockScreenEvent,
    history::{DEFAULT_HISTORY_SIZE, Transition, TransitionLog},
    rules::RuleTable,
};

/// Default bound on chained transfers per request.
pub const DEFAULT_HOP_LIMIT: usize = 16;

/// Activity attached to an unlock started from the camera side of the slide.
pub const CAMERA_ACTIVITY: &str = "record";

/// State manager configuration
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Display time of the accepted passcode feedback
    pub fulfilled_delay: Duration,
    /// State following the accepted passcode feedback while unlocking
    pub fulfilled_successor: StateType,
    /// Maximum chained transfers for one request
    pub hop_limit: usize,
    /// Transitions kept in the history
    pub history_size: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            fulfilled_delay: DEFAULT_FULFILLED_DELAY,
            fulfilled_successor: StateType::KeypadHiding,
            hop_limit: DEFAULT_HOP_LIMIT,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

/// Performs the side effects the LockScreen asks for.
pub trait ActionExecutor: Send {
    /// Executor-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Perform one action.
    ///
    /// # Errors
    ///
    /// Returns an error if the action could not be performed. The transition
    /// that produced it is rolled back.
    fn execute(&mut self, action: LockScreenAction) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Rule-driven controller of the LockScreen states.
pub struct StateManager<E: Environment> {
    env: E,
    config: ManagerConfig,
    lock_screen: LockScreen,
    states: StateSet,
    rules: RuleTable,
    /// Lasting inputs
    inputs: LockScreenInputs,
    current: StateType,
    started: bool,
    /// Requests waiting for the passcode setting
    queued: VecDeque<LockScreenInputs>,
    session: LockSession<E::Instant>,
    passcode_timeout: Option<Duration>,
    history: TransitionLog,
}

impl<E: Environment> StateManager<E> {
    /// Create a manager with the standard rule table.
    pub fn new(env: E, lock_screen: LockScreenConfig, config: ManagerConfig) -> Self {
        let rules = RuleTable::standard(config.fulfilled_successor);
        Self::with_rules(env, lock_screen, config, rules)
    }

    /// Create a manager with a custom rule table.
    pub fn with_rules(env: E, lock_screen: LockScreenConfig, config: ManagerConfig, rules: RuleTable) -> Self {
        let now = env.now();
        Self {
            states: StateSet::new(config.fulfilled_delay),
            history: TransitionLog::new(config.history_size),
            lock_screen: LockScreen::new(lock_screen),
            rules,
            inputs: LockScreenInputs::default(),
            current: StateType::SlideShow,
            started: false,
            queued: VecDeque::new(),
            session: LockSession::new(now),
            passcode_timeout: None,
            env,
            config,
        }
    }

    /// Current state.
    pub fn current(&self) -> StateType {
        self.current
    }

    /// The LockScreen.
    pub fn lock_screen(&self) -> &LockScreen {
        &self.lock_screen
    }

    /// Lasting inputs.
    pub fn inputs(&self) -> &LockScreenInputs {
        &self.inputs
    }

    /// Rule table.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Rule table, for registering or unregistering rules.
    pub fn rules_mut(&mut self) -> &mut RuleTable {
        &mut self.rules
    }

    /// Completed transitions.
    pub fn history(&self) -> &TransitionLog {
        &self.history
    }

    /// Configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Number of requests waiting for the passcode setting.
    pub fn queued_requests(&self) -> usize {
        self.queued.len()
    }

    /// Configured passcode timeout.
    pub fn passcode_timeout(&self) -> Option<Duration> {
        self.passcode_timeout
    }

    /// Returns true if the passcode must be entered to unlock now.
    pub fn passcode_required(&self) -> bool {
        self.session.passcode_timeout_expired(self.env.now(), self.passcode_timeout)
    }

    /// Remember what triggered the upcoming unlock.
    pub fn set_unlocking_message(&mut self, message: UnlockingMessage) {
        self.lock_screen.set_unlocking_message(message);
    }

    /// Enter the initial state. No-op once started.
    ///
    /// # Errors
    ///
    /// Returns the executor's error if an entry action fails.
    pub async fn start<X: ActionExecutor>(&mut self, executor: &mut X) -> Result<(), X::Error> {
        if self.started {
            return Ok(());
        }
        let inputs = self.inputs.persistent();
        self.enter(StateType::SlideShow, &inputs, executor).await?;
        self.started = true;
        tracing::info!(state = %self.current, "state manager started");
        Ok(())
    }

    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Returns the executor's error if an action fails. The LockScreen and
    /// the current state are left as they were before the failing step.
    pub async fn handle_event<X: ActionExecutor>(
        &mut self,
        event: LockScreenEvent,
        executor: &mut X,
    ) -> Result<(), X::Error> {
        tracing::debug!(?event, state = %self.current, "event");
        match event {
            LockScreenEvent::ScreenChanged { by_proximity: true, .. } => {
                tracing::debug!("screen change by proximity sensor ignored");
                Ok(())
            },
            LockScreenEvent::ScreenChanged { enabled, by_proximity: false } => {
                self.inputs.unlocking = false;
                self.inputs.screen_on = enabled;
                self.request(self.inputs.persistent(), executor).await
            },
            LockScreenEvent::HomePressed => {
                let inputs = LockScreenInputs { home_pressed: true, ..self.inputs.persistent() };
                self.request(inputs, executor).await
            },
            LockScreenEvent::SlideActivateLeft => self.activate_app(executor).await,
            LockScreenEvent::SlideActivateRight => self.activate_unlock(executor).await,
            LockScreenEvent::SlideDragged { delta } => {
                self.apply(executor, |lock_screen| {
                    lock_screen.drag_slide(delta);
                })
                .await
            },
            LockScreenEvent::SlideReleased => match self.lock_screen.release_slide() {
                Some(SlideSide::Left) => self.activate_app(executor).await,
                Some(SlideSide::Right) => self.activate_unlock(executor).await,
                None => Ok(()),
            },
            LockScreenEvent::NotificationActivateUnlock { notification_id } => {
                self.lock_screen.set_unlocking_message(UnlockingMessage::notification(notification_id));
                self.activate_unlock(executor).await
            },
            LockScreenEvent::RequestUnlock { forcibly: true } => {
                let inputs = LockScreenInputs { forcibly_unlock: true, ..self.inputs.persistent() };
                self.request(inputs, executor).await
            },
            LockScreenEvent::RequestUnlock { forcibly: false } => {
                self.inputs.unlocking = true;
                self.request(self.inputs.persistent(), executor).await
            },
            LockScreenEvent::RequestLock => {
                self.inputs.unlocking = false;
                self.apply(executor, LockScreen::lock).await?;
                self.request(self.inputs.persistent(), executor).await
            },
            LockScreenEvent::AppClosed => {
                self.inputs.unlocking = false;
                self.request(self.inputs.persistent(), executor).await
            },
            LockScreenEvent::InputAppOpening => self.input_pad(InputPad::Open, executor).await,
            LockScreenEvent::InputAppOpened => self.input_pad(InputPad::Show, executor).await,
            LockScreenEvent::InputAppClosed => self.input_pad(InputPad::Close, executor).await,
            LockScreenEvent::KeypadInput(key) if self.current != StateType::KeypadShow => {
                tracing::debug!(?key, state = %self.current, "keypad input without keypad ignored");
                Ok(())
            },
            LockScreenEvent::KeypadInput(key) => {
                self.apply(executor, |lock_screen| lock_screen.input_key(key)).await?;
                if key == KeypadKey::Cancel {
                    let inputs = LockScreenInputs { keypad_input: Some(key), ..self.inputs.persistent() };
                    self.request(inputs, executor).await?;
                }
                Ok(())
            },
            LockScreenEvent::PasscodeValidated if self.current != StateType::KeypadShow => {
                tracing::debug!(state = %self.current, "validation outcome without keypad ignored");
                Ok(())
            },
            LockScreenEvent::PasscodeValidated => {
                self.lock_screen.validation_succeeded();
                self.inputs.unlocking = true;
                let inputs = LockScreenInputs { passcode_validated: true, ..self.inputs.persistent() };
                self.request(inputs, executor).await
            },
            LockScreenEvent::PasscodeValidationFailed => self.apply(executor, LockScreen::validation_failed).await,
            LockScreenEvent::PasscodeStatusExpired => self.apply(executor, LockScreen::expire_validation_status).await,
            LockScreenEvent::SecureAppOpened => {
                let inputs = LockScreenInputs { secure_app_open: true, ..self.inputs.persistent() };
                self.request(inputs, executor).await
            },
            LockScreenEvent::SecureAppClosing | LockScreenEvent::SecureAppTerminated => {
                let inputs = LockScreenInputs { secure_app_close: true, ..self.inputs.persistent() };
                self.request(inputs, executor).await
            },
            LockScreenEvent::PasscodeEnabledChanged(enabled) => self.set_passcode_enabled(enabled, executor).await,
            LockScreenEvent::PasscodeTimeoutChanged(timeout) => {
                self.passcode_timeout = timeout;
                Ok(())
            },

            // Handled by the runtime
            LockScreenEvent::NotificationAdded { .. }
            | LockScreenEvent::NotificationRemoved { .. }
            | LockScreenEvent::NotificationTouched { .. }
            | LockScreenEvent::NotificationTapped { .. }
            | LockScreenEvent::NotificationsBlurred
            | LockScreenEvent::SettingChanged { .. } => Ok(()),
        }
    }

    async fn activate_unlock<X: ActionExecutor>(&mut self, executor: &mut X) -> Result<(), X::Error> {
        self.inputs.passcode_timeout = self.passcode_required();
        let inputs = LockScreenInputs { activate_unlock: true, ..self.inputs.persistent() };
        self.request(inputs, executor).await
    }

    async fn activate_app<X: ActionExecutor>(&mut self, executor: &mut X) -> Result<(), X::Error> {
        self.inputs.passcode_timeout = self.passcode_required();
        let secure = self.inputs.passcode_enabled == Some(true) && self.inputs.passcode_timeout;
        if !secure {
            self.lock_screen.set_unlocking_message(UnlockingMessage {
                notification_id: None,
                activity: Some(CAMERA_ACTIVITY.to_string()),
            });
        }
        let inputs = LockScreenInputs { unlocking_app_activated: true, ..self.inputs.persistent() };
        self.request(inputs, executor).await
    }

    async fn input_pad<X: ActionExecutor>(&mut self, pad: InputPad, executor: &mut X) -> Result<(), X::Error> {
        let inputs = LockScreenInputs { inputpad: Some(pad), ..self.inputs.persistent() };
        self.request(inputs, executor).await
    }

    async fn set_passcode_enabled<X: ActionExecutor>(&mut self, enabled: bool, executor: &mut X) -> Result<(), X::Error> {
        self.inputs.passcode_enabled = Some(enabled);
        if !self.queued.is_empty() {
            tracing::debug!(queued = self.queued.len(), enabled, "passcode setting read, replaying requests");
        }
        let mut queued = std::mem::take(&mut self.queued).into_iter();
        while let Some(mut inputs) = queued.next() {
            inputs.passcode_enabled = Some(enabled);
            if let Err(error) = self.run_rules(inputs, executor).await {
                tracing::warn!(dropped = queued.len(), "replay failed, remaining requests dropped");
                return Err(error);
            }
        }
        Ok(())
    }

    async fn request<X: ActionExecutor>(&mut self, inputs: LockScreenInputs, executor: &mut X) -> Result<(), X::Error> {
        if !inputs.is_resolved() {
            tracing::debug!("passcode setting not read yet, request queued");
            self.queued.push_back(inputs);
            return Ok(());
        }
        self.run_rules(inputs, executor).await
    }

    /// Match and transfer until no rule applies or the hop limit is hit.
    async fn run_rules<X: ActionExecutor>(
        &mut self,
        mut inputs: LockScreenInputs,
        executor: &mut X,
    ) -> Result<(), X::Error> {
        let mut hops = 0;
        while let Some(rule) = self.rules.find(self.current, &inputs) {
            if hops == self.config.hop_limit {
                tracing::warn!(state = %self.current, hop_limit = hops, "transfer chain cut at hop limit");
                break;
            }
            hops += 1;

            let (target, reason) = (rule.target, rule.comment.clone());
            self.dispatch(target, &inputs, reason, executor).await?;
            inputs = self.inputs.persistent();
        }
        Ok(())
    }

    async fn dispatch<X: ActionExecutor>(
        &mut self,
        target: StateType,
        inputs: &LockScreenInputs,
        reason: String,
        executor: &mut X,
    ) -> Result<(), X::Error> {
        let from = self.current;
        tracing::debug!(%from, to = %target, %reason, "transfer");
        self.enter(target, inputs, executor).await?;
        self.current = target;
        self.history.record(Transition { from, to: target, reason });
        Ok(())
    }

    async fn enter<X: ActionExecutor>(
        &mut self,
        target: StateType,
        inputs: &LockScreenInputs,
        executor: &mut X,
    ) -> Result<(), X::Error> {
        let was_locked = self.lock_screen.view().locked;
        self.lock_screen.checkpoint();
        self.states.transfer(target, &mut self.lock_screen, &self.env, inputs).await;
        self.finish_step(was_locked, executor).await.inspect_err(|error| {
            tracing::warn!(state = %self.current, to = %target, %error, "transfer rolled back");
        })
    }

    /// Mutate the LockScreen outside a transfer, with the same rollback
    /// guarantee.
    async fn apply<X, F>(&mut self, executor: &mut X, mutate: F) -> Result<(), X::Error>
    where
        X: ActionExecutor,
        F: FnOnce(&mut LockScreen) + Send,
    {
        let was_locked = self.lock_screen.view().locked;
        self.lock_screen.checkpoint();
        mutate(&mut self.lock_screen);
        self.finish_step(was_locked, executor).await.inspect_err(|error| {
            tracing::warn!(state = %self.current, %error, "step rolled back");
        })
    }

    async fn finish_step<X: ActionExecutor>(&mut self, was_locked: bool, executor: &mut X) -> Result<(), X::Error> {
        for action in self.lock_screen.drain_actions() {
            if let Err(error) = executor.execute(action).await {
                self.lock_screen.rollback();
                return Err(error);
            }
        }
        self.lock_screen.commit();

        let locked = self.lock_screen.view().locked;
        if locked != was_locked {
            let now = self.env.now();
            if locked {
                self.session.lock(now);
            } else {
                self.session.unlock(now);
            }
        }
        Ok(())
    }
}

impl<E: Environment> std::fmt::Debug for StateManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateManager")
            .field("current", &self.current)
            .field("inputs", &self.inputs)
            .field("queued", &self.queued.len())
            .field("view", self.lock_screen.view())
            .finish_non_exhaustive()
    }
}
