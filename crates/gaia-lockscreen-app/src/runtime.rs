//! Generic runtime for LockScreen orchestration.
//!
//! The Runtime drives the LockScreen event loop, coordinating between:
//! - [`StateManager`]: top-level state machine
//! - [`PasscodeValidator`]: passcode checks requested by the keypad
//! - [`LockScreenNotifications`]: notification list and highlights
//! - the clock and connection widgets
//! - [`Driver`]: platform-specific I/O
//!
//! Everything runs on one task. Each cycle waits for the first ready source
//! (validation outcome, status reset timer, highlight expiry, settings,
//! widget sources, driver input), handles it to completion and renders.

use std::{sync::Arc, time::Duration};

use gaia_lockscreen_core::{
    Environment, LockScreenAction, LockScreenConfig, LockScreenNotifications, NotificationBuilder, NotificationNode,
    NotificationsConfig, PasscodeSecret, PasscodeValidationRequest, PasscodeValidator, SettingValue, SettingsError,
    SettingsStore,
    notification::{ActivationRequest, TouchEvent, TouchTarget},
    settings::{PASSCODE_ENABLED, PASSCODE_TIMEOUT, SettingsObserver},
    widget::{
        ClockConfig, ClockView, ConnectionView, DomEvent, SourceContext, Widget, clock_widget, connection_widget,
    },
};
use tokio::sync::{broadcast, mpsc};

use crate::{ActionExecutor, Driver, LockScreenEvent, ManagerConfig, Snapshot, StateManager};

/// Capacity of the platform event bus feeding widget sources.
pub const DEFAULT_DOM_CAPACITY: usize = 16;

const EXPIRY_SLACK: Duration = Duration::from_millis(1);

/// Read while the timeout was never written. Not an integer, so the passcode
/// stays required.
const UNSET_PASSCODE_TIMEOUT: SettingValue = SettingValue::Str(String::new());

/// Runtime configuration
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// LockScreen context
    pub lock_screen: LockScreenConfig,
    /// State manager
    pub manager: ManagerConfig,
    /// Notification container
    pub notifications: NotificationsConfig,
    /// Clock widget
    pub clock: ClockConfig,
}

/// Generic runtime that orchestrates the LockScreen and its Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment providing time
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    env: E,
    manager: StateManager<E>,
    validator: PasscodeValidator,
    settings: Arc<dyn SettingsStore>,
    notifications: LockScreenNotifications<E::Instant>,
    activations: mpsc::UnboundedReceiver<ActivationRequest>,
    clock: Widget<ClockView, E>,
    connection: Widget<ConnectionView, E>,
    dom: broadcast::Sender<DomEvent>,
    /// When the shown validation error clears
    status_reset: Option<E::Instant>,
    validations_tx: mpsc::UnboundedSender<bool>,
    validations: mpsc::UnboundedReceiver<bool>,
    passcode_enabled: Option<SettingsObserver>,
    passcode_timeout: Option<SettingsObserver>,
    started: bool,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a new runtime with the given driver, environment and settings.
    pub fn new(driver: D, env: E, settings: Arc<dyn SettingsStore>, config: RuntimeConfig) -> Self {
        let (builder, activations) = NotificationBuilder::new();
        let (dom, _) = broadcast::channel(DEFAULT_DOM_CAPACITY);
        let ctx = SourceContext { dom: dom.clone(), settings: Arc::clone(&settings) };
        let (validations_tx, validations) = mpsc::unbounded_channel();

        Self {
            manager: StateManager::new(env.clone(), config.lock_screen, config.manager),
            validator: PasscodeValidator::default(),
            notifications: LockScreenNotifications::new(builder, config.notifications),
            clock: clock_widget(config.clock, ctx.clone(), env.clone()),
            connection: connection_widget(ctx, env.clone()),
            activations,
            dom,
            status_reset: None,
            validations_tx,
            validations,
            passcode_enabled: None,
            passcode_timeout: None,
            started: false,
            settings,
            driver,
            env,
        }
    }

    /// Run the main event loop until the driver asks to stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        self.start().await?;

        loop {
            let should_quit = self.process_cycle().await?;
            if should_quit {
                break;
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Enter the initial state, wire the settings and start the widgets.
    ///
    /// No-op once started.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails an entry action or the first
    /// render.
    pub async fn start(&mut self) -> Result<(), D::Error> {
        if self.started {
            return Ok(());
        }

        let (manager, mut executor) = self.split();
        manager.start(&mut executor).await?;

        self.passcode_timeout = self.observe(PASSCODE_TIMEOUT, UNSET_PASSCODE_TIMEOUT);
        self.passcode_enabled = self.observe(PASSCODE_ENABLED, SettingValue::Bool(false));
        if self.passcode_enabled.is_none() {
            tracing::warn!("passcode setting unreadable, requiring passcode");
            self.handle(LockScreenEvent::PasscodeEnabledChanged(true)).await?;
        }

        self.clock.start();
        self.connection.start();
        self.started = true;
        self.render()
    }

    /// Stop the widgets and the driver.
    pub fn shutdown(&mut self) {
        self.clock.stop();
        self.connection.stop();
        self.driver.stop();
        tracing::info!(state = %self.manager.current(), "runtime stopped");
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the LockScreen should stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    pub async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let now = self.env.now();
        // Highlights expire strictly after the timeout
        let highlight_expiry = self.notifications.next_expiry().map(|at| at + EXPIRY_SLACK);

        let event = tokio::select! {
            biased;

            Some(valid) = self.validations.recv() => Some(if valid {
                LockScreenEvent::PasscodeValidated
            } else {
                LockScreenEvent::PasscodeValidationFailed
            }),
            () = sleep_until(&self.env, now, self.status_reset) => {
                self.status_reset = None;
                Some(LockScreenEvent::PasscodeStatusExpired)
            },
            () = sleep_until(&self.env, now, highlight_expiry) => {
                let expired = self.notifications.clean_expired(self.env.now());
                tracing::debug!(?expired, "highlights expired");
                None
            },
            Some(request) = self.activations.recv() => {
                tracing::info!(notification = %request.notification_id, "notification activated");
                Some(LockScreenEvent::NotificationActivateUnlock { notification_id: request.notification_id })
            },
            changed = next_value(&mut self.passcode_timeout) => {
                self.setting_changed(PASSCODE_TIMEOUT, changed).map(|value| {
                    let timeout = value.as_int().and_then(|secs| u64::try_from(secs).ok()).map(Duration::from_secs);
                    LockScreenEvent::PasscodeTimeoutChanged(timeout)
                })
            },
            changed = next_value(&mut self.passcode_enabled) => {
                self.setting_changed(PASSCODE_ENABLED, changed)
                    .map(|value| LockScreenEvent::PasscodeEnabledChanged(value.as_bool()))
            },
            running = self.clock.step() => {
                if !running {
                    tracing::debug!(widget = self.clock.name(), "widget sources ended");
                }
                None
            },
            running = self.connection.step() => {
                if !running {
                    tracing::debug!(widget = self.connection.name(), "widget sources ended");
                }
                None
            },
            polled = self.driver.poll_event() => match polled? {
                Some(event) => Some(event),
                None => return Ok(true),
            },
        };

        if let Some(event) = event {
            self.handle(event).await?;
        }
        self.render()?;
        Ok(false)
    }

    /// Handle one event to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails an action.
    pub async fn handle(&mut self, event: LockScreenEvent) -> Result<(), D::Error> {
        match event {
            LockScreenEvent::NotificationAdded { notification_id, title, body } => {
                self.notifications.append(NotificationNode::new(notification_id, title, body));
            },
            LockScreenEvent::NotificationRemoved { notification_id } => {
                self.notifications.remove(&notification_id);
            },
            LockScreenEvent::NotificationTouched { notification_id, touch } => {
                self.notifications.touch(&notification_id, touch);
            },
            LockScreenEvent::NotificationTapped { notification_id } => {
                if self.notifications.current_highlighted() == Some(notification_id.as_str()) {
                    self.notifications.touch(&notification_id, TouchEvent::start(TouchTarget::Control));
                    self.notifications.touch(&notification_id, TouchEvent::end(TouchTarget::Control));
                } else if !self.notifications.highlight(&notification_id, self.env.now()) {
                    tracing::debug!(notification = %notification_id, "tap on unknown notification");
                }
            },
            LockScreenEvent::NotificationsBlurred => self.notifications.blur(),
            LockScreenEvent::SettingChanged { key, value } => {
                if let Err(error) = self.settings.set(&key, value) {
                    tracing::warn!(%key, %error, "setting write failed");
                }
            },
            event => {
                if let LockScreenEvent::ScreenChanged { enabled, .. } = event {
                    // No receiver only means no widget is listening right now
                    let _ = self.dom.send(DomEvent::ScreenChange { screen_enabled: enabled });
                }
                let (manager, mut executor) = self.split();
                manager.handle_event(event, &mut executor).await?;
            },
        }
        Ok(())
    }

    fn observe(&self, key: &str, default: SettingValue) -> Option<SettingsObserver> {
        self.settings
            .observe(key, default)
            .inspect_err(|error| tracing::warn!(%key, %error, "cannot observe setting"))
            .ok()
    }

    /// Drop the observer of `key` once its store is gone.
    fn setting_changed(
        &mut self,
        key: &str,
        changed: Result<SettingValue, SettingsError>,
    ) -> Option<SettingValue> {
        match changed {
            Ok(value) => {
                tracing::debug!(%key, %value, "setting changed");
                Some(value)
            },
            Err(error) => {
                tracing::warn!(%key, %error, "setting observer closed");
                if key == PASSCODE_ENABLED {
                    self.passcode_enabled = None;
                } else {
                    self.passcode_timeout = None;
                }
                None
            },
        }
    }

    fn render(&mut self) -> Result<(), D::Error> {
        let snapshot = Snapshot {
            state: self.manager.current(),
            view: self.manager.lock_screen().view(),
            clock: self.clock.view(),
            connection: self.connection.view(),
            notifications: &self.notifications,
        };
        self.driver.render(&snapshot)
    }

    fn split(&mut self) -> (&mut StateManager<E>, RuntimeExecutor<'_, D, E>) {
        let executor = RuntimeExecutor {
            driver: &mut self.driver,
            env: &self.env,
            validator: &mut self.validator,
            settings: self.settings.as_ref(),
            validations: &self.validations_tx,
            status_reset: &mut self.status_reset,
        };
        (&mut self.manager, executor)
    }

    /// State manager
    pub fn manager(&self) -> &StateManager<E> {
        &self.manager
    }

    /// Notification list
    pub fn notifications(&self) -> &LockScreenNotifications<E::Instant> {
        &self.notifications
    }

    /// Clock widget
    pub fn clock(&self) -> &Widget<ClockView, E> {
        &self.clock
    }

    /// Connection widget
    pub fn connection(&self) -> &Widget<ConnectionView, E> {
        &self.connection
    }

    /// Pending validation status reset
    pub fn status_reset(&self) -> Option<E::Instant> {
        self.status_reset
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

/// Runs the actions the runtime owns and forwards the rest to the driver.
struct RuntimeExecutor<'a, D, E>
where
    D: Driver,
    E: Environment,
{
    driver: &'a mut D,
    env: &'a E,
    validator: &'a mut PasscodeValidator,
    settings: &'a dyn SettingsStore,
    validations: &'a mpsc::UnboundedSender<bool>,
    status_reset: &'a mut Option<E::Instant>,
}

impl<D, E> ActionExecutor for RuntimeExecutor<'_, D, E>
where
    D: Driver,
    E: Environment,
{
    type Error = D::Error;

    async fn execute(&mut self, action: LockScreenAction) -> Result<(), D::Error> {
        match action {
            LockScreenAction::RequestPasscodeValidation { passcode } => {
                // The secret may have changed since the last attempt
                match PasscodeSecret::from_settings(self.settings) {
                    Ok(secret) => self.validator.set_secret(secret),
                    Err(error) => tracing::warn!(%error, "cannot read passcode secret, keeping the previous one"),
                }
                let (ok, err) = (self.validations.clone(), self.validations.clone());
                self.validator.validate(PasscodeValidationRequest::new(
                    passcode,
                    move || {
                        let _ = ok.send(true);
                    },
                    move || {
                        let _ = err.send(false);
                    },
                ));
                Ok(())
            },
            LockScreenAction::ScheduleStatusReset { after } => {
                *self.status_reset = Some(self.env.now() + after);
                Ok(())
            },
            action => self.driver.execute(action).await,
        }
    }
}

/// Sleep until `deadline`. Pending forever without one.
async fn sleep_until<E: Environment>(env: &E, now: E::Instant, deadline: Option<E::Instant>) {
    match deadline {
        Some(deadline) if deadline > now => env.sleep(deadline - now).await,
        Some(_) => {},
        None => std::future::pending().await,
    }
}

/// Next value of an optional observer. Pending forever without one.
async fn next_value(observer: &mut Option<SettingsObserver>) -> Result<SettingValue, SettingsError> {
    match observer {
        Some(observer) => observer.changed().await,
        None => std::future::pending().await,
    }
}
