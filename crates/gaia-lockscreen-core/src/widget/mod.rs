//! Widget sub-machines.
//!
//! A widget is a small state machine living inside the LockScreen, clocked
//! by its own sources rather than by the top-level controller. Each state
//! declares the sources it needs and the event types it reacts to. The
//! widget opens a fresh [`Stream`] for every state it enters and stops the
//! previous one, so no listener outlives the state that declared it. The
//! platform bus receiver moves from one stream to the next, so a screen
//! change published during a transfer still reaches the new state.
//!
//! Failures never propagate: a source that cannot start leaves the widget in
//! its last known-good state and display.

mod clock;
mod connection;
mod source;

pub use clock::{ClockConfig, ClockSuspend, ClockTick, ClockView, DEFAULT_TICK_PERIOD, clock_widget};
pub use connection::{AirplaneMode, ConnectionView, RadioOn, connection_widget};
pub use source::{DomEvent, SCREEN_CHANGE, SourceContext, SourceEvent, SourceSpec, Stream, StreamConfig};

use crate::env::Environment;

/// Static description of a widget state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfigs {
    /// State name
    pub name: &'static str,
    /// Interrupts and sources
    pub stream: StreamConfig,
}

/// One state of a widget rendering into a view `V`.
pub trait WidgetState<V>: Send {
    /// Name and stream declaration.
    fn configs(&self) -> WidgetConfigs;

    /// Entry side effects on the view.
    fn enter(&mut self, _view: &mut V, _wall_clock_secs: u64) {}

    /// React to an event. Returns the state to transfer to, if any.
    fn handle_source_event(
        &mut self,
        event: &SourceEvent,
        view: &mut V,
        wall_clock_secs: u64,
    ) -> Option<Box<dyn WidgetState<V>>>;
}

/// A running widget.
pub struct Widget<V, E: Environment> {
    name: &'static str,
    state: Box<dyn WidgetState<V>>,
    stream: Option<Stream>,
    view: V,
    ctx: SourceContext,
    env: E,
}

impl<V, E: Environment> Widget<V, E> {
    /// Create a stopped widget in `initial`.
    pub fn new(name: &'static str, initial: Box<dyn WidgetState<V>>, view: V, ctx: SourceContext, env: E) -> Self {
        Self { name, state: initial, stream: None, view, ctx, env }
    }

    /// Widget name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the current state.
    pub fn state_name(&self) -> &'static str {
        self.state.configs().name
    }

    /// Current display.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Returns true while sources are wired.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Wire the current state's sources and apply its entry.
    ///
    /// If a source fails the widget stays stopped with its display untouched.
    pub fn start(&mut self) {
        if self.stream.is_some() {
            return;
        }
        let configs = self.state.configs();
        match Stream::open(&configs.stream, &self.ctx, &self.env) {
            Ok(stream) => {
                self.state.enter(&mut self.view, self.env.wall_clock_secs());
                self.stream = Some(stream);
                tracing::debug!(widget = self.name, state = configs.name, "widget started");
            },
            Err(error) => {
                tracing::warn!(widget = self.name, state = configs.name, %error, "widget source failed");
            },
        }
    }

    /// Tear down every listener.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!(widget = self.name, "widget stopped");
        }
    }

    /// Wait for the next interrupt and handle it.
    ///
    /// Pending forever while stopped. Returns false once every source ended,
    /// which also stops the widget. Cancel safe.
    pub async fn step(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return std::future::pending().await;
        };
        match stream.next().await {
            Some(event) => {
                self.handle_source_event(&event);
                true
            },
            None => {
                self.stop();
                false
            },
        }
    }

    /// Dispatch one event to the current state.
    pub fn handle_source_event(&mut self, event: &SourceEvent) {
        let now = self.env.wall_clock_secs();
        if let Some(next) = self.state.handle_source_event(event, &mut self.view, now) {
            self.transfer(next);
        }
    }

    fn transfer(&mut self, mut next: Box<dyn WidgetState<V>>) {
        let configs = next.configs();
        let opened = match self.stream.as_mut() {
            Some(previous) => Stream::open_after(&configs.stream, &self.ctx, &self.env, previous),
            None => Stream::open(&configs.stream, &self.ctx, &self.env),
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(
                    widget = self.name,
                    from = self.state.configs().name,
                    to = configs.name,
                    %error,
                    "widget transfer aborted"
                );
                return;
            },
        };

        if let Some(mut old) = self.stream.replace(stream) {
            old.stop();
        }
        tracing::debug!(widget = self.name, from = self.state.configs().name, to = configs.name, "widget transfer");
        next.enter(&mut self.view, self.env.wall_clock_secs());
        self.state = next;
    }
}

impl<V, E: Environment> Drop for Widget<V, E> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<V: std::fmt::Debug, E: Environment> std::fmt::Debug for Widget<V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("name", &self.name)
            .field("state", &self.state_name())
            .field("running", &self.is_running())
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}
