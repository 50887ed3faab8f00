//! Widget event sources.
//!
//! A [`Stream`] owns every source of one widget state. Setting and timer
//! sources run as tasks in a [`JoinSet`] and forward into a single channel.
//! Platform events are read straight from the stream's own bus receiver,
//! which a widget hands from one state's stream to the next, so events
//! published while a transfer is in flight reach the new state. Stopping or
//! dropping the stream aborts every task and drops the receiver, which tears
//! down every listener.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc},
    task::JoinSet,
};

use crate::{
    env::Environment,
    error::SourceError,
    settings::{SettingValue, SettingsStore},
};

/// `screenchange` event type.
pub const SCREEN_CHANGE: &str = "screenchange";

/// Event published on the platform event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    /// Screen turned on or off
    ScreenChange {
        /// True if the screen is now on
        screen_enabled: bool,
    },
    /// Any other named event
    Named(String),
}

impl DomEvent {
    /// Event type the event is dispatched under.
    pub fn event_type(&self) -> &str {
        match self {
            Self::ScreenChange { .. } => SCREEN_CHANGE,
            Self::Named(name) => name,
        }
    }
}

/// Event delivered to a widget state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// Platform event
    Dom(DomEvent),
    /// A setting was read or changed
    Setting {
        /// Setting key
        key: String,
        /// New value
        value: SettingValue,
    },
    /// A timer fired
    Timer {
        /// Timer name
        name: String,
        /// Wall clock when it fired
        wall_clock_secs: u64,
    },
}

impl SourceEvent {
    /// Event type matched against a state's interrupts.
    ///
    /// Platform events use their type, settings their key, timers their name.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Dom(event) => event.event_type(),
            Self::Setting { key, .. } => key,
            Self::Timer { name, .. } => name,
        }
    }
}

/// Declaration of one source adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Listen to platform events of the given types
    Dom {
        /// Event types to forward
        types: Vec<String>,
    },
    /// Observe a setting
    Setting {
        /// Setting key
        key: String,
        /// Value used while the setting was never written
        default: SettingValue,
    },
    /// Fire periodically
    Timer {
        /// Timer name, used as event type
        name: String,
        /// Firing period
        period: Duration,
    },
}

impl SourceSpec {
    /// Human readable description, for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Dom { types } => format!("dom:{}", types.join(",")),
            Self::Setting { key, .. } => format!("setting:{key}"),
            Self::Timer { name, .. } => format!("timer:{name}"),
        }
    }
}

/// Interrupts and sources of one widget state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConfig {
    /// Event types the state reacts to, in priority order
    pub interrupts: Vec<String>,
    /// Source adapters feeding the state
    pub sources: Vec<SourceSpec>,
}

/// Handles shared by every source of a widget.
#[derive(Clone)]
pub struct SourceContext {
    /// Platform event bus
    pub dom: broadcast::Sender<DomEvent>,
    /// Settings backend
    pub settings: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for SourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceContext").field("dom_receivers", &self.dom.receiver_count()).finish_non_exhaustive()
    }
}

/// Running sources of one widget state.
#[derive(Debug)]
pub struct Stream {
    interrupts: Vec<String>,
    events: mpsc::UnboundedReceiver<SourceEvent>,
    /// False once every task source ended
    tasks_open: bool,
    dom: Option<DomListener>,
    tasks: JoinSet<()>,
}

/// Platform bus receiver with the event types the state declared.
#[derive(Debug)]
struct DomListener {
    types: Vec<String>,
    bus: broadcast::Receiver<DomEvent>,
}

impl DomListener {
    fn accepts(&self, event: &DomEvent) -> bool {
        self.types.iter().any(|t| t == event.event_type())
    }
}

enum Received {
    Dom(Result<DomEvent, broadcast::error::RecvError>),
    Task(Option<SourceEvent>),
}

impl Stream {
    /// Start every source in `config`.
    ///
    /// All or nothing: if one source fails, the ones already started are
    /// aborted and the error is returned.
    pub fn open<E: Environment>(config: &StreamConfig, ctx: &SourceContext, env: &E) -> Result<Self, SourceError> {
        Self::open_with_bus(config, ctx, env, None)
    }

    /// Start every source in `config`, taking over the platform bus receiver
    /// of `previous`.
    ///
    /// Platform events `previous` has not read yet are delivered by the new
    /// stream. On error `previous` keeps its receiver.
    pub fn open_after<E: Environment>(
        config: &StreamConfig,
        ctx: &SourceContext,
        env: &E,
        previous: &mut Stream,
    ) -> Result<Self, SourceError> {
        Self::open_with_bus(config, ctx, env, Some(previous))
    }

    fn open_with_bus<E: Environment>(
        config: &StreamConfig,
        ctx: &SourceContext,
        env: &E,
        previous: Option<&mut Stream>,
    ) -> Result<Self, SourceError> {
        let (tx, events) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        let mut dom_types: Vec<String> = Vec::new();
        for source in &config.sources {
            match source {
                SourceSpec::Dom { types } if types.is_empty() => {
                    return Err(SourceError::NoEventTypes { source_name: source.describe() });
                },
                SourceSpec::Dom { types } => dom_types.extend(types.iter().cloned()),
                SourceSpec::Setting { .. } | SourceSpec::Timer { .. } => {
                    start_source(source, ctx, env, &mut tasks, tx.clone())?;
                },
            }
        }

        let dom = if dom_types.is_empty() {
            None
        } else {
            let bus = previous.and_then(|stream| stream.dom.take()).map_or_else(|| ctx.dom.subscribe(), |dom| dom.bus);
            Some(DomListener { types: dom_types, bus })
        };
        Ok(Self { interrupts: config.interrupts.clone(), events, tasks_open: true, dom, tasks })
    }

    /// Next event matching the interrupts. `None` once every source ended.
    pub async fn next(&mut self) -> Option<SourceEvent> {
        loop {
            let event = self.recv().await?;
            if self.interrupts.iter().any(|i| i == event.event_type()) {
                return Some(event);
            }
        }
    }

    async fn recv(&mut self) -> Option<SourceEvent> {
        loop {
            let received = match (self.dom.as_mut(), self.tasks_open) {
                (None, false) => return None,
                (None, true) => Received::Task(self.events.recv().await),
                (Some(dom), false) => Received::Dom(dom.bus.recv().await),
                (Some(dom), true) => tokio::select! {
                    biased;

                    received = dom.bus.recv() => Received::Dom(received),
                    event = self.events.recv() => Received::Task(event),
                },
            };

            match received {
                Received::Task(Some(event)) => return Some(event),
                Received::Task(None) => self.tasks_open = false,
                Received::Dom(Ok(event)) if self.dom.as_ref().is_some_and(|dom| dom.accepts(&event)) => {
                    return Some(SourceEvent::Dom(event));
                },
                Received::Dom(Ok(_)) => {},
                Received::Dom(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "dom source lagged");
                },
                Received::Dom(Err(broadcast::error::RecvError::Closed)) => self.dom = None,
            }
        }
    }

    /// Number of live sources.
    pub fn running_sources(&self) -> usize {
        self.tasks.len() + usize::from(self.dom.is_some())
    }

    /// Abort every source.
    pub fn stop(&mut self) {
        self.tasks.abort_all();
        self.events.close();
        self.dom = None;
    }
}

fn start_source<E: Environment>(
    source: &SourceSpec,
    ctx: &SourceContext,
    env: &E,
    tasks: &mut JoinSet<()>,
    tx: mpsc::UnboundedSender<SourceEvent>,
) -> Result<(), SourceError> {
    match source {
        // Read by the stream itself
        SourceSpec::Dom { .. } => {},
        SourceSpec::Setting { key, default } => {
            let mut observer = ctx
                .settings
                .observe(key, default.clone())
                .map_err(|error| SourceError::Settings { source_name: source.describe(), error })?;
            let key = key.clone();
            tasks.spawn(async move {
                while let Ok(value) = observer.changed().await {
                    if tx.send(SourceEvent::Setting { key: key.clone(), value }).is_err() {
                        break;
                    }
                }
            });
        },
        SourceSpec::Timer { name, period } => {
            if period.is_zero() {
                return Err(SourceError::ZeroPeriod { source_name: source.describe() });
            }
            let (name, period, env) = (name.clone(), *period, env.clone());
            tasks.spawn(async move {
                loop {
                    env.sleep(period).await;
                    let event = SourceEvent::Timer { name: name.clone(), wall_clock_secs: env.wall_clock_secs() };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            });
        },
    }
    Ok(())
}
