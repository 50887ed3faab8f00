//! Connection state widget, driven by `ril.radio.disabled`.

use super::{SourceContext, SourceEvent, SourceSpec, StreamConfig, Widget, WidgetConfigs, WidgetState};
use crate::{env::Environment, settings::RADIO_DISABLED};

/// What the connection line shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionView {
    /// True while airplane mode is on
    pub airplane_mode: bool,
}

fn radio_stream() -> StreamConfig {
    StreamConfig {
        interrupts: vec![RADIO_DISABLED.to_string()],
        sources: vec![SourceSpec::Setting { key: RADIO_DISABLED.to_string(), default: false.into() }],
    }
}

fn radio_disabled(event: &SourceEvent) -> Option<bool> {
    match event {
        SourceEvent::Setting { key, value } if key == RADIO_DISABLED => Some(value.as_bool()),
        _ => None,
    }
}

/// Radio enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadioOn;

impl WidgetState<ConnectionView> for RadioOn {
    fn configs(&self) -> WidgetConfigs {
        WidgetConfigs { name: "radioOn", stream: radio_stream() }
    }

    fn enter(&mut self, view: &mut ConnectionView, _wall_clock_secs: u64) {
        view.airplane_mode = false;
    }

    fn handle_source_event(
        &mut self,
        event: &SourceEvent,
        _view: &mut ConnectionView,
        _wall_clock_secs: u64,
    ) -> Option<Box<dyn WidgetState<ConnectionView>>> {
        match radio_disabled(event) {
            Some(true) => Some(Box::new(AirplaneMode)),
            _ => None,
        }
    }
}

/// Radio disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirplaneMode;

impl WidgetState<ConnectionView> for AirplaneMode {
    fn configs(&self) -> WidgetConfigs {
        WidgetConfigs { name: "airplaneMode", stream: radio_stream() }
    }

    fn enter(&mut self, view: &mut ConnectionView, _wall_clock_secs: u64) {
        view.airplane_mode = true;
    }

    fn handle_source_event(
        &mut self,
        event: &SourceEvent,
        _view: &mut ConnectionView,
        _wall_clock_secs: u64,
    ) -> Option<Box<dyn WidgetState<ConnectionView>>> {
        match radio_disabled(event) {
            Some(false) => Some(Box::new(RadioOn)),
            _ => None,
        }
    }
}

/// Connection widget starting in [`RadioOn`].
pub fn connection_widget<E: Environment>(ctx: SourceContext, env: E) -> Widget<ConnectionView, E> {
    Widget::new("connection", Box::new(RadioOn), ConnectionView::default(), ctx, env)
}
