//! Clock widget: ticks while the screen is on, suspends while it is off.

use std::time::Duration;

use super::{
    SCREEN_CHANGE, SourceContext, SourceEvent, SourceSpec, StreamConfig, Widget, WidgetConfigs, WidgetState,
    source::DomEvent,
};
use crate::env::Environment;

/// Default period between clock refreshes.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

const TICK: &str = "clock-tick";
const SECS_PER_DAY: i64 = 86_400;

/// Clock widget configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Offset of local time from UTC
    pub utc_offset_minutes: i32,
    /// Refresh period while ticking
    pub tick_period: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { utc_offset_minutes: 0, tick_period: DEFAULT_TICK_PERIOD }
    }
}

impl ClockConfig {
    fn format(&self, wall_clock_secs: u64) -> String {
        let local = i64::try_from(wall_clock_secs).unwrap_or(i64::MAX) + i64::from(self.utc_offset_minutes) * 60;
        let of_day = local.rem_euclid(SECS_PER_DAY);
        format!("{:02}:{:02}", of_day / 3600, (of_day % 3600) / 60)
    }
}

/// What the clock shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockView {
    /// `HH:MM`, local time
    pub time: String,
    /// True while refreshes are paused
    pub suspended: bool,
}

/// Refreshing every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockTick {
    config: ClockConfig,
}

impl ClockTick {
    /// Create the state.
    pub fn new(config: ClockConfig) -> Self {
        Self { config }
    }
}

impl WidgetState<ClockView> for ClockTick {
    fn configs(&self) -> WidgetConfigs {
        WidgetConfigs {
            name: "clockTick",
            stream: StreamConfig {
                interrupts: vec![SCREEN_CHANGE.to_string(), TICK.to_string()],
                sources: vec![
                    SourceSpec::Dom { types: vec![SCREEN_CHANGE.to_string()] },
                    SourceSpec::Timer { name: TICK.to_string(), period: self.config.tick_period },
                ],
            },
        }
    }

    fn enter(&mut self, view: &mut ClockView, wall_clock_secs: u64) {
        view.suspended = false;
        view.time = self.config.format(wall_clock_secs);
    }

    fn handle_source_event(
        &mut self,
        event: &SourceEvent,
        view: &mut ClockView,
        _wall_clock_secs: u64,
    ) -> Option<Box<dyn WidgetState<ClockView>>> {
        match event {
            SourceEvent::Dom(DomEvent::ScreenChange { screen_enabled: false }) => {
                Some(Box::new(ClockSuspend::new(self.config)))
            },
            SourceEvent::Timer { wall_clock_secs, .. } => {
                view.time = self.config.format(*wall_clock_secs);
                None
            },
            _ => None,
        }
    }
}

/// Screen off, no refreshes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockSuspend {
    config: ClockConfig,
}

impl ClockSuspend {
    /// Create the state.
    pub fn new(config: ClockConfig) -> Self {
        Self { config }
    }
}

impl WidgetState<ClockView> for ClockSuspend {
    fn configs(&self) -> WidgetConfigs {
        WidgetConfigs {
            name: "clockSuspend",
            stream: StreamConfig {
                interrupts: vec![SCREEN_CHANGE.to_string()],
                sources: vec![SourceSpec::Dom { types: vec![SCREEN_CHANGE.to_string()] }],
            },
        }
    }

    fn enter(&mut self, view: &mut ClockView, _wall_clock_secs: u64) {
        view.suspended = true;
    }

    fn handle_source_event(
        &mut self,
        event: &SourceEvent,
        _view: &mut ClockView,
        _wall_clock_secs: u64,
    ) -> Option<Box<dyn WidgetState<ClockView>>> {
        match event {
            SourceEvent::Dom(DomEvent::ScreenChange { screen_enabled: true }) => {
                Some(Box::new(ClockTick::new(self.config)))
            },
            _ => None,
        }
    }
}

/// Clock widget starting in [`ClockTick`].
pub fn clock_widget<E: Environment>(config: ClockConfig, ctx: SourceContext, env: E) -> Widget<ClockView, E> {
    Widget::new("clock", Box::new(ClockTick::new(config)), ClockView::default(), ctx, env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::TEST_WALL_CLOCK_SECS;

    #[test]
    fn formats_local_time() {
        let utc = ClockConfig::default();
        assert_eq!(utc.format(TEST_WALL_CLOCK_SECS), "08:30");

        let behind = ClockConfig { utc_offset_minutes: -9 * 60, ..ClockConfig::default() };
        assert_eq!(behind.format(TEST_WALL_CLOCK_SECS), "23:30");
    }

    #[test]
    fn tick_refreshes_time_without_transfer() {
        let mut state = ClockTick::default();
        let mut view = ClockView::default();
        let tick = SourceEvent::Timer { name: TICK.to_string(), wall_clock_secs: TEST_WALL_CLOCK_SECS + 60 };

        assert!(state.handle_source_event(&tick, &mut view, 0).is_none());
        assert_eq!(view.time, "08:31");
    }

    #[test]
    fn screen_events_switch_states() {
        let mut tick = ClockTick::default();
        let mut suspend = ClockSuspend::default();
        let mut view = ClockView::default();
        let off = SourceEvent::Dom(DomEvent::ScreenChange { screen_enabled: false });
        let on = SourceEvent::Dom(DomEvent::ScreenChange { screen_enabled: true });

        let next = tick.handle_source_event(&off, &mut view, 0).map(|s| s.configs().name);
        assert_eq!(next, Some("clockSuspend"));
        assert!(tick.handle_source_event(&on, &mut view, 0).is_none());

        let next = suspend.handle_source_event(&on, &mut view, 0).map(|s| s.configs().name);
        assert_eq!(next, Some("clockTick"));
        assert!(suspend.handle_source_event(&off, &mut view, 0).is_none());
    }
}
