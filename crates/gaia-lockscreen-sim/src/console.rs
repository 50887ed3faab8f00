//! Line-based console driver.
//!
//! Implements the [`Driver`] trait over any line source (stdin, a script
//! file) and any writer. Every command line becomes one or more
//! [`LockScreenEvent`]s, every action the LockScreen requests is echoed with
//! a `>` prefix, and each change of the visible LockScreen is printed as one
//! status line.
//!
//! Unless the platform is manual, the driver also plays the part of the
//! system: it answers input pad requests with the matching input app events
//! and unlock requests with the window closing.

use std::{collections::VecDeque, io, io::Write, time::Instant};

use gaia_lockscreen_app::{ActionExecutor, Driver, LockScreenEvent, Snapshot};
use gaia_lockscreen_core::{LockScreenAction, ValidationStatus, lockscreen::KeypadVisibility};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::command::Command;

/// Console driver errors.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// I/O error reading commands or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Console driver implementing the [`Driver`] trait.
pub struct ConsoleDriver<R, W> {
    lines: Lines<R>,
    out: W,
    /// Events of the current command not delivered yet, and platform answers
    pending: VecDeque<LockScreenEvent>,
    wait_until: Option<tokio::time::Instant>,
    manual_platform: bool,
    last_status: Option<String>,
    line_number: usize,
}

impl<R, W> ConsoleDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Create a driver reading commands from `input` and writing to `out`.
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
            pending: VecDeque::new(),
            wait_until: None,
            manual_platform: false,
            last_status: None,
            line_number: 0,
        }
    }

    /// Leave input app and window events to the commands.
    #[must_use]
    pub fn with_manual_platform(mut self) -> Self {
        self.manual_platform = true;
        self
    }

    /// Writer the driver prints to.
    pub fn output(&self) -> &W {
        &self.out
    }

    fn answer(&mut self, action: &LockScreenAction) {
        let reply = match action {
            LockScreenAction::OpenInputPad => LockScreenEvent::InputAppOpening,
            LockScreenAction::CloseInputPad => LockScreenEvent::InputAppClosed,
            LockScreenAction::RequestUnlock { .. } => LockScreenEvent::AppClosed,
            _ => return,
        };
        self.pending.push_back(reply);
    }
}

impl<R, W> ActionExecutor for ConsoleDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Error = ConsoleError;

    async fn execute(&mut self, action: LockScreenAction) -> Result<(), ConsoleError> {
        writeln!(self.out, "> {}", describe(&action))?;
        if !self.manual_platform {
            self.answer(&action);
        }
        Ok(())
    }
}

impl<R, W> Driver for ConsoleDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<LockScreenEvent>, ConsoleError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if let Some(deadline) = self.wait_until {
                tokio::time::sleep_until(deadline).await;
                self.wait_until = None;
            }

            let Some(line) = self.lines.next_line().await? else {
                tracing::debug!(lines = self.line_number, "end of input");
                return Ok(None);
            };
            self.line_number += 1;

            match Command::parse(&line) {
                Ok(Some(Command::Events(events))) => self.pending.extend(events),
                Ok(Some(Command::Wait(duration))) => {
                    self.wait_until = Some(tokio::time::Instant::now() + duration);
                },
                Ok(Some(Command::Quit)) => return Ok(None),
                Ok(None) => {},
                Err(error) => {
                    tracing::warn!(line = self.line_number, %error, "command ignored");
                    writeln!(self.out, "! line {}: {error}", self.line_number)?;
                },
            }
        }
    }

    fn render(&mut self, snapshot: &Snapshot<'_, Instant>) -> Result<(), ConsoleError> {
        let status = status_line(snapshot);
        if self.last_status.as_deref() != Some(status.as_str()) {
            writeln!(self.out, "{status}")?;
            self.last_status = Some(status);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Err(error) = self.out.flush() {
            tracing::warn!(%error, "flushing output failed");
        }
    }
}

fn describe(action: &LockScreenAction) -> String {
    match action {
        LockScreenAction::PanelChanged { from, to } => format!("panel {from} -> {to}"),
        LockScreenAction::OpenInputPad => "open input pad".to_string(),
        LockScreenAction::CloseInputPad => "close input pad".to_string(),
        LockScreenAction::InvokeSecureApp(app) => format!("launch secure app {} ({})", app.name, app.url),
        LockScreenAction::RequestPasscodeValidation { passcode } => {
            format!("validate {} digits", passcode.len())
        },
        LockScreenAction::NotifyValidationFailed => "passcode rejected".to_string(),
        LockScreenAction::Vibrate { pattern } => format!("vibrate {pattern:?}"),
        LockScreenAction::ScheduleStatusReset { after } => format!("reset status in {after:?}"),
        LockScreenAction::RequestUnlock { message } => {
            let mut line = "unlock".to_string();
            if let Some(id) = &message.notification_id {
                line.push_str(&format!(" for notification {id}"));
            }
            if let Some(activity) = &message.activity {
                line.push_str(&format!(" into {activity}"));
            }
            line
        },
    }
}

fn status_line(snapshot: &Snapshot<'_, Instant>) -> String {
    let view = snapshot.view;
    let status = match view.passcode_status {
        None => "-",
        Some(ValidationStatus::Success) => "ok",
        Some(ValidationStatus::Error) => "error",
    };
    let keypad = match view.keypad {
        KeypadVisibility::Hidden => "hidden",
        KeypadVisibility::Rising => "rising",
        KeypadVisibility::Shown => "shown",
        KeypadVisibility::Hiding => "hiding",
    };
    let highlighted = snapshot.notifications.current_highlighted();
    let notifications: Vec<String> = snapshot
        .notifications
        .nodes()
        .iter()
        .map(|node| {
            let id = node.notification_id.as_str();
            if highlighted == Some(id) { format!("{id}*") } else { id.to_string() }
        })
        .collect();

    format!(
        "[{}] {} panel={} digits={} status={} keypad={} locked={} airplane={} notifications=[{}]",
        if snapshot.clock.suspended { "--:--" } else { snapshot.clock.time.as_str() },
        snapshot.state,
        view.panel,
        "*".repeat(view.passcode_len),
        status,
        keypad,
        view.locked,
        snapshot.connection.airplane_mode,
        notifications.join(" "),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gaia_lockscreen_app::{Runtime, RuntimeConfig, SystemEnv};
    use gaia_lockscreen_core::{
        MemorySettings, SettingValue, SettingsStore, StateType,
        settings::{PASSCODE_CODE, PASSCODE_ENABLED},
    };

    use super::*;

    fn driver(script: &str) -> ConsoleDriver<&[u8], Vec<u8>> {
        ConsoleDriver::new(script.as_bytes(), Vec::new())
    }

    fn output<R>(driver: &ConsoleDriver<R, Vec<u8>>) -> String {
        String::from_utf8_lossy(&driver.out).into_owned()
    }

    #[tokio::test]
    async fn commands_become_events() {
        let mut driver = driver("# comment\nslide right\nkey 12\nquit\nhome\n");

        assert_eq!(driver.poll_event().await.unwrap(), Some(LockScreenEvent::SlideActivateRight));
        assert!(matches!(driver.poll_event().await.unwrap(), Some(LockScreenEvent::KeypadInput(_))));
        assert!(matches!(driver.poll_event().await.unwrap(), Some(LockScreenEvent::KeypadInput(_))));
        assert_eq!(driver.poll_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn bad_lines_are_reported_and_skipped() {
        let mut driver = driver("fly away\nhome\n");

        assert_eq!(driver.poll_event().await.unwrap(), Some(LockScreenEvent::HomePressed));
        assert_eq!(output(&driver), "! line 1: unknown command `fly`\n");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_delays_next_command() {
        let mut driver = driver("wait 1500\nhome\n");
        let started = tokio::time::Instant::now();

        assert_eq!(driver.poll_event().await.unwrap(), Some(LockScreenEvent::HomePressed));
        assert!(tokio::time::Instant::now() - started >= std::time::Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn platform_answers_come_first() {
        let mut driver = driver("home\n");

        driver.execute(LockScreenAction::OpenInputPad).await.unwrap();

        assert_eq!(driver.poll_event().await.unwrap(), Some(LockScreenEvent::InputAppOpening));
        assert_eq!(driver.poll_event().await.unwrap(), Some(LockScreenEvent::HomePressed));
        assert_eq!(output(&driver), "> open input pad\n");
    }

    #[tokio::test]
    async fn manual_platform_does_not_answer() {
        let mut driver = driver("").with_manual_platform();

        driver.execute(LockScreenAction::CloseInputPad).await.unwrap();

        assert_eq!(driver.poll_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unlock_without_passcode_end_to_end() {
        let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
        let mut runtime = Runtime::new(driver("slide right\n"), SystemEnv, settings, RuntimeConfig::default());

        runtime.run().await.unwrap();

        assert_eq!(runtime.manager().current(), StateType::SlideShow);
        let out = output(runtime.driver());
        assert!(out.contains("> unlock\n"), "{out}");
        assert!(out.contains("locked=false"), "{out}");
    }

    #[tokio::test]
    async fn passcode_unlock_end_to_end() {
        let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettings::with_values([
            (PASSCODE_ENABLED, SettingValue::from(true)),
            (PASSCODE_CODE, SettingValue::from("1234")),
        ]));
        let mut runtime =
            Runtime::new(driver("slide right\nkey 1234\n"), SystemEnv, settings, RuntimeConfig::default());

        runtime.run().await.unwrap();

        let out = output(runtime.driver());
        assert!(out.contains("> validate 4 digits\n"), "{out}");
        assert!(out.contains("> unlock\n"), "{out}");
        assert!(out.contains("keypadShow panel=passcode digits=**** status=-"), "{out}");
    }
}
