//! Simulator command language.
//!
//! One command per line. Blank lines and lines starting with `#` are
//! skipped, so scripts can be commented.
//!
//! ```text
//! screen on|off|proximity     home
//! slide left|right            drag <delta>      release
//! key <keys>                  inputpad open|show|close
//! appclosed                   lock              unlock [force]
//! secure opened|closing|terminated
//! notify <id> [text]          tap <id>          dismiss <id>      blur
//! radio on|off                set <key> <value>
//! wait <ms>                   quit
//! ```
//!
//! Keys use the pad codes: digits, `b` (backspace), `c` (cancel), `e`
//! (emergency call). `key 1234` types four digits.

use std::time::Duration;

use gaia_lockscreen_app::LockScreenEvent;
use gaia_lockscreen_core::{KeypadKey, SettingValue, settings::RADIO_DISABLED};
use thiserror::Error;

/// Errors from parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// First word is not a command.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    /// Required argument missing.
    #[error("`{command}` needs {expected}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// What was expected
        expected: &'static str,
    },

    /// Argument not understood.
    #[error("`{command}`: invalid argument `{value}`")]
    InvalidArgument {
        /// Command name
        command: &'static str,
        /// Offending argument
        value: String,
    },
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Deliver these events, in order.
    Events(Vec<LockScreenEvent>),
    /// Let time pass.
    Wait(Duration),
    /// Stop the simulator.
    Quit,
}

impl Command {
    /// Parse one line. Returns `Ok(None)` for blank and comment lines.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let event = match name {
            "quit" | "exit" => return Ok(Some(Self::Quit)),
            "wait" => {
                let ms = required("wait", arg, "milliseconds")?;
                let ms = ms.parse::<u64>().map_err(|_| invalid("wait", ms))?;
                return Ok(Some(Self::Wait(Duration::from_millis(ms))));
            },
            "key" => {
                let keys = required("key", arg, "key codes")?;
                let events = keys
                    .chars()
                    .map(|code| KeypadKey::from_code(code).ok_or_else(|| invalid("key", keys)))
                    .map(|key| key.map(LockScreenEvent::KeypadInput))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Some(Self::Events(events)));
            },
            "screen" => match required("screen", arg, "on, off or proximity")? {
                "on" => LockScreenEvent::ScreenChanged { enabled: true, by_proximity: false },
                "off" => LockScreenEvent::ScreenChanged { enabled: false, by_proximity: false },
                "proximity" => LockScreenEvent::ScreenChanged { enabled: false, by_proximity: true },
                other => return Err(invalid("screen", other)),
            },
            "home" => LockScreenEvent::HomePressed,
            "slide" => match required("slide", arg, "left or right")? {
                "left" => LockScreenEvent::SlideActivateLeft,
                "right" => LockScreenEvent::SlideActivateRight,
                other => return Err(invalid("slide", other)),
            },
            "drag" => {
                let delta = required("drag", arg, "a distance")?;
                LockScreenEvent::SlideDragged { delta: delta.parse().map_err(|_| invalid("drag", delta))? }
            },
            "release" => LockScreenEvent::SlideReleased,
            "inputpad" => match required("inputpad", arg, "open, show or close")? {
                "open" => LockScreenEvent::InputAppOpening,
                "show" => LockScreenEvent::InputAppOpened,
                "close" => LockScreenEvent::InputAppClosed,
                other => return Err(invalid("inputpad", other)),
            },
            "appclosed" => LockScreenEvent::AppClosed,
            "lock" => LockScreenEvent::RequestLock,
            "unlock" => match arg {
                None => LockScreenEvent::RequestUnlock { forcibly: false },
                Some("force") => LockScreenEvent::RequestUnlock { forcibly: true },
                Some(other) => return Err(invalid("unlock", other)),
            },
            "secure" => match required("secure", arg, "opened, closing or terminated")? {
                "opened" => LockScreenEvent::SecureAppOpened,
                "closing" => LockScreenEvent::SecureAppClosing,
                "terminated" => LockScreenEvent::SecureAppTerminated,
                other => return Err(invalid("secure", other)),
            },
            "notify" => {
                let id = required("notify", arg, "a notification id")?;
                let body = words.collect::<Vec<_>>().join(" ");
                LockScreenEvent::NotificationAdded { notification_id: id.to_string(), title: id.to_string(), body }
            },
            "tap" => LockScreenEvent::NotificationTapped {
                notification_id: required("tap", arg, "a notification id")?.to_string(),
            },
            "dismiss" => LockScreenEvent::NotificationRemoved {
                notification_id: required("dismiss", arg, "a notification id")?.to_string(),
            },
            "blur" => LockScreenEvent::NotificationsBlurred,
            "radio" => {
                let disabled = match required("radio", arg, "on or off")? {
                    "on" => false,
                    "off" => true,
                    other => return Err(invalid("radio", other)),
                };
                LockScreenEvent::SettingChanged { key: RADIO_DISABLED.to_string(), value: disabled.into() }
            },
            "set" => {
                let key = required("set", arg, "a key and a value")?;
                let value = required("set", words.next(), "a value")?;
                LockScreenEvent::SettingChanged { key: key.to_string(), value: setting_value(value) }
            },
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };
        Ok(Some(Self::Events(vec![event])))
    }
}

/// `true`/`false` and integers keep their type, anything else is a string.
/// Digits with a leading zero stay a string so passcodes survive.
fn setting_value(text: &str) -> SettingValue {
    match text {
        "true" => SettingValue::Bool(true),
        "false" => SettingValue::Bool(false),
        _ => match text.parse::<i64>() {
            Ok(number) if number.to_string() == text => SettingValue::Int(number),
            _ => SettingValue::from(text),
        },
    }
}

fn required<'a>(command: &'static str, arg: Option<&'a str>, expected: &'static str) -> Result<&'a str, ParseError> {
    arg.ok_or(ParseError::MissingArgument { command, expected })
}

fn invalid(command: &'static str, value: &str) -> ParseError {
    ParseError::InvalidArgument { command, value: value.to_string() }
}
