//! Error types for the LockScreen core.
//!
//! Top-level state transitions cannot fail, so there is no transition error
//! here. Errors exist only at the edges that legitimately fail: the settings
//! store and the widget source adapters built on top of it.

use thiserror::Error;

/// Errors raised by a [`crate::settings::SettingsStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The setting cannot be read (backend missing or key locked).
    #[error("setting unavailable: {key}")]
    Unavailable {
        /// Setting key
        key: String,
    },

    /// The store was dropped while observers were still alive.
    #[error("settings store closed")]
    Closed,
}

/// Errors raised while starting a widget source adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// A settings-backed source could not observe its key.
    #[error("source {source_name} failed to observe setting: {error}")]
    Settings {
        /// Source description
        source_name: String,
        /// Underlying settings failure
        error: SettingsError,
    },

    /// The source was declared with an empty event type list.
    #[error("source {source_name} declares no event types")]
    NoEventTypes {
        /// Source description
        source_name: String,
    },

    /// A timer source was declared with a zero period.
    #[error("timer {source_name} has a zero period")]
    ZeroPeriod {
        /// Source description
        source_name: String,
    },
}

impl SourceError {
    /// Returns true if the widget may keep its last display and retry later.
    ///
    /// Settings failures are environmental. Declaration errors never heal.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Settings { error, .. } => matches!(error, SettingsError::Unavailable { .. }),
            Self::NoEventTypes { .. } | Self::ZeroPeriod { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_setting_is_recoverable() {
        let err = SourceError::Settings {
            source_name: "setting:ril.radio.disabled".to_string(),
            error: SettingsError::Unavailable { key: "ril.radio.disabled".to_string() },
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn declaration_errors_are_not_recoverable() {
        assert!(!SourceError::NoEventTypes { source_name: "dom".to_string() }.is_recoverable());
        assert!(!SourceError::ZeroPeriod { source_name: "timer:tick".to_string() }.is_recoverable());

        let closed = SourceError::Settings { source_name: "setting:x".to_string(), error: SettingsError::Closed };
        assert!(!closed.is_recoverable());
    }

    #[test]
    fn display_names_the_key() {
        let err = SettingsError::Unavailable { key: "lockscreen.enabled".to_string() };
        assert_eq!(err.to_string(), "setting unavailable: lockscreen.enabled");
    }
}
