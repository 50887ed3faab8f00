//! Settings store abstraction.
//!
//! The LockScreen never reads settings synchronously. Every consumer observes
//! a key with a default and receives the current value once, then again on
//! every change. [`MemorySettings`] is the in-process store used by the
//! runtime and by tests.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Mutex, PoisonError},
};

use tokio::sync::watch;

use crate::error::SettingsError;

/// `lockscreen.enabled`
pub const LOCKSCREEN_ENABLED: &str = "lockscreen.enabled";
/// `lockscreen.passcode-lock.enabled`
pub const PASSCODE_ENABLED: &str = "lockscreen.passcode-lock.enabled";
/// `lockscreen.passcode-lock.timeout`, in seconds
pub const PASSCODE_TIMEOUT: &str = "lockscreen.passcode-lock.timeout";
/// Legacy plain passcode.
pub const PASSCODE_CODE: &str = "lockscreen.passcode-lock.code";
/// Hex-encoded salt of the passcode digest.
pub const PASSCODE_DIGEST_SALT: &str = "lockscreen.passcode-lock.digest.salt";
/// Hex-encoded HMAC-SHA-256 of the passcode.
pub const PASSCODE_DIGEST_VALUE: &str = "lockscreen.passcode-lock.digest.value";
/// `ril.radio.disabled`, true while airplane mode is on
pub const RADIO_DISABLED: &str = "ril.radio.disabled";

/// A settings value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// Boolean setting
    Bool(bool),
    /// Integer setting
    Int(i64),
    /// String setting
    Str(String),
}

impl SettingValue {
    /// Interpret the value as a flag.
    ///
    /// Settings written by older components store flags as strings, so any
    /// string other than `"false"` counts as set.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Int(value) => *value != 0,
            Self::Str(value) => value != "false",
        }
    }

    /// Interpret the value as an integer, parsing strings.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Bool(_) => None,
            Self::Int(value) => Some(*value),
            Self::Str(value) => value.trim().parse().ok(),
        }
    }

    /// Borrow the string payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            Self::Bool(_) | Self::Int(_) => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Live view of one setting.
///
/// The first call to [`changed`](Self::changed) resolves immediately with the
/// current value (or the default when the key was never written). Later calls
/// resolve on every write. Dropping the observer unsubscribes.
#[derive(Debug)]
pub struct SettingsObserver {
    key: String,
    default: SettingValue,
    rx: watch::Receiver<Option<SettingValue>>,
}

impl SettingsObserver {
    fn new(key: &str, default: SettingValue, mut rx: watch::Receiver<Option<SettingValue>>) -> Self {
        rx.mark_changed();
        Self { key: key.to_string(), default, rx }
    }

    /// Observed key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value, falling back to the default.
    pub fn current(&self) -> SettingValue {
        self.rx.borrow().clone().unwrap_or_else(|| self.default.clone())
    }

    /// Wait for the next value.
    ///
    /// Cancel safe: dropping the future loses no notification.
    pub async fn changed(&mut self) -> Result<SettingValue, SettingsError> {
        self.rx.changed().await.map_err(|_| SettingsError::Closed)?;
        let value = self.rx.borrow_and_update().clone();
        Ok(value.unwrap_or_else(|| self.default.clone()))
    }
}

/// A key/value settings backend.
pub trait SettingsStore: Send + Sync {
    /// Observe `key`, using `default` while it has never been written.
    fn observe(&self, key: &str, default: SettingValue) -> Result<SettingsObserver, SettingsError>;

    /// Read the stored value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<SettingValue>, SettingsError>;

    /// Write a value and notify observers.
    fn set(&self, key: &str, value: SettingValue) -> Result<(), SettingsError>;
}

#[derive(Default)]
struct MemoryInner {
    entries: HashMap<String, watch::Sender<Option<SettingValue>>>,
    unavailable: HashSet<String>,
}

impl MemoryInner {
    fn check(&self, key: &str) -> Result<(), SettingsError> {
        if self.unavailable.contains(key) {
            return Err(SettingsError::Unavailable { key: key.to_string() });
        }
        Ok(())
    }

    fn entry(&mut self, key: &str) -> &watch::Sender<Option<SettingValue>> {
        self.entries.entry(key.to_string()).or_insert_with(|| watch::channel(None).0)
    }
}

/// In-process settings store.
#[derive(Default)]
pub struct MemorySettings {
    inner: Mutex<MemoryInner>,
}

impl MemorySettings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `values`.
    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<SettingValue>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for (key, value) in values {
                inner.entry(key.as_ref()).send_replace(Some(value.into()));
            }
        }
        store
    }

    /// Make `key` fail every subsequent operation.
    ///
    /// Simulates a locked or missing backend entry.
    pub fn make_unavailable(&self, key: &str) {
        self.lock().unavailable.insert(key.to_string());
    }

    /// Undo [`make_unavailable`](Self::make_unavailable).
    pub fn make_available(&self, key: &str) {
        self.lock().unavailable.remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MemorySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemorySettings")
            .field("keys", &inner.entries.len())
            .field("unavailable", &inner.unavailable)
            .finish()
    }
}

impl SettingsStore for MemorySettings {
    fn observe(&self, key: &str, default: SettingValue) -> Result<SettingsObserver, SettingsError> {
        let mut inner = self.lock();
        inner.check(key)?;
        let rx = inner.entry(key).subscribe();
        Ok(SettingsObserver::new(key, default, rx))
    }

    fn get(&self, key: &str) -> Result<Option<SettingValue>, SettingsError> {
        let inner = self.lock();
        inner.check(key)?;
        Ok(inner.entries.get(key).and_then(|tx| tx.borrow().clone()))
    }

    fn set(&self, key: &str, value: SettingValue) -> Result<(), SettingsError> {
        let mut inner = self.lock();
        inner.check(key)?;
        tracing::debug!(key, %value, "setting changed");
        inner.entry(key).send_replace(Some(value));
        Ok(())
    }
}
