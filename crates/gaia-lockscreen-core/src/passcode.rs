//! Passcode validation.
//!
//! The LockScreen never compares passcodes itself. It emits a
//! [`PasscodeValidationRequest`] and the [`PasscodeValidator`] answers through
//! exactly one of the two callbacks. A mismatch is the normal "invalid
//! attempt" signal and never an error value.
//!
//! # Security
//!
//! - Entered digits live in [`Passcode`], which zeroizes on drop and redacts
//!   itself from `Debug` output.
//! - Digest secrets are compared with HMAC verification (constant time).

use std::fmt;

use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::Sha256;
use tokio::sync::{mpsc, oneshot};
use zeroize::Zeroizing;

use crate::{
    error::SettingsError,
    settings::{PASSCODE_CODE, PASSCODE_DIGEST_SALT, PASSCODE_DIGEST_VALUE, SettingsStore},
};

type HmacSha256 = Hmac<Sha256>;

/// Passcode used when the settings store holds none.
pub const DEFAULT_PASSCODE: &str = "0000";

/// Entered passcode digits.
#[derive(Clone)]
pub struct Passcode(Zeroizing<String>);

impl Passcode {
    /// Create a passcode from digits.
    pub fn new(digits: impl Into<String>) -> Self {
        Self(Zeroizing::new(digits.into()))
    }

    /// Borrow the digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of entered digits.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Returns true if nothing was entered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append one digit.
    pub fn push(&mut self, digit: char) {
        self.0.push(digit);
    }

    /// Remove the last digit, if any.
    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// Forget every digit. The old buffer is zeroized.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Default for Passcode {
    fn default() -> Self {
        Self(Zeroizing::new(String::new()))
    }
}

impl PartialEq for Passcode {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Passcode {}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passcode(<{} digits>)", self.len())
    }
}

/// Stored secret the validator compares against.
#[derive(Clone)]
pub enum PasscodeSecret {
    /// Legacy plain code.
    Plain(Passcode),
    /// Salted HMAC-SHA-256 of the code.
    Digest {
        /// HMAC key
        salt: Zeroizing<Vec<u8>>,
        /// Expected MAC
        value: Zeroizing<Vec<u8>>,
    },
}

impl PasscodeSecret {
    /// Digest `passcode` under `salt`.
    pub fn digest(salt: &[u8], passcode: &str) -> Result<Self, InvalidLength> {
        Ok(Self::Digest {
            salt: Zeroizing::new(salt.to_vec()),
            value: Zeroizing::new(mac(salt, passcode)?.finalize().into_bytes().to_vec()),
        })
    }

    /// Load the secret from settings.
    ///
    /// A digest pair wins over the plain code. Undecodable hex is treated as
    /// absent, so the validator falls back to the plain code.
    pub fn from_settings(store: &dyn SettingsStore) -> Result<Self, SettingsError> {
        let salt = store.get(PASSCODE_DIGEST_SALT)?.and_then(|v| decode_hex(&v));
        let value = store.get(PASSCODE_DIGEST_VALUE)?.and_then(|v| decode_hex(&v));
        if let (Some(salt), Some(value)) = (salt, value) {
            return Ok(Self::Digest { salt: Zeroizing::new(salt), value: Zeroizing::new(value) });
        }

        let code = match store.get(PASSCODE_CODE)? {
            Some(value) => value.as_str().map_or_else(|| value.to_string(), str::to_string),
            None => DEFAULT_PASSCODE.to_string(),
        };
        Ok(Self::Plain(Passcode::new(code)))
    }

    /// Returns true if `passcode` matches.
    pub fn matches(&self, passcode: &Passcode) -> bool {
        match self {
            Self::Plain(code) => code == passcode,
            Self::Digest { salt, value } => {
                mac(salt, passcode.as_str()).is_ok_and(|mac| mac.verify_slice(value).is_ok())
            },
        }
    }
}

impl Default for PasscodeSecret {
    fn default() -> Self {
        Self::Plain(Passcode::new(DEFAULT_PASSCODE))
    }
}

impl fmt::Debug for PasscodeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("PasscodeSecret::Plain(<redacted>)"),
            Self::Digest { .. } => f.write_str("PasscodeSecret::Digest(<redacted>)"),
        }
    }
}

fn mac(salt: &[u8], passcode: &str) -> Result<HmacSha256, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(salt)?;
    mac.update(passcode.as_bytes());
    Ok(mac)
}

fn decode_hex(value: &crate::settings::SettingValue) -> Option<Vec<u8>> {
    value.as_str().and_then(|s| hex::decode(s).ok())
}

/// One-shot validation callback.
pub type ValidationCallback = Box<dyn FnOnce() + Send>;

/// Request to validate a passcode.
///
/// Consumed exactly once: the validator moves it in and calls either
/// `on_success` or `on_error`, never both.
pub struct PasscodeValidationRequest {
    /// Submitted passcode
    pub passcode: Passcode,
    /// Called when the passcode matches
    pub on_success: ValidationCallback,
    /// Called when the passcode does not match
    pub on_error: ValidationCallback,
}

impl PasscodeValidationRequest {
    /// Create a request from two callbacks.
    pub fn new(
        passcode: Passcode,
        on_success: impl FnOnce() + Send + 'static,
        on_error: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self { passcode, on_success: Box::new(on_success), on_error: Box::new(on_error) }
    }

    /// Create a request whose outcome arrives on a oneshot channel.
    ///
    /// The receiver yields `true` on success. It yields a `RecvError` only if
    /// the request is dropped without being validated.
    pub fn with_reply(passcode: Passcode) -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        let (ok_tx, err_tx) = split_oneshot(tx);
        let request = Self::new(
            passcode,
            move || {
                if let Some(tx) = ok_tx.take() {
                    let _ = tx.send(true);
                }
            },
            move || {
                if let Some(tx) = err_tx.take() {
                    let _ = tx.send(false);
                }
            },
        );
        (request, rx)
    }
}

impl fmt::Debug for PasscodeValidationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasscodeValidationRequest").field("passcode", &self.passcode).finish_non_exhaustive()
    }
}

/// Shared slot so both callbacks can own the single oneshot sender.
#[derive(Clone)]
struct OneshotSlot(std::sync::Arc<std::sync::Mutex<Option<oneshot::Sender<bool>>>>);

impl OneshotSlot {
    fn take(&self) -> Option<oneshot::Sender<bool>> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take()
    }
}

fn split_oneshot(tx: oneshot::Sender<bool>) -> (OneshotSlot, OneshotSlot) {
    let slot = OneshotSlot(std::sync::Arc::new(std::sync::Mutex::new(Some(tx))));
    (slot.clone(), slot)
}

/// Verifies passcodes against the stored secret.
#[derive(Debug, Default, Clone)]
pub struct PasscodeValidator {
    secret: PasscodeSecret,
}

impl PasscodeValidator {
    /// Create a validator holding `secret`.
    pub fn new(secret: PasscodeSecret) -> Self {
        Self { secret }
    }

    /// Replace the secret (settings changed out-of-band).
    pub fn set_secret(&mut self, secret: PasscodeSecret) {
        self.secret = secret;
    }

    /// Returns true if `passcode` matches the secret.
    pub fn check(&self, passcode: &Passcode) -> bool {
        self.secret.matches(passcode)
    }

    /// Consume `request`, calling exactly one of its callbacks.
    pub fn validate(&self, request: PasscodeValidationRequest) {
        let PasscodeValidationRequest { passcode, on_success, on_error } = request;
        if self.check(&passcode) {
            tracing::debug!("passcode validated");
            on_success();
        } else {
            tracing::debug!("passcode rejected");
            on_error();
        }
    }

    /// Validate requests from `requests` until every sender is gone.
    pub async fn serve(self, mut requests: mpsc::Receiver<PasscodeValidationRequest>) {
        while let Some(request) = requests.recv().await {
            self.validate(request);
        }
        tracing::debug!("passcode validator stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use proptest::prelude::*;

    use super::*;
    use crate::settings::MemorySettings;

    fn counting_request(passcode: &str) -> (PasscodeValidationRequest, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let ok = Arc::new(AtomicUsize::new(0));
        let err = Arc::new(AtomicUsize::new(0));
        let (ok2, err2) = (Arc::clone(&ok), Arc::clone(&err));
        let request = PasscodeValidationRequest::new(
            Passcode::new(passcode),
            move || {
                ok2.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                err2.fetch_add(1, Ordering::SeqCst);
            },
        );
        (request, ok, err)
    }

    #[test]
    fn matching_passcode_calls_success_once() {
        let validator = PasscodeValidator::new(PasscodeSecret::Plain(Passcode::new("1234")));
        let (request, ok, err) = counting_request("1234");

        validator.validate(request);

        assert_eq!(ok.load(Ordering::SeqCst), 1);
        assert_eq!(err.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mismatching_passcode_calls_error_once() {
        let validator = PasscodeValidator::new(PasscodeSecret::Plain(Passcode::new("1234")));
        let (request, ok, err) = counting_request("4321");

        validator.validate(request);

        assert_eq!(ok.load(Ordering::SeqCst), 0);
        assert_eq!(err.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_secret_is_four_zeros() {
        let store = MemorySettings::new();
        let secret = PasscodeSecret::from_settings(&store).unwrap();
        assert!(secret.matches(&Passcode::new(DEFAULT_PASSCODE)));
    }

    #[test]
    fn digest_accepts_any_salt_length() {
        for len in [0, 1, 32, 64, 65, 200] {
            let salt = vec![3u8; len];
            let secret = PasscodeSecret::digest(&salt, "1357").unwrap();
            assert!(secret.matches(&Passcode::new("1357")), "salt of {len} bytes");
            assert!(!secret.matches(&Passcode::new("1358")), "salt of {len} bytes");
        }
    }

    #[test]
    fn digest_secret_wins_over_plain_code() {
        let salt = [7u8; 16];
        let Ok(PasscodeSecret::Digest { value, .. }) = PasscodeSecret::digest(&salt, "2468") else {
            unreachable!()
        };
        let store = MemorySettings::with_values([
            (PASSCODE_CODE, "1111".to_string()),
            (PASSCODE_DIGEST_SALT, hex::encode(salt)),
            (PASSCODE_DIGEST_VALUE, hex::encode(value.as_slice())),
        ]);

        let validator = PasscodeValidator::new(PasscodeSecret::from_settings(&store).unwrap());
        assert!(validator.check(&Passcode::new("2468")));
        assert!(!validator.check(&Passcode::new("1111")));
    }

    #[test]
    fn bad_hex_falls_back_to_plain_code() {
        let store = MemorySettings::with_values([
            (PASSCODE_CODE, "1111"),
            (PASSCODE_DIGEST_SALT, "zz"),
            (PASSCODE_DIGEST_VALUE, "zz"),
        ]);
        let secret = PasscodeSecret::from_settings(&store).unwrap();
        assert!(secret.matches(&Passcode::new("1111")));
    }

    #[test]
    fn debug_output_redacts_digits() {
        let passcode = Passcode::new("9876");
        let rendered = format!("{passcode:?}");
        assert!(!rendered.contains("9876"));
        assert_eq!(rendered, "Passcode(<4 digits>)");
    }

    #[tokio::test]
    async fn reply_channel_reports_outcome() {
        let validator = PasscodeValidator::new(PasscodeSecret::Plain(Passcode::new("0000")));

        let (request, reply) = PasscodeValidationRequest::with_reply(Passcode::new("0000"));
        validator.validate(request);
        assert!(reply.await.unwrap());

        let (request, reply) = PasscodeValidationRequest::with_reply(Passcode::new("0001"));
        validator.validate(request);
        assert!(!reply.await.unwrap());
    }

    #[tokio::test]
    async fn serve_answers_until_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let server = tokio::spawn(PasscodeValidator::default().serve(rx));

        let (request, reply) = PasscodeValidationRequest::with_reply(Passcode::new("0000"));
        tx.send(request).await.unwrap();
        assert!(reply.await.unwrap());

        drop(tx);
        server.await.unwrap();
    }

    proptest! {
        #[test]
        fn exactly_one_callback_fires(secret in "[0-9]{4}", attempt in "[0-9]{4}") {
            let validator = PasscodeValidator::new(PasscodeSecret::Plain(Passcode::new(secret.clone())));
            let (request, ok, err) = counting_request(&attempt);

            validator.validate(request);

            let (ok, err) = (ok.load(Ordering::SeqCst), err.load(Ordering::SeqCst));
            prop_assert_eq!(ok + err, 1);
            prop_assert_eq!(ok == 1, secret == attempt);
        }

        #[test]
        fn digest_agrees_with_plain(salt in proptest::collection::vec(any::<u8>(), 0..32), secret in "[0-9]{4}", attempt in "[0-9]{4}") {
            let plain = PasscodeSecret::Plain(Passcode::new(secret.clone()));
            let digest = PasscodeSecret::digest(&salt, &secret).unwrap();
            let attempt = Passcode::new(attempt);
            prop_assert_eq!(plain.matches(&attempt), digest.matches(&attempt));
        }
    }
}
