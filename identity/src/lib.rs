//! # Lotto Identity
//!
//! Protection of participant phone numbers.
//!
//! A phone number is stored in three forms and never in the clear:
//!
//! - a **fingerprint**: peppered SHA-256, hex encoded, used for duplicate
//!   checks and to recognise the designated winner
//! - a **sealed** form: AES-256-GCM with a fresh nonce per call, stored as
//!   `base64(nonce || ciphertext)` for audit and support lookups
//! - the **last four digits**, for display
//!
//! ## Example
//!
//! ```
//! use lotto_identity::PhoneIdentityProtector;
//! use lotto_core::environment::IdentityProtector;
//!
//! let protector = PhoneIdentityProtector::new("pepper", "encryption-key").unwrap();
//!
//! // Formatting does not change the fingerprint
//! assert_eq!(
//!     protector.fingerprint("010-1234-5678"),
//!     protector.fingerprint("+82 10 1234 5678"),
//! );
//!
//! let identity = protector.protect("010-1234-5678").unwrap();
//! assert_eq!(identity.last4, "5678");
//! assert_eq!(protector.unseal(&identity.sealed).unwrap(), "01012345678");
//! ```

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lotto_core::environment::IdentityProtector;
use lotto_core::error::LottoError;
use lotto_core::types::{Fingerprint, ProtectedIdentity};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

/// Fixed salt mixed into every fingerprint.
pub const PHONE_SALT: &str = "lotto-event-phone-salt-2026";

/// AES-GCM nonce length in bytes (96 bits).
const NONCE_LEN: usize = 12;

/// Errors from sealing and unsealing phone numbers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The cipher could not be initialised.
    #[error("Invalid encryption key")]
    InvalidKey,

    /// Encryption failed.
    #[error("Encryption failed")]
    Encryption,

    /// Sealed value is not valid base64 or is too short.
    #[error("Malformed sealed value")]
    Malformed,

    /// Authentication tag did not verify (wrong key or tampered data).
    #[error("Decryption failed")]
    Decryption,
}

impl From<IdentityError> for LottoError {
    fn from(err: IdentityError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Normalise a phone number for hashing and storage.
///
/// Keeps ASCII digits only; a leading `82` country code becomes `0`.
///
/// # Examples
///
/// ```
/// use lotto_identity::normalize_phone;
///
/// assert_eq!(normalize_phone("010-1234-5678"), "01012345678");
/// assert_eq!(normalize_phone("+82 10-1234-5678"), "01012345678");
/// ```
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix("82") {
        Some(rest) => format!("0{rest}"),
        None => digits,
    }
}

/// Last four digits of a normalised phone (the whole string if shorter).
#[must_use]
pub fn last4(normalized: &str) -> String {
    let start = normalized.len().saturating_sub(4);
    normalized[start..].to_string()
}

/// Production [`IdentityProtector`]: peppered SHA-256 plus AES-256-GCM.
///
/// The AES key is derived as SHA-256 of the configured key string, so any
/// secret string can be configured.
#[derive(Clone)]
pub struct PhoneIdentityProtector {
    pepper: String,
    /// Wrapped in Arc so clones share one cipher; every seal draws a fresh nonce.
    cipher: Arc<Aes256Gcm>,
}

impl PhoneIdentityProtector {
    /// Create a protector.
    ///
    /// # Arguments
    ///
    /// * `pepper` - Secret mixed into fingerprints (from a secret store, never committed)
    /// * `encryption_key` - Secret the AES-256 key is derived from
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidKey`] if the cipher cannot be initialised.
    pub fn new(pepper: impl Into<String>, encryption_key: &str) -> Result<Self, IdentityError> {
        let key = Sha256::digest(encryption_key.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| IdentityError::InvalidKey)?;
        Ok(Self {
            pepper: pepper.into(),
            cipher: Arc::new(cipher),
        })
    }

    /// Encrypt a phone number. Output differs on every call.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Encryption`] if the cipher fails.
    pub fn seal(&self, phone: &str) -> Result<String, IdentityError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, phone.as_bytes())
            .map_err(|_| IdentityError::Encryption)?;

        // Format: [nonce (12 bytes)][ciphertext + tag]
        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    /// Decrypt a value produced by [`PhoneIdentityProtector::seal`].
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Malformed`] for bad input and
    /// [`IdentityError::Decryption`] if authentication fails.
    pub fn unseal(&self, sealed: &str) -> Result<String, IdentityError> {
        let combined = STANDARD
            .decode(sealed)
            .map_err(|_| IdentityError::Malformed)?;
        if combined.len() <= NONCE_LEN {
            return Err(IdentityError::Malformed);
        }
        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| IdentityError::Decryption)?;
        String::from_utf8(plaintext).map_err(|_| IdentityError::Malformed)
    }
}

impl std::fmt::Debug for PhoneIdentityProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneIdentityProtector")
            .field("pepper", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl IdentityProtector for PhoneIdentityProtector {
    fn fingerprint(&self, raw: &str) -> Fingerprint {
        let normalized = normalize_phone(raw);
        let mut hasher = Sha256::new();
        hasher.update(PHONE_SALT.as_bytes());
        hasher.update(normalized.as_bytes());
        hasher.update(self.pepper.as_bytes());
        Fingerprint::new(format!("{:x}", hasher.finalize()))
    }

    fn protect(&self, raw: &str) -> Result<ProtectedIdentity, LottoError> {
        let normalized = normalize_phone(raw);
        Ok(ProtectedIdentity {
            fingerprint: self.fingerprint(&normalized),
            sealed: self.seal(&normalized)?,
            last4: last4(&normalized),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protector() -> PhoneIdentityProtector {
        PhoneIdentityProtector::new("test-pepper", "test-key").unwrap()
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_phone("010 1234 5678"), "01012345678");
        assert_eq!(normalize_phone("821012345678"), "01012345678");
        assert_eq!(normalize_phone("(02) 555-0100"), "025550100");
        assert_eq!(normalize_phone("abc"), "");
    }

    #[test]
    fn last_four() {
        assert_eq!(last4("01012345678"), "5678");
        assert_eq!(last4("123"), "123");
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let p = protector();
        let a = p.fingerprint("010-1234-5678");
        assert_eq!(a, p.fingerprint("01012345678"));
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, p.fingerprint("010-1234-5679"));
    }

    #[test]
    fn pepper_changes_fingerprint() {
        let other = PhoneIdentityProtector::new("other-pepper", "test-key").unwrap();
        assert_ne!(
            protector().fingerprint("01012345678"),
            other.fingerprint("01012345678")
        );
    }

    #[test]
    fn seal_uses_fresh_nonce() {
        let p = protector();
        let a = p.seal("01012345678").unwrap();
        let b = p.seal("01012345678").unwrap();
        assert_ne!(a, b);
        assert_eq!(p.unseal(&a).unwrap(), "01012345678");
        assert_eq!(p.unseal(&b).unwrap(), "01012345678");
    }

    #[test]
    fn unseal_rejects_wrong_key_and_garbage() {
        let sealed = protector().seal("01012345678").unwrap();
        let other = PhoneIdentityProtector::new("test-pepper", "another-key").unwrap();
        assert_eq!(other.unseal(&sealed), Err(IdentityError::Decryption));
        assert_eq!(protector().unseal("not base64!"), Err(IdentityError::Malformed));
        assert_eq!(protector().unseal("AAAA"), Err(IdentityError::Malformed));
    }

    #[test]
    fn protect_produces_all_forms() {
        let p = protector();
        let identity = p.protect("+82-10-9876-5432").unwrap();
        assert_eq!(identity.fingerprint, p.fingerprint("01098765432"));
        assert_eq!(identity.last4, "5432");
        assert_eq!(p.unseal(&identity.sealed).unwrap(), "01098765432");
    }

    #[test]
    fn debug_hides_pepper() {
        assert!(!format!("{:?}", protector()).contains("test-pepper"));
    }
}
