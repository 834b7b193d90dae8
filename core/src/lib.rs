//! # Lotto Core
//!
//! Domain types, storage contracts and the pure parts of the lotto engine.
//!
//! A lotto event pre-generates a fixed inventory of outcome slots. Each
//! phone-verified participant is registered once, resolved to a set of
//! eligible prize tiers, and matched to exactly one unused slot.
//!
//! ## Modules
//!
//! - [`types`]: identifiers, tiers, six-number combinations and records
//! - [`pool`]: outcome pool generation
//! - [`eligibility`]: which tiers a participant may receive
//! - [`store`]: the storage contracts, with their atomic primitives
//! - [`config`]: pool shape
//! - [`error`]: storage and engine error taxonomy
//! - [`environment`]: injected clock and identity protection
//!
//! ## Example
//!
//! ```
//! use lotto_core::eligibility::EligibilityPolicy;
//! use lotto_core::types::{Fingerprint, Tier};
//!
//! let tiers = EligibilityPolicy::default().resolve(
//!     &Fingerprint::new("W"),
//!     &Fingerprint::new("W"),
//!     3000,
//! );
//! assert_eq!(tiers.as_slice()[0], Tier::First);
//! ```

pub mod config;
pub mod eligibility;
pub mod error;
pub mod pool;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{LottoError, Result, StoreError};

/// Environment module - Injected dependencies
///
/// Dependencies are injected as traits so tests can pin time and replace the
/// phone hashing and encryption with deterministic stand-ins.
pub mod environment {
    use crate::error::LottoError;
    use crate::types::{Fingerprint, ProtectedIdentity};
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use lotto_core::environment::{Clock, SystemClock};
    ///
    /// let now = SystemClock.now();
    /// assert!(now.timestamp() > 0);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Turns a raw phone number into the forms the engine may store.
    ///
    /// The fingerprint must be deterministic: the same phone always yields
    /// the same fingerprint, whatever formatting it arrived in.
    pub trait IdentityProtector: Send + Sync {
        /// One-way fingerprint used for duplicate checks and winner matching.
        fn fingerprint(&self, raw: &str) -> Fingerprint;

        /// Fingerprint, encrypted form and display-safe last four digits.
        ///
        /// # Errors
        ///
        /// Returns [`LottoError::Internal`] if encryption fails.
        fn protect(&self, raw: &str) -> Result<ProtectedIdentity, LottoError>;
    }
}
