//! # Lotto Testing
//!
//! Testing utilities for the lotto engine.
//!
//! This crate provides:
//! - [`InMemoryLottoStore`]: every store trait behind one mutex, with fault injection
//! - Mock implementations of the environment traits (clocks, identity)
//! - Event fixtures and seeded random sources
//!
//! ## Example
//!
//! ```
//! use lotto_testing::{InMemoryLottoStore, fixtures};
//! use lotto_core::store::EventRepository;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryLottoStore::new();
//! let event = fixtures::event("W");
//! store.insert_event(&event).await.unwrap();
//! assert!(store.find_event(event.id).await.unwrap().is_some());
//! # });
//! ```

mod memory_store;

pub use memory_store::InMemoryLottoStore;

use chrono::{DateTime, Utc};
use lotto_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use lotto_core::environment::IdentityProtector;
    use lotto_core::error::LottoError;
    use lotto_core::types::{Fingerprint, ProtectedIdentity};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use lotto_testing::mocks::FixedClock;
    /// use lotto_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test moves it.
    ///
    /// Clones share the same time, so a test can keep one handle and pass
    /// another into the service under test.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Start the clock at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Jump to `time`.
        #[allow(clippy::unwrap_used)] // Test mock: lock poisoning is a test failure
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap() = time;
        }

        /// Move forward by `delta`.
        #[allow(clippy::unwrap_used)] // Test mock: lock poisoning is a test failure
        pub fn advance(&self, delta: chrono::Duration) {
            let mut time = self.time.write().unwrap();
            *time += delta;
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)] // Test mock: lock poisoning is a test failure
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }

    /// Identity protector that keeps the raw value.
    ///
    /// The fingerprint *is* the input, so a test can name the designated
    /// winner `"W"` and register as `"W"`.
    ///
    /// **WARNING**: Do NOT use in production. Nothing is hashed or encrypted.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PlainIdentity;

    impl IdentityProtector for PlainIdentity {
        fn fingerprint(&self, raw: &str) -> Fingerprint {
            Fingerprint::new(raw)
        }

        fn protect(&self, raw: &str) -> Result<ProtectedIdentity, LottoError> {
            let start = raw.len().saturating_sub(4);
            Ok(ProtectedIdentity {
                fingerprint: self.fingerprint(raw),
                sealed: raw.to_string(),
                last4: raw.get(start..).unwrap_or(raw).to_string(),
            })
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(crate::fixtures::test_time())
    }
}

/// Event fixtures and deterministic randomness.
///
/// Fixture events use the same layout as `lotto-admin create-event`,
/// relative to [`test_time`](fixtures::test_time):
///
/// | Window        | From    | To       |
/// |---------------|---------|----------|
/// | participation | `T`     | `T + 7d` |
/// | announcement  | `T + 8d`| `T + 15d`|
pub mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use lotto_core::types::{Event, EventId, EventStatus, Fingerprint};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Reference time for fixtures: 2025-01-01 00:00:00 UTC.
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// A READY event whose designated winner fingerprint is `winner`.
    #[must_use]
    pub fn event(winner: &str) -> Event {
        let t = test_time();
        Event {
            id: EventId::new(),
            name: "fixture event".to_string(),
            start_at: t,
            end_at: t + Duration::days(7),
            announce_start_at: t + Duration::days(8),
            announce_end_at: t + Duration::days(15),
            status: EventStatus::Ready,
            winner_fingerprint: Fingerprint::new(winner),
        }
    }

    /// Same as [`event`] with a different status.
    #[must_use]
    pub fn event_with_status(winner: &str, status: EventStatus) -> Event {
        Event {
            status,
            ..event(winner)
        }
    }

    /// A moment inside the fixture participation window.
    #[must_use]
    pub fn during_participation() -> DateTime<Utc> {
        test_time() + Duration::days(1)
    }

    /// A moment inside the fixture announcement window.
    #[must_use]
    pub fn during_announcement() -> DateTime<Utc> {
        test_time() + Duration::days(9)
    }

    /// Reproducible random source.
    #[must_use]
    pub fn seeded_rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, PlainIdentity, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use lotto_core::environment::IdentityProtector;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), fixtures::test_time());
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(fixtures::test_time());
        let handle = clock.clone();
        handle.advance(chrono::Duration::days(9));
        assert_eq!(clock.now(), fixtures::during_announcement());
        handle.set(fixtures::test_time());
        assert_eq!(clock.now(), fixtures::test_time());
    }

    #[test]
    fn fixture_windows_line_up() {
        let event = fixtures::event("W");
        assert!(!event.is_open_for_participation(fixtures::during_participation()));
        let active = fixtures::event_with_status("W", lotto_core::types::EventStatus::Active);
        assert!(active.is_open_for_participation(fixtures::during_participation()));
        assert!(active.is_announcing(fixtures::during_announcement()));
        assert!(!active.is_announcing(fixtures::during_participation()));
    }

    #[test]
    fn plain_identity_keeps_raw_value() {
        let identity = PlainIdentity.protect("01012345678").unwrap();
        assert_eq!(identity.fingerprint.as_str(), "01012345678");
        assert_eq!(identity.last4, "5678");
        assert_eq!(PlainIdentity.protect("W").unwrap().last4, "W");
    }
}
