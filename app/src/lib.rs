//! Application layer for the lotto engine.
//!
//! Reads configuration from the environment, connects the `PostgreSQL` store,
//! builds the identity protector and metrics exporter, and wires them into a
//! [`LottoService`](lotto_runtime::LottoService). The `lotto-admin` binary
//! drives it from the command line.

pub mod bootstrap;
pub mod cli;
pub mod config;

pub use bootstrap::{BootstrapError, ProductionService};
pub use cli::{Command, USAGE, UsageError};
pub use config::{Config, ConfigError};

use chrono::{DateTime, Duration, Utc};
use lotto_core::types::{Event, EventId, EventStatus, Fingerprint};

/// A READY event with the standard layout: participation for seven days
/// from `now`, results announced from day eight to day fifteen.
#[must_use]
pub fn standard_event(name: impl Into<String>, winner: Fingerprint, now: DateTime<Utc>) -> Event {
    Event {
        id: EventId::new(),
        name: name.into(),
        start_at: now,
        end_at: now + Duration::days(7),
        announce_start_at: now + Duration::days(8),
        announce_end_at: now + Duration::days(15),
        status: EventStatus::Ready,
        winner_fingerprint: winner,
    }
}
