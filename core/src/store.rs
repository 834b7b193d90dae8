//! Storage contracts the engine depends on.
//!
//! # Design
//!
//! Every write that can race is a single conditional primitive on the store:
//!
//! - [`PoolStore::claim_slot`] picks, marks and issues in one atomic unit
//! - [`ParticipantStore::insert_participant`] relies on unique indexes and
//!   reports violations as [`StoreError::UniqueViolation`]
//! - [`ResultViewStore::record_view`] is an increment-or-create that returns
//!   the count it produced
//!
//! The engine never reads and then writes to decide one of these outcomes, and
//! it keeps no slot state between calls.
//!
//! # Implementations
//!
//! - `PostgresLottoStore` (in `lotto-postgres`): production implementation
//! - `InMemoryLottoStore` (in `lotto-testing`): fast, deterministic testing

use crate::eligibility::EligibleTiers;
use crate::error::StoreError;
use crate::types::{
    Event, EventId, Fingerprint, GeneratedSlot, NewParticipant, Participant, ParticipantId,
    ResultView, Ticket, TierSummary,
};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of [`PoolStore::install_pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolInstall {
    /// The slots were written.
    Installed {
        /// Rows inserted
        inserted: u64,
    },
    /// The event already had slots; nothing was written.
    AlreadyPresent {
        /// Rows that were already there
        existing: u64,
    },
}

/// Event lookups and the one lifecycle transition the engine performs.
pub trait EventRepository: Send + Sync {
    /// Store a new event (setup seam for admin tools and tests).
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails or the id is taken.
    fn insert_event(&self, event: &Event) -> impl Future<Output = StoreResult<()>> + Send;

    /// Load an event.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_event(&self, event_id: EventId)
    -> impl Future<Output = StoreResult<Option<Event>>> + Send;

    /// Move an event from READY to ACTIVE.
    ///
    /// Returns `true` if this call made the transition, `false` if the event
    /// was not READY.
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails.
    fn activate_event(&self, event_id: EventId) -> impl Future<Output = StoreResult<bool>> + Send;
}

/// The outcome slot inventory.
pub trait PoolStore: Send + Sync {
    /// Number of slots stored for an event.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn count_slots(&self, event_id: EventId) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Write a whole pool, all or nothing.
    ///
    /// Inserts in batches of `batch_size`. If the event already has slots
    /// (including slots written concurrently by another caller) nothing is
    /// written and [`PoolInstall::AlreadyPresent`] is returned.
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails; no slots remain in that case.
    fn install_pool(
        &self,
        event_id: EventId,
        slots: &[GeneratedSlot],
        batch_size: usize,
    ) -> impl Future<Output = StoreResult<PoolInstall>> + Send;

    /// Atomically claim one unused slot and issue the participant's ticket.
    ///
    /// The slot is chosen uniformly at random among every unused slot of the
    /// event whose tier is in `tiers`. Marking it used, binding it to
    /// `participant_id`, and writing the ticket happen as one unit: two callers
    /// can never receive the same slot.
    ///
    /// Returns `None` when no eligible slot is left.
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails, or
    /// [`StoreError::UniqueViolation`] if the participant already holds a ticket.
    fn claim_slot(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        tiers: &EligibleTiers,
        issued_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<Ticket>>> + Send;

    /// Per-tier total and used counts for an event.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn tier_summary(&self, event_id: EventId)
    -> impl Future<Output = StoreResult<TierSummary>> + Send;
}

/// Registered participants.
pub trait ParticipantStore: Send + Sync {
    /// Load a participant by id.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_participant(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = StoreResult<Option<Participant>>> + Send;

    /// Load the registration for an identity in an event.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_by_fingerprint(
        &self,
        event_id: EventId,
        fingerprint: &Fingerprint,
    ) -> impl Future<Output = StoreResult<Option<Participant>>> + Send;

    /// Next ticket sequence number for an event (highest so far plus one).
    ///
    /// Not reserved: a concurrent caller may read the same value, in which
    /// case one of the two inserts fails on the sequence constraint.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn next_ticket_seq(&self, event_id: EventId) -> impl Future<Output = StoreResult<u32>> + Send;

    /// Insert a participant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] with
    /// [`Constraint::ParticipantIdentity`](crate::error::Constraint::ParticipantIdentity)
    /// or [`Constraint::TicketSequence`](crate::error::Constraint::TicketSequence)
    /// when a unique index rejects the row, or a database error.
    fn insert_participant(
        &self,
        participant: &NewParticipant,
    ) -> impl Future<Output = StoreResult<Participant>> + Send;
}

/// Issued tickets. Tickets are written by [`PoolStore::claim_slot`].
pub trait TicketStore: Send + Sync {
    /// Load a participant's ticket.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_ticket(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = StoreResult<Option<Ticket>>> + Send;
}

/// Result view counters.
pub trait ResultViewStore: Send + Sync {
    /// Atomically create the view record with count 1, or increment it.
    ///
    /// Returns the record as it is right after this call, so exactly one
    /// caller per participant ever sees `view_count == 1`.
    ///
    /// # Errors
    ///
    /// Returns error if the database write fails.
    fn record_view(
        &self,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<ResultView>> + Send;

    /// Load the view record without touching it.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    fn find_view(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = StoreResult<Option<ResultView>>> + Send;
}

/// Everything the engine needs from storage.
pub trait LottoStore:
    EventRepository + PoolStore + ParticipantStore + TicketStore + ResultViewStore
{
}

impl<T> LottoStore for T where
    T: EventRepository + PoolStore + ParticipantStore + TicketStore + ResultViewStore
{
}
