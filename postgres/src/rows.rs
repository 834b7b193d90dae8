//! Row types and their conversion into domain records.

use chrono::{DateTime, Utc};
use lotto_core::error::StoreError;
use lotto_core::types::{
    Event, EventId, Fingerprint, LottoNumbers, Participant, ParticipantId, ResultView, SlotId,
    Ticket, Tier,
};
use uuid::Uuid;

fn corrupt(what: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Database(format!("Corrupt {what} row: {err}"))
}

#[derive(sqlx::FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    name: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    announce_start_at: DateTime<Utc>,
    announce_end_at: DateTime<Utc>,
    status: String,
    winner_fingerprint: String,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::from_uuid(row.id),
            name: row.name,
            start_at: row.start_at,
            end_at: row.end_at,
            announce_start_at: row.announce_start_at,
            announce_end_at: row.announce_end_at,
            status: row.status.parse().map_err(|e| corrupt("event", e))?,
            winner_fingerprint: Fingerprint::new(row.winner_fingerprint),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ParticipantRow {
    id: Uuid,
    event_id: Uuid,
    phone_fingerprint: String,
    phone_sealed: String,
    phone_last4: String,
    ticket_seq: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = StoreError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ParticipantId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            fingerprint: Fingerprint::new(row.phone_fingerprint),
            phone_sealed: row.phone_sealed,
            phone_last4: row.phone_last4,
            ticket_seq: u32::try_from(row.ticket_seq).map_err(|e| corrupt("participant", e))?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct TicketRow {
    participant_id: Uuid,
    slot_id: Uuid,
    n1: i16,
    n2: i16,
    n3: i16,
    n4: i16,
    n5: i16,
    n6: i16,
    tier: String,
    issued_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let numbers = LottoNumbers::from_columns(&[row.n1, row.n2, row.n3, row.n4, row.n5, row.n6])
            .map_err(|e| corrupt("ticket", e))?;
        Ok(Self {
            participant_id: ParticipantId::from_uuid(row.participant_id),
            slot_id: SlotId::from_uuid(row.slot_id),
            numbers,
            tier: row.tier.parse::<Tier>().map_err(|e| corrupt("ticket", e))?,
            issued_at: row.issued_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ViewRow {
    participant_id: Uuid,
    view_count: i32,
    first_view_at: DateTime<Utc>,
    last_view_at: DateTime<Utc>,
}

impl TryFrom<ViewRow> for ResultView {
    type Error = StoreError;

    fn try_from(row: ViewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            participant_id: ParticipantId::from_uuid(row.participant_id),
            view_count: u32::try_from(row.view_count).map_err(|e| corrupt("result view", e))?,
            first_view_at: row.first_view_at,
            last_view_at: row.last_view_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct TierCountRow {
    pub(crate) tier: String,
    pub(crate) total: i64,
    pub(crate) used: i64,
}

pub(crate) fn parse_tier(tier: &str) -> Result<Tier, StoreError> {
    tier.parse().map_err(|e| corrupt("slot", e))
}

pub(crate) fn count(value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|e| corrupt("count", e))
}
