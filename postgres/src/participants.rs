//! Participants, tickets and result views.

use crate::rows::{ParticipantRow, TicketRow, ViewRow};
use crate::{PostgresLottoStore, store_error};
use chrono::{DateTime, Utc};
use lotto_core::error::StoreError;
use lotto_core::store::{ParticipantStore, ResultViewStore, StoreResult, TicketStore};
use lotto_core::types::{
    EventId, Fingerprint, NewParticipant, Participant, ParticipantId, ResultView, Ticket,
};

const PARTICIPANT_COLUMNS: &str =
    "id, event_id, phone_fingerprint, phone_sealed, phone_last4, ticket_seq, created_at";

impl ParticipantStore for PostgresLottoStore {
    async fn find_participant(
        &self,
        participant_id: ParticipantId,
    ) -> StoreResult<Option<Participant>> {
        let sql = format!("SELECT {PARTICIPANT_COLUMNS} FROM lotto_participants WHERE id = $1");
        let row: Option<ParticipantRow> = sqlx::query_as(&sql)
            .bind(participant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error("Failed to load participant"))?;

        row.map(Participant::try_from).transpose()
    }

    async fn find_by_fingerprint(
        &self,
        event_id: EventId,
        fingerprint: &Fingerprint,
    ) -> StoreResult<Option<Participant>> {
        let sql = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM lotto_participants \
             WHERE event_id = $1 AND phone_fingerprint = $2"
        );
        let row: Option<ParticipantRow> = sqlx::query_as(&sql)
            .bind(event_id.as_uuid())
            .bind(fingerprint.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error("Failed to load participant"))?;

        row.map(Participant::try_from).transpose()
    }

    async fn next_ticket_seq(&self, event_id: EventId) -> StoreResult<u32> {
        let next: i32 = sqlx::query_scalar(
            "SELECT (COALESCE(MAX(ticket_seq), 0) + 1)::INTEGER FROM lotto_participants WHERE event_id = $1",
        )
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Failed to read ticket sequence"))?;

        u32::try_from(next)
            .map_err(|e| StoreError::Database(format!("Invalid ticket sequence {next}: {e}")))
    }

    async fn insert_participant(&self, participant: &NewParticipant) -> StoreResult<Participant> {
        let ticket_seq = i32::try_from(participant.ticket_seq).map_err(|e| {
            StoreError::Database(format!(
                "Ticket sequence {} out of range: {e}",
                participant.ticket_seq
            ))
        })?;

        let sql = format!(
            "INSERT INTO lotto_participants ({PARTICIPANT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PARTICIPANT_COLUMNS}"
        );
        let row: ParticipantRow = sqlx::query_as(&sql)
            .bind(participant.id.as_uuid())
            .bind(participant.event_id.as_uuid())
            .bind(participant.identity.fingerprint.as_str())
            .bind(&participant.identity.sealed)
            .bind(&participant.identity.last4)
            .bind(ticket_seq)
            .bind(participant.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("Failed to insert participant"))?;

        tracing::debug!(
            participant_id = %participant.id,
            ticket_seq = participant.ticket_seq,
            "Participant stored"
        );

        Participant::try_from(row)
    }
}

impl TicketStore for PostgresLottoStore {
    async fn find_ticket(&self, participant_id: ParticipantId) -> StoreResult<Option<Ticket>> {
        let row: Option<TicketRow> = sqlx::query_as(
            r"
            SELECT participant_id, slot_id, n1, n2, n3, n4, n5, n6, tier, issued_at
            FROM lotto_tickets
            WHERE participant_id = $1
            ",
        )
        .bind(participant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to load ticket"))?;

        row.map(Ticket::try_from).transpose()
    }
}

impl ResultViewStore for PostgresLottoStore {
    async fn record_view(
        &self,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> StoreResult<ResultView> {
        let row: ViewRow = sqlx::query_as(
            r"
            INSERT INTO lotto_result_views (participant_id, view_count, first_view_at, last_view_at)
            VALUES ($1, 1, $2, $2)
            ON CONFLICT (participant_id) DO UPDATE
            SET view_count = lotto_result_views.view_count + 1,
                last_view_at = EXCLUDED.last_view_at
            RETURNING participant_id, view_count, first_view_at, last_view_at
            ",
        )
        .bind(participant_id.as_uuid())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Failed to record result view"))?;

        ResultView::try_from(row)
    }

    async fn find_view(&self, participant_id: ParticipantId) -> StoreResult<Option<ResultView>> {
        let row: Option<ViewRow> = sqlx::query_as(
            r"
            SELECT participant_id, view_count, first_view_at, last_view_at
            FROM lotto_result_views
            WHERE participant_id = $1
            ",
        )
        .bind(participant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to load result view"))?;

        row.map(ResultView::try_from).transpose()
    }
}
