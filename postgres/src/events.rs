//! Event rows.

use crate::rows::EventRow;
use crate::{PostgresLottoStore, store_error};
use lotto_core::error::StoreError;
use lotto_core::store::{EventRepository, StoreResult};
use lotto_core::types::{Event, EventId};

impl EventRepository for PostgresLottoStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO lotto_events
                (id, name, start_at, end_at, announce_start_at, announce_end_at,
                 status, winner_fingerprint)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(event.announce_start_at)
        .bind(event.announce_end_at)
        .bind(event.status.as_str())
        .bind(event.winner_fingerprint.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_error("Failed to insert event"))?;

        Ok(())
    }

    async fn find_event(&self, event_id: EventId) -> StoreResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(
            r"
            SELECT id, name, start_at, end_at, announce_start_at, announce_end_at,
                   status, winner_fingerprint
            FROM lotto_events
            WHERE id = $1
            ",
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to load event"))?;

        row.map(Event::try_from).transpose()
    }

    async fn activate_event(&self, event_id: EventId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE lotto_events SET status = 'ACTIVE' WHERE id = $1 AND status = 'READY'",
        )
        .bind(event_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(store_error("Failed to activate event"))?;

        if result.rows_affected() == 1 {
            tracing::info!(event_id = %event_id, "Event activated");
            return Ok(true);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lotto_events WHERE id = $1)")
            .bind(event_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("Failed to load event"))?;

        if exists { Ok(false) } else { Err(StoreError::NotFound) }
    }
}
