//! Outcome slot inventory: bulk install, atomic claim, per-tier counts.

use crate::rows::{TicketRow, TierCountRow, count, parse_tier};
use crate::{PostgresLottoStore, store_error};
use chrono::{DateTime, Utc};
use lotto_core::eligibility::EligibleTiers;
use lotto_core::error::StoreError;
use lotto_core::store::{PoolInstall, PoolStore, StoreResult};
use lotto_core::types::{
    EventId, GeneratedSlot, ParticipantId, Ticket, Tier, TierCount, TierSummary,
};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// Pick, mark and issue in one statement.
///
/// `SKIP LOCKED` lets concurrent claimers draw from the rows nobody else is
/// holding instead of queueing on the same one. The `is_used = FALSE` guard
/// on the update keeps the claim conditional, and a participant who already
/// holds a ticket fails on `pk_lotto_tickets`, which rolls the whole
/// statement back.
const CLAIM_SLOT: &str = r"
WITH picked AS (
    SELECT id
    FROM lotto_slots
    WHERE event_id = $1
      AND is_used = FALSE
      AND tier = ANY($2)
    ORDER BY random()
    LIMIT 1
    FOR UPDATE SKIP LOCKED
), claimed AS (
    UPDATE lotto_slots s
    SET is_used = TRUE,
        used_participant_id = $3
    FROM picked
    WHERE s.id = picked.id
      AND s.is_used = FALSE
    RETURNING s.id, s.n1, s.n2, s.n3, s.n4, s.n5, s.n6, s.tier
)
INSERT INTO lotto_tickets (participant_id, slot_id, n1, n2, n3, n4, n5, n6, tier, issued_at)
SELECT $3, id, n1, n2, n3, n4, n5, n6, tier, $4
FROM claimed
RETURNING participant_id, slot_id, n1, n2, n3, n4, n5, n6, tier, issued_at
";

impl PoolStore for PostgresLottoStore {
    async fn count_slots(&self, event_id: EventId) -> StoreResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lotto_slots WHERE event_id = $1")
            .bind(event_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(store_error("Failed to count slots"))?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn install_pool(
        &self,
        event_id: EventId,
        slots: &[GeneratedSlot],
        batch_size: usize,
    ) -> StoreResult<PoolInstall> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("Failed to begin transaction"))?;

        // Serialises installs for one event
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM lotto_events WHERE id = $1 FOR UPDATE")
                .bind(event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(store_error("Failed to lock event"))?;
        if locked.is_none() {
            return Err(StoreError::NotFound);
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lotto_slots WHERE event_id = $1")
            .bind(event_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error("Failed to count slots"))?;
        if existing > 0 {
            return Ok(PoolInstall::AlreadyPresent {
                existing: u64::try_from(existing).unwrap_or(0),
            });
        }

        let mut inserted = 0u64;
        for batch in slots.chunks(batch_size.max(1)) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO lotto_slots (id, event_id, n1, n2, n3, n4, n5, n6, tier) ",
            );
            builder.push_values(batch, |mut row, slot| {
                let [n1, n2, n3, n4, n5, n6] = slot.numbers.to_columns();
                row.push_bind(Uuid::new_v4())
                    .push_bind(*event_id.as_uuid())
                    .push_bind(n1)
                    .push_bind(n2)
                    .push_bind(n3)
                    .push_bind(n4)
                    .push_bind(n5)
                    .push_bind(n6)
                    .push_bind(slot.tier.as_str());
            });

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(store_error("Failed to insert slots"))?;
            inserted += result.rows_affected();
            tracing::debug!(event_id = %event_id, inserted, "Slot batch written");
        }

        tx.commit()
            .await
            .map_err(store_error("Failed to commit transaction"))?;

        Ok(PoolInstall::Installed { inserted })
    }

    async fn claim_slot(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        tiers: &EligibleTiers,
        issued_at: DateTime<Utc>,
    ) -> StoreResult<Option<Ticket>> {
        let names: Vec<String> = tiers.names().into_iter().map(str::to_string).collect();

        let row: Option<TicketRow> = sqlx::query_as(CLAIM_SLOT)
            .bind(event_id.as_uuid())
            .bind(names)
            .bind(participant_id.as_uuid())
            .bind(issued_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error("Failed to claim slot"))?;

        row.map(Ticket::try_from).transpose()
    }

    async fn tier_summary(&self, event_id: EventId) -> StoreResult<TierSummary> {
        let rows: Vec<TierCountRow> = sqlx::query_as(
            r"
            SELECT tier,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_used) AS used
            FROM lotto_slots
            WHERE event_id = $1
            GROUP BY tier
            ",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Failed to summarise slots"))?;

        let mut tiers = Vec::with_capacity(rows.len());
        for row in rows {
            let tier = parse_tier(&row.tier)?;
            let counts = TierCount {
                total: count(row.total)?,
                used: count(row.used)?,
            };
            tiers.push((tier, counts));
        }
        tiers.sort_by_key(|(tier, _): &(Tier, TierCount)| *tier);

        Ok(TierSummary { tiers })
    }
}
