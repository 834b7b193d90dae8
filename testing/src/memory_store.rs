//! In-memory implementation of every lotto store trait.
//!
//! All tables live behind one mutex, so each trait method is atomic the same
//! way a single SQL statement or transaction is. The two-step races the engine
//! has to survive (read the next sequence, then insert) still happen because
//! those are separate calls.

use chrono::{DateTime, Utc};
use lotto_core::eligibility::EligibleTiers;
use lotto_core::error::{Constraint, StoreError};
use lotto_core::store::{
    EventRepository, ParticipantStore, PoolInstall, PoolStore, ResultViewStore, StoreResult,
    TicketStore,
};
use lotto_core::types::{
    Event, EventId, EventStatus, Fingerprint, GeneratedSlot, NewParticipant, OutcomeSlot,
    Participant, ParticipantId, ResultView, SlotId, Ticket, Tier, TierCount, TierSummary,
};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    slots: HashMap<EventId, Vec<OutcomeSlot>>,
    participants: HashMap<ParticipantId, Participant>,
    tickets: HashMap<ParticipantId, Ticket>,
    views: HashMap<ParticipantId, ResultView>,
    /// Remaining participant inserts that fail on the sequence constraint
    sequence_collisions: u32,
}

/// In-memory lotto store.
///
/// Clones share the same tables.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Debug, Clone, Default)]
pub struct InMemoryLottoStore {
    tables: Arc<Mutex<Tables>>,
}

fn lock(tables: &Mutex<Tables>) -> StoreResult<MutexGuard<'_, Tables>> {
    tables
        .lock()
        .map_err(|_| StoreError::Database("Mutex lock failed".to_string()))
}

impl InMemoryLottoStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` participant inserts fail with a ticket-sequence
    /// violation, as if another registration had taken the sequence first.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn inject_sequence_collisions(&self, count: u32) -> StoreResult<()> {
        lock(&self.tables)?.sequence_collisions = count;
        Ok(())
    }

    /// Every slot of an event, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn slots(&self, event_id: EventId) -> StoreResult<Vec<OutcomeSlot>> {
        Ok(lock(&self.tables)?
            .slots
            .get(&event_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Number of participants registered for an event.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn participant_count(&self, event_id: EventId) -> StoreResult<usize> {
        Ok(lock(&self.tables)?
            .participants
            .values()
            .filter(|p| p.event_id == event_id)
            .count())
    }

    /// Number of tickets issued, over all events.
    ///
    /// # Errors
    ///
    /// Returns error if the internal lock is poisoned.
    pub fn ticket_count(&self) -> StoreResult<usize> {
        Ok(lock(&self.tables)?.tickets.len())
    }
}

impl EventRepository for InMemoryLottoStore {
    fn insert_event(&self, event: &Event) -> impl Future<Output = StoreResult<()>> + Send {
        let tables = Arc::clone(&self.tables);
        let event = event.clone();

        async move {
            let mut guard = lock(&tables)?;
            if guard.events.contains_key(&event.id) {
                return Err(StoreError::UniqueViolation {
                    constraint: Constraint::Other,
                });
            }
            guard.events.insert(event.id, event);
            Ok(())
        }
    }

    fn find_event(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = StoreResult<Option<Event>>> + Send {
        let tables = Arc::clone(&self.tables);

        async move { Ok(lock(&tables)?.events.get(&event_id).cloned()) }
    }

    fn activate_event(&self, event_id: EventId) -> impl Future<Output = StoreResult<bool>> + Send {
        let tables = Arc::clone(&self.tables);

        async move {
            let mut guard = lock(&tables)?;
            match guard.events.get_mut(&event_id) {
                Some(event) if event.status == EventStatus::Ready => {
                    event.status = EventStatus::Active;
                    Ok(true)
                }
                Some(_) => Ok(false),
                None => Err(StoreError::NotFound),
            }
        }
    }
}

impl PoolStore for InMemoryLottoStore {
    fn count_slots(&self, event_id: EventId) -> impl Future<Output = StoreResult<u64>> + Send {
        let tables = Arc::clone(&self.tables);

        async move {
            let guard = lock(&tables)?;
            Ok(guard.slots.get(&event_id).map_or(0, |s| s.len() as u64))
        }
    }

    fn install_pool(
        &self,
        event_id: EventId,
        slots: &[GeneratedSlot],
        _batch_size: usize,
    ) -> impl Future<Output = StoreResult<PoolInstall>> + Send {
        let tables = Arc::clone(&self.tables);
        let slots = slots.to_vec();

        async move {
            let mut guard = lock(&tables)?;
            if !guard.events.contains_key(&event_id) {
                return Err(StoreError::NotFound);
            }
            if let Some(existing) = guard.slots.get(&event_id).filter(|s| !s.is_empty()) {
                return Ok(PoolInstall::AlreadyPresent {
                    existing: existing.len() as u64,
                });
            }

            let rows: Vec<OutcomeSlot> = slots
                .into_iter()
                .map(|slot| OutcomeSlot {
                    id: SlotId::new(),
                    event_id,
                    numbers: slot.numbers,
                    tier: slot.tier,
                    used: false,
                    used_by: None,
                })
                .collect();
            let inserted = rows.len() as u64;
            guard.slots.insert(event_id, rows);
            Ok(PoolInstall::Installed { inserted })
        }
    }

    fn claim_slot(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
        tiers: &EligibleTiers,
        issued_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<Ticket>>> + Send {
        let tables = Arc::clone(&self.tables);
        let tiers = tiers.clone();

        async move {
            let mut guard = lock(&tables)?;
            let db = &mut *guard;
            if db.tickets.contains_key(&participant_id) {
                return Err(StoreError::UniqueViolation {
                    constraint: Constraint::TicketOwner,
                });
            }

            let Some(slots) = db.slots.get_mut(&event_id) else {
                return Ok(None);
            };
            let candidates: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.used && tiers.contains(s.tier))
                .map(|(i, _)| i)
                .collect();
            let Some(&index) = candidates.choose(&mut rand::thread_rng()) else {
                return Ok(None);
            };

            let slot = &mut slots[index];
            slot.used = true;
            slot.used_by = Some(participant_id);
            let ticket = Ticket {
                participant_id,
                slot_id: slot.id,
                numbers: slot.numbers,
                tier: slot.tier,
                issued_at,
            };
            db.tickets.insert(participant_id, ticket.clone());
            Ok(Some(ticket))
        }
    }

    fn tier_summary(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = StoreResult<TierSummary>> + Send {
        let tables = Arc::clone(&self.tables);

        async move {
            let guard = lock(&tables)?;
            let slots = guard.slots.get(&event_id).map_or(&[][..], Vec::as_slice);
            let tiers = Tier::ALL
                .into_iter()
                .filter_map(|tier| {
                    let mut count = TierCount::default();
                    for slot in slots.iter().filter(|s| s.tier == tier) {
                        count.total += 1;
                        count.used += u32::from(slot.used);
                    }
                    (count.total > 0).then_some((tier, count))
                })
                .collect();
            Ok(TierSummary { tiers })
        }
    }
}

impl ParticipantStore for InMemoryLottoStore {
    fn find_participant(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = StoreResult<Option<Participant>>> + Send {
        let tables = Arc::clone(&self.tables);

        async move { Ok(lock(&tables)?.participants.get(&participant_id).cloned()) }
    }

    fn find_by_fingerprint(
        &self,
        event_id: EventId,
        fingerprint: &Fingerprint,
    ) -> impl Future<Output = StoreResult<Option<Participant>>> + Send {
        let tables = Arc::clone(&self.tables);
        let fingerprint = fingerprint.clone();

        async move {
            Ok(lock(&tables)?
                .participants
                .values()
                .find(|p| p.event_id == event_id && p.fingerprint == fingerprint)
                .cloned())
        }
    }

    fn next_ticket_seq(&self, event_id: EventId) -> impl Future<Output = StoreResult<u32>> + Send {
        let tables = Arc::clone(&self.tables);

        async move {
            let guard = lock(&tables)?;
            let max = guard
                .participants
                .values()
                .filter(|p| p.event_id == event_id)
                .map(|p| p.ticket_seq)
                .max()
                .unwrap_or(0);
            Ok(max + 1)
        }
    }

    fn insert_participant(
        &self,
        participant: &NewParticipant,
    ) -> impl Future<Output = StoreResult<Participant>> + Send {
        let tables = Arc::clone(&self.tables);
        let participant = participant.clone();

        async move {
            let mut guard = lock(&tables)?;

            let clashes = |constraint| StoreError::UniqueViolation { constraint };
            for existing in guard.participants.values() {
                if existing.event_id != participant.event_id {
                    continue;
                }
                if existing.fingerprint == participant.identity.fingerprint {
                    return Err(clashes(Constraint::ParticipantIdentity));
                }
                if existing.ticket_seq == participant.ticket_seq {
                    return Err(clashes(Constraint::TicketSequence));
                }
            }
            if guard.sequence_collisions > 0 {
                guard.sequence_collisions -= 1;
                return Err(clashes(Constraint::TicketSequence));
            }

            let row = Participant::from(participant);
            guard.participants.insert(row.id, row.clone());
            Ok(row)
        }
    }
}

impl TicketStore for InMemoryLottoStore {
    fn find_ticket(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = StoreResult<Option<Ticket>>> + Send {
        let tables = Arc::clone(&self.tables);

        async move { Ok(lock(&tables)?.tickets.get(&participant_id).cloned()) }
    }
}

impl ResultViewStore for InMemoryLottoStore {
    fn record_view(
        &self,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<ResultView>> + Send {
        let tables = Arc::clone(&self.tables);

        async move {
            let mut guard = lock(&tables)?;
            let view = guard
                .views
                .entry(participant_id)
                .and_modify(|v| {
                    v.view_count += 1;
                    v.last_view_at = now;
                })
                .or_insert_with(|| ResultView {
                    participant_id,
                    view_count: 1,
                    first_view_at: now,
                    last_view_at: now,
                });
            Ok(view.clone())
        }
    }

    fn find_view(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = StoreResult<Option<ResultView>>> + Send {
        let tables = Arc::clone(&self.tables);

        async move { Ok(lock(&tables)?.views.get(&participant_id).cloned()) }
    }
}
