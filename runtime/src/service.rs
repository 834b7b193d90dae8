//! The lotto engine.
//!
//! [`LottoService`] ties the pure parts of `lotto-core` (generator, eligibility)
//! to a [`LottoStore`] and exposes the operations the calling layer uses:
//!
//! | Operation | Does |
//! |---|---|
//! | [`generate_pool`](LottoService::generate_pool) | builds and stores the inventory, activates the event |
//! | [`register`](LottoService::register) | one registration per identity, bounded retry on races |
//! | [`allocate`](LottoService::allocate) | claims one eligible slot and issues the ticket |
//! | [`participate`](LottoService::participate) | register then allocate |
//! | [`check_result`](LottoService::check_result) | discloses full detail on the first view only |
//!
//! The service keeps no slot or view state of its own; every decision that
//! can race is delegated to one atomic store primitive.

use crate::metrics::{ParticipationMetrics, PoolMetrics, ResultMetrics};
use crate::retry::{RetryError, RetryPolicy, retry_with_predicate};
use lotto_core::config::PoolConfig;
use lotto_core::eligibility::{EligibilityPolicy, EligibleTiers};
use lotto_core::environment::{Clock, IdentityProtector};
use lotto_core::error::{
    ALREADY_PARTICIPATED, Constraint, LottoError, Resource, Result, StoreError, TICKET_ALREADY_ISSUED,
};
use lotto_core::pool::PoolGenerator;
use lotto_core::store::{LottoStore, PoolInstall};
use lotto_core::types::{
    Event, EventId, LottoNumbers, NewParticipant, Participant, ParticipantId, ProtectedIdentity,
    Ticket, Tier, TierSummary,
};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::time::Instant;

/// Outcome of [`LottoService::generate_pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PoolGeneration {
    /// A new pool was written and the event activated.
    Generated {
        /// Slots written
        slots: u64,
    },
    /// The event already had a pool; nothing was written.
    AlreadyGenerated {
        /// Slots already present
        existing: u64,
    },
}

/// What a participant receives after a successful participation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipateReceipt {
    /// New participant
    pub participant_id: ParticipantId,
    /// Per-event sequence number
    pub ticket_seq: u32,
    /// Numbers on the issued ticket
    pub numbers: LottoNumbers,
    /// Last four digits of the registered phone
    pub phone_last4: String,
}

/// Detail revealed on the first result check only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultDetail {
    /// Ticket tier
    pub tier: Tier,
    /// Human-readable tier name
    pub label: &'static str,
    /// Ticket numbers
    pub numbers: LottoNumbers,
}

/// Response of [`LottoService::check_result`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultCheck {
    /// Whether the ticket pays out
    pub won: bool,
    /// `true` for exactly one check per participant
    pub is_first_check: bool,
    /// Last four digits of the registered phone
    pub phone_last4: String,
    /// Present on the first check only
    pub detail: Option<ResultDetail>,
}

/// Failure of one registration attempt.
#[derive(Debug)]
enum Attempt {
    /// A unique index fired and the identity is still unregistered.
    Raced(Constraint),
    /// Anything else; surfaced without retrying.
    Failed(LottoError),
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raced(constraint) => write!(f, "lost race on {constraint:?}"),
            Self::Failed(err) => err.fmt(f),
        }
    }
}

/// The lotto engine.
///
/// # Type Parameters
///
/// - `S`: Storage ([`LottoStore`])
/// - `P`: Phone protection ([`IdentityProtector`])
/// - `C`: Time source ([`Clock`])
#[derive(Debug, Clone)]
pub struct LottoService<S, P, C> {
    store: S,
    identity: P,
    clock: C,
    generator: PoolGenerator,
    eligibility: EligibilityPolicy,
    retry: RetryPolicy,
}

impl<S, P, C> LottoService<S, P, C>
where
    S: LottoStore,
    P: IdentityProtector,
    C: Clock,
{
    /// Create a service with the default pool shape, eligibility windows and
    /// retry policy.
    #[must_use]
    pub fn new(store: S, identity: P, clock: C) -> Self {
        Self {
            store,
            identity,
            clock,
            generator: PoolGenerator::default(),
            eligibility: EligibilityPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Use a different pool shape.
    #[must_use]
    pub fn with_pool_config(mut self, config: PoolConfig) -> Self {
        self.generator = PoolGenerator::new(config);
        self
    }

    /// Use a different generator (pool shape plus attempt budget).
    #[must_use]
    pub fn with_generator(mut self, generator: PoolGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Use different eligibility windows.
    #[must_use]
    pub const fn with_eligibility(mut self, eligibility: EligibilityPolicy) -> Self {
        self.eligibility = eligibility;
        self
    }

    /// Use a different registration retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The eligibility windows in use.
    #[must_use]
    pub const fn eligibility(&self) -> &EligibilityPolicy {
        &self.eligibility
    }

    async fn load_event(&self, event_id: EventId) -> Result<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or(LottoError::NotFound(Resource::Event))
    }

    // ═══════════════════════════════════════════════════════════
    // Pool generation
    // ═══════════════════════════════════════════════════════════

    /// Generate and store the event's outcome pool, then activate the event.
    ///
    /// Calling it again for an event that already has a pool writes nothing
    /// and returns [`PoolGeneration::AlreadyGenerated`].
    ///
    /// # Errors
    ///
    /// - [`LottoError::NotFound`] if the event does not exist
    /// - [`LottoError::InvalidState`] if the event has ended
    /// - [`LottoError::Config`] if the pool shape cannot be generated
    /// - [`LottoError::Internal`] if storage fails (no slots remain)
    pub async fn generate_pool(&self, event_id: EventId) -> Result<PoolGeneration> {
        let mut rng = StdRng::from_entropy();
        self.generate_pool_with(event_id, &mut rng).await
    }

    /// [`generate_pool`](Self::generate_pool) with an injected random source.
    ///
    /// # Errors
    ///
    /// Same as [`generate_pool`](Self::generate_pool).
    #[tracing::instrument(skip(self, rng), fields(event_id = %event_id))]
    pub async fn generate_pool_with<R>(
        &self,
        event_id: EventId,
        rng: &mut R,
    ) -> Result<PoolGeneration>
    where
        R: Rng + Send,
    {
        let event = self.load_event(event_id).await?;
        if !event.status.can_generate_pool() {
            return Err(LottoError::InvalidState("event has ended"));
        }

        let existing = self.store.count_slots(event_id).await?;
        if existing > 0 {
            // A previous run may have stored the pool and stopped before activating.
            self.store.activate_event(event_id).await?;
            tracing::info!(existing, "Pool already generated");
            return Ok(PoolGeneration::AlreadyGenerated { existing });
        }

        let started = Instant::now();
        let pool = self.generator.generate(rng)?;
        let batch_size = self.generator.config().batch_size;

        match self
            .store
            .install_pool(event_id, pool.slots(), batch_size)
            .await?
        {
            PoolInstall::Installed { inserted } => {
                self.store.activate_event(event_id).await?;
                let counts: Vec<(Tier, u64)> = Tier::ALL
                    .into_iter()
                    .map(|tier| (tier, pool.count(tier) as u64))
                    .collect();
                PoolMetrics::record_generated(&counts, started.elapsed());
                tracing::info!(
                    slots = inserted,
                    elapsed_ms = started.elapsed().as_millis(),
                    "Pool generated"
                );
                Ok(PoolGeneration::Generated { slots: inserted })
            }
            PoolInstall::AlreadyPresent { existing } => {
                self.store.activate_event(event_id).await?;
                tracing::info!(existing, "Pool was generated concurrently");
                Ok(PoolGeneration::AlreadyGenerated { existing })
            }
        }
    }

    /// Per-tier inventory counts.
    ///
    /// # Errors
    ///
    /// Returns [`LottoError::NotFound`] if the event does not exist.
    pub async fn tier_summary(&self, event_id: EventId) -> Result<TierSummary> {
        self.load_event(event_id).await?;
        Ok(self.store.tier_summary(event_id).await?)
    }

    // ═══════════════════════════════════════════════════════════
    // Registration and allocation
    // ═══════════════════════════════════════════════════════════

    /// Register a phone number for an event.
    ///
    /// Assigns the next ticket sequence and inserts the participant. When a
    /// concurrent registration makes the insert fail on a unique index, the
    /// identity is looked up again: if it is now registered the call reports
    /// a duplicate, otherwise it retries with a fresh sequence.
    ///
    /// # Errors
    ///
    /// - [`LottoError::NotFound`] if the event does not exist
    /// - [`LottoError::InvalidState`] outside the participation window
    /// - [`LottoError::Conflict`] if the phone is already registered
    /// - [`LottoError::Transient`] if every attempt lost a race
    #[tracing::instrument(skip(self, raw_phone), fields(event_id = %event_id))]
    pub async fn register(&self, event_id: EventId, raw_phone: &str) -> Result<Participant> {
        let event = self.load_event(event_id).await?;
        let identity = self.identity.protect(raw_phone)?;
        self.register_identity(&event, identity).await
    }

    async fn register_identity(
        &self,
        event: &Event,
        identity: ProtectedIdentity,
    ) -> Result<Participant> {
        if !event.is_open_for_participation(self.clock.now()) {
            return Err(LottoError::InvalidState("event is not open for participation"));
        }

        if self
            .store
            .find_by_fingerprint(event.id, &identity.fingerprint)
            .await?
            .is_some()
        {
            tracing::debug!(fingerprint = identity.fingerprint.short(), "Duplicate participation");
            return Err(LottoError::Conflict(ALREADY_PARTICIPATED));
        }

        let identity = &identity;
        let outcome = retry_with_predicate(
            &self.retry,
            || async move { self.try_insert(event.id, identity).await },
            |attempt| matches!(attempt, Attempt::Raced(_)),
        )
        .await;

        match outcome {
            Ok(participant) => {
                tracing::info!(
                    participant_id = %participant.id,
                    ticket_seq = participant.ticket_seq,
                    "Participant registered"
                );
                Ok(participant)
            }
            Err(RetryError::Rejected(Attempt::Failed(err))) => Err(err),
            Err(RetryError::Rejected(Attempt::Raced(_))) => {
                Err(LottoError::Internal("race was not retried".to_string()))
            }
            Err(RetryError::Exhausted { attempts, .. }) => {
                Err(LottoError::Transient { attempts })
            }
        }
    }

    async fn try_insert(
        &self,
        event_id: EventId,
        identity: &ProtectedIdentity,
    ) -> std::result::Result<Participant, Attempt> {
        let ticket_seq = self
            .store
            .next_ticket_seq(event_id)
            .await
            .map_err(|e| Attempt::Failed(e.into()))?;

        let row = NewParticipant {
            id: ParticipantId::new(),
            event_id,
            identity: identity.clone(),
            ticket_seq,
            created_at: self.clock.now(),
        };

        match self.store.insert_participant(&row).await {
            Ok(participant) => Ok(participant),
            Err(StoreError::UniqueViolation { constraint }) => {
                let registered = self
                    .store
                    .find_by_fingerprint(event_id, &identity.fingerprint)
                    .await
                    .map_err(|e| Attempt::Failed(e.into()))?;
                if registered.is_some() {
                    return Err(Attempt::Failed(LottoError::Conflict(ALREADY_PARTICIPATED)));
                }
                ParticipationMetrics::record_retry();
                tracing::debug!(ticket_seq, ?constraint, "Registration raced");
                Err(Attempt::Raced(constraint))
            }
            Err(e) => Err(Attempt::Failed(e.into())),
        }
    }

    /// Tiers a registered participant may receive in an event.
    #[must_use]
    pub fn eligible_tiers(&self, event: &Event, participant: &Participant) -> EligibleTiers {
        self.eligibility
            .resolve_for(&participant.fingerprint, event, participant.ticket_seq)
    }

    /// Claim a slot for a registered participant and issue their ticket.
    ///
    /// # Errors
    ///
    /// - [`LottoError::NotFound`] if the participant or event does not exist
    /// - [`LottoError::Exhausted`] if no eligible slot is left
    /// - [`LottoError::Conflict`] if the participant already holds a ticket
    #[tracing::instrument(skip(self), fields(participant_id = %participant_id))]
    pub async fn allocate(&self, participant_id: ParticipantId) -> Result<Ticket> {
        let participant = self
            .store
            .find_participant(participant_id)
            .await?
            .ok_or(LottoError::NotFound(Resource::Participant))?;
        let event = self.load_event(participant.event_id).await?;
        self.allocate_for(&event, &participant).await
    }

    async fn allocate_for(&self, event: &Event, participant: &Participant) -> Result<Ticket> {
        let tiers = self.eligible_tiers(event, participant);

        let claimed = self
            .store
            .claim_slot(event.id, participant.id, &tiers, self.clock.now())
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation {
                    constraint: Constraint::TicketOwner,
                } => LottoError::Conflict(TICKET_ALREADY_ISSUED),
                other => other.into(),
            })?;

        let Some(ticket) = claimed else {
            ParticipationMetrics::record_exhausted();
            tracing::warn!(
                event_id = %event.id,
                participant_id = %participant.id,
                tiers = ?tiers.as_slice(),
                "No eligible slot left"
            );
            return Err(LottoError::Exhausted);
        };

        ParticipationMetrics::record_claim(ticket.tier);
        tracing::debug!(
            participant_id = %participant.id,
            tier = %ticket.tier,
            "Ticket issued"
        );
        Ok(ticket)
    }

    /// Register a phone number and issue its ticket.
    ///
    /// If allocation finds nothing left, the registration stays in place
    /// without a ticket.
    ///
    /// # Errors
    ///
    /// Any error of [`register`](Self::register) or [`allocate`](Self::allocate).
    #[tracing::instrument(skip(self, raw_phone), fields(event_id = %event_id))]
    pub async fn participate(&self, event_id: EventId, raw_phone: &str) -> Result<ParticipateReceipt> {
        let result = self.participate_inner(event_id, raw_phone).await;
        ParticipationMetrics::record_outcome(match &result {
            Ok(_) => "issued",
            Err(err) => err.kind(),
        });
        result
    }

    async fn participate_inner(&self, event_id: EventId, raw_phone: &str) -> Result<ParticipateReceipt> {
        let event = self.load_event(event_id).await?;
        let identity = self.identity.protect(raw_phone)?;
        let participant = self.register_identity(&event, identity).await?;
        let ticket = self.allocate_for(&event, &participant).await?;

        Ok(ParticipateReceipt {
            participant_id: participant.id,
            ticket_seq: participant.ticket_seq,
            numbers: ticket.numbers,
            phone_last4: participant.phone_last4,
        })
    }

    // ═══════════════════════════════════════════════════════════
    // Result disclosure
    // ═══════════════════════════════════════════════════════════

    /// Check a participant's result.
    ///
    /// Every call counts as a view. The call that records the first view is
    /// the only one that carries [`ResultDetail`].
    ///
    /// # Errors
    ///
    /// - [`LottoError::NotFound`] if the participant, event or ticket does not exist
    /// - [`LottoError::InvalidState`] outside the announcement window
    #[tracing::instrument(skip(self), fields(participant_id = %participant_id))]
    pub async fn check_result(&self, participant_id: ParticipantId) -> Result<ResultCheck> {
        let participant = self
            .store
            .find_participant(participant_id)
            .await?
            .ok_or(LottoError::NotFound(Resource::Participant))?;
        let event = self.announcing_event(participant.event_id).await?;
        self.check_result_of(&event, &participant).await
    }

    /// Check a result by event and phone number.
    ///
    /// The event and its announcement window are checked before the phone is
    /// looked up, so outside the window a registered and an unregistered
    /// phone get the same answer.
    ///
    /// # Errors
    ///
    /// Same as [`check_result`](Self::check_result).
    #[tracing::instrument(skip(self, raw_phone), fields(event_id = %event_id))]
    pub async fn check_result_for(&self, event_id: EventId, raw_phone: &str) -> Result<ResultCheck> {
        let event = self.announcing_event(event_id).await?;
        let fingerprint = self.identity.fingerprint(raw_phone);
        let participant = self
            .store
            .find_by_fingerprint(event.id, &fingerprint)
            .await?
            .ok_or(LottoError::NotFound(Resource::Participant))?;
        self.check_result_of(&event, &participant).await
    }

    async fn announcing_event(&self, event_id: EventId) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        if !event.is_announcing(self.clock.now()) {
            return Err(LottoError::InvalidState("results are not being announced"));
        }
        Ok(event)
    }

    async fn check_result_of(&self, event: &Event, participant: &Participant) -> Result<ResultCheck> {
        let ticket = self
            .store
            .find_ticket(participant.id)
            .await?
            .ok_or(LottoError::NotFound(Resource::Ticket))?;

        let view = self
            .store
            .record_view(participant.id, self.clock.now())
            .await?;
        let is_first_check = view.view_count == 1;
        ResultMetrics::record_check(is_first_check);
        tracing::debug!(
            event_id = %event.id,
            view_count = view.view_count,
            "Result checked"
        );

        Ok(ResultCheck {
            won: ticket.tier.is_winning(),
            is_first_check,
            phone_last4: participant.phone_last4.clone(),
            detail: is_first_check.then(|| ResultDetail {
                tier: ticket.tier,
                label: ticket.tier.label(),
                numbers: ticket.numbers,
            }),
        })
    }
}
