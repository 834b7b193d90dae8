//! Domain types for the lotto event.
//!
//! Identifiers, prize tiers, the six-number combination, and the records the
//! engine reads and writes: events, outcome slots, participants, tickets and
//! result views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a lotto event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a registered participant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Creates a new random `ParticipantId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ParticipantId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an outcome slot in an event's pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(Uuid);

impl SlotId {
    /// Creates a new random `SlotId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `SlotId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-way fingerprint of a participant's phone number.
///
/// Fingerprints are compared for equality only. They are produced by an
/// [`IdentityProtector`](crate::environment::IdentityProtector) and never reversed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-computed fingerprint.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix that is safe to put in logs.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tiers
// ============================================================================

/// Error returned when a tier or status name cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

/// Prize tier of an outcome slot, ranked by prize value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// All six numbers match
    First,
    /// Five numbers match
    Second,
    /// Four numbers match
    Third,
    /// Three numbers match
    Fourth,
    /// Two or fewer numbers match (no prize)
    None,
}

impl Tier {
    /// All tiers, most valuable first.
    pub const ALL: [Self; 5] = [
        Self::First,
        Self::Second,
        Self::Third,
        Self::Fourth,
        Self::None,
    ];

    /// Storage / wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "FIRST",
            Self::Second => "SECOND",
            Self::Third => "THIRD",
            Self::Fourth => "FOURTH",
            Self::None => "NONE",
        }
    }

    /// Human-readable label shown on first result disclosure.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::First => "1st prize",
            Self::Second => "2nd prize",
            Self::Third => "3rd prize",
            Self::Fourth => "4th prize",
            Self::None => "No prize",
        }
    }

    /// Exact match-count a paying tier requires, `None` for the losing tier.
    #[must_use]
    pub const fn required_matches(&self) -> Option<usize> {
        match self {
            Self::First => Some(6),
            Self::Second => Some(5),
            Self::Third => Some(4),
            Self::Fourth => Some(3),
            Self::None => None,
        }
    }

    /// Whether a slot with `matches` hits against the winning numbers belongs to this tier.
    #[must_use]
    pub const fn accepts_matches(&self, matches: usize) -> bool {
        match self.required_matches() {
            Some(required) => matches == required,
            None => matches <= 2,
        }
    }

    /// `true` for every tier except [`Tier::None`].
    #[must_use]
    pub const fn is_winning(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIRST" => Ok(Self::First),
            "SECOND" => Ok(Self::Second),
            "THIRD" => Ok(Self::Third),
            "FOURTH" => Ok(Self::Fourth),
            "NONE" => Ok(Self::None),
            other => Err(ParseNameError {
                kind: "tier",
                value: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Numbers
// ============================================================================

/// Smallest number that may be drawn.
pub const MIN_NUMBER: u8 = 1;

/// Largest number that may be drawn.
pub const MAX_NUMBER: u8 = 45;

/// How many numbers make up one combination.
pub const PICK: usize = 6;

/// Error returned when a combination is not six distinct numbers in range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumbersError {
    /// A number fell outside `MIN_NUMBER..=MAX_NUMBER`.
    #[error("Number {0} is outside {MIN_NUMBER}..={MAX_NUMBER}")]
    OutOfRange(i64),

    /// The same number appeared twice.
    #[error("Number {0} appears more than once")]
    Repeated(u8),

    /// Wrong number of values.
    #[error("Expected {PICK} numbers, got {0}")]
    WrongLength(usize),
}

/// Six distinct numbers from `1..=45`, always held in ascending order.
///
/// Because the order is canonical, two combinations holding the same set of
/// numbers compare (and hash) equal, which is what pool-wide uniqueness needs.
///
/// # Examples
///
/// ```
/// use lotto_core::types::LottoNumbers;
///
/// let numbers = LottoNumbers::new([45, 3, 22, 7, 33, 15]).unwrap();
/// assert_eq!(numbers.as_array(), &[3, 7, 15, 22, 33, 45]);
/// assert!(LottoNumbers::new([1, 1, 2, 3, 4, 5]).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; PICK]", into = "[u8; PICK]")]
pub struct LottoNumbers([u8; PICK]);

impl LottoNumbers {
    /// Validate and sort six numbers.
    ///
    /// # Errors
    ///
    /// Returns [`NumbersError`] if a number is out of range or repeated.
    pub fn new(mut numbers: [u8; PICK]) -> Result<Self, NumbersError> {
        numbers.sort_unstable();
        for (i, &n) in numbers.iter().enumerate() {
            if !(MIN_NUMBER..=MAX_NUMBER).contains(&n) {
                return Err(NumbersError::OutOfRange(i64::from(n)));
            }
            if i > 0 && numbers[i - 1] == n {
                return Err(NumbersError::Repeated(n));
            }
        }
        Ok(Self(numbers))
    }

    /// Wrap numbers the caller already drew distinct, in range and sorted.
    pub(crate) const fn from_sorted(numbers: [u8; PICK]) -> Self {
        Self(numbers)
    }

    /// Build from stored integer columns (as read back from a database row).
    ///
    /// # Errors
    ///
    /// Returns [`NumbersError`] if the slice has the wrong length or holds invalid numbers.
    pub fn from_columns(columns: &[i16]) -> Result<Self, NumbersError> {
        if columns.len() != PICK {
            return Err(NumbersError::WrongLength(columns.len()));
        }
        let mut numbers = [0u8; PICK];
        for (slot, &value) in numbers.iter_mut().zip(columns) {
            *slot = u8::try_from(value).map_err(|_| NumbersError::OutOfRange(i64::from(value)))?;
        }
        Self::new(numbers)
    }

    /// The numbers in ascending order.
    #[must_use]
    pub const fn as_array(&self) -> &[u8; PICK] {
        &self.0
    }

    /// Numbers widened for `SMALLINT` storage.
    #[must_use]
    pub fn to_columns(&self) -> [i16; PICK] {
        self.0.map(i16::from)
    }

    /// Whether `n` is one of the six numbers.
    #[must_use]
    pub fn contains(&self, n: u8) -> bool {
        self.0.binary_search(&n).is_ok()
    }

    /// How many of these numbers also appear in `other`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> usize {
        self.0.iter().filter(|&&n| other.contains(n)).count()
    }
}

impl TryFrom<[u8; PICK]> for LottoNumbers {
    type Error = NumbersError;

    fn try_from(value: [u8; PICK]) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LottoNumbers> for [u8; PICK] {
    fn from(value: LottoNumbers) -> Self {
        value.0
    }
}

impl fmt::Display for LottoNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a}-{b}-{c}-{d}-{e}-{g}")
    }
}

// ============================================================================
// Events
// ============================================================================

/// Lifecycle status of a lotto event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Created, pool not yet generated
    Ready,
    /// Pool generated, registrations permitted inside the participation window
    Active,
    /// Closed for good
    Ended,
}

impl EventStatus {
    /// Storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Active => "ACTIVE",
            Self::Ended => "ENDED",
        }
    }

    /// Pool generation is allowed before the event has ended.
    #[must_use]
    pub const fn can_generate_pool(&self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(Self::Ready),
            "ACTIVE" => Ok(Self::Active),
            "ENDED" => Ok(Self::Ended),
            other => Err(ParseNameError {
                kind: "event status",
                value: other.to_string(),
            }),
        }
    }
}

/// A lotto event as the engine sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Display name
    pub name: String,
    /// Participation opens
    pub start_at: DateTime<Utc>,
    /// Participation closes
    pub end_at: DateTime<Utc>,
    /// Results may be checked from
    pub announce_start_at: DateTime<Utc>,
    /// Results may be checked until
    pub announce_end_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: EventStatus,
    /// Fingerprint of the designated first-place winner
    pub winner_fingerprint: Fingerprint,
}

impl Event {
    /// Active and inside the participation window (inclusive).
    #[must_use]
    pub fn is_open_for_participation(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::Active && self.start_at <= now && now <= self.end_at
    }

    /// Inside the announcement window (inclusive).
    #[must_use]
    pub fn is_announcing(&self, now: DateTime<Utc>) -> bool {
        self.announce_start_at <= now && now <= self.announce_end_at
    }
}

// ============================================================================
// Pool
// ============================================================================

/// A freshly generated slot that has not been persisted yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeneratedSlot {
    /// The six numbers
    pub numbers: LottoNumbers,
    /// Tier implied by the numbers' match-count
    pub tier: Tier,
}

/// One pre-generated outcome in an event's inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSlot {
    /// Slot identifier
    pub id: SlotId,
    /// Owning event
    pub event_id: EventId,
    /// The six numbers
    pub numbers: LottoNumbers,
    /// Prize tier
    pub tier: Tier,
    /// Consumed by a participant
    pub used: bool,
    /// Who consumed it
    pub used_by: Option<ParticipantId>,
}

/// Per-tier inventory counts for one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCount {
    /// Slots generated for the tier
    pub total: u32,
    /// Slots already claimed
    pub used: u32,
}

impl TierCount {
    /// Slots still available.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.used)
    }
}

/// Inventory counts for every tier of an event, most valuable first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
    /// One entry per tier that has at least one slot
    pub tiers: Vec<(Tier, TierCount)>,
}

impl TierSummary {
    /// Counts for a single tier (zero if the tier has no slots).
    #[must_use]
    pub fn get(&self, tier: Tier) -> TierCount {
        self.tiers
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, count)| *count)
            .unwrap_or_default()
    }

    /// Total slots over all tiers.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.tiers.iter().map(|(_, c)| c.total).sum()
    }
}

// ============================================================================
// Participants, tickets, views
// ============================================================================

/// A phone identity after it went through the
/// [`IdentityProtector`](crate::environment::IdentityProtector).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedIdentity {
    /// One-way fingerprint used for comparisons
    pub fingerprint: Fingerprint,
    /// Reversible, encrypted form kept for audit
    pub sealed: String,
    /// Display-safe truncated form (last four digits)
    pub last4: String,
}

/// A participant row that has not been written yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewParticipant {
    /// Identifier chosen by the caller
    pub id: ParticipantId,
    /// Owning event
    pub event_id: EventId,
    /// Protected identity
    pub identity: ProtectedIdentity,
    /// Per-event sequence number
    pub ticket_seq: u32,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// A registered participant. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant identifier
    pub id: ParticipantId,
    /// Owning event
    pub event_id: EventId,
    /// One-way fingerprint of the phone number
    pub fingerprint: Fingerprint,
    /// Encrypted phone number
    pub phone_sealed: String,
    /// Last four digits
    pub phone_last4: String,
    /// Per-event sequence number
    pub ticket_seq: u32,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl From<NewParticipant> for Participant {
    fn from(new: NewParticipant) -> Self {
        Self {
            id: new.id,
            event_id: new.event_id,
            fingerprint: new.identity.fingerprint,
            phone_sealed: new.identity.sealed,
            phone_last4: new.identity.last4,
            ticket_seq: new.ticket_seq,
            created_at: new.created_at,
        }
    }
}

/// The outcome issued to a participant, copied from the slot it consumed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Owner (1:1)
    pub participant_id: ParticipantId,
    /// Slot this ticket was cut from
    pub slot_id: SlotId,
    /// Numbers copied from the slot
    pub numbers: LottoNumbers,
    /// Tier copied from the slot
    pub tier: Tier,
    /// Issue time
    pub issued_at: DateTime<Utc>,
}

/// How often a participant has looked at their result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultView {
    /// Owner (1:1)
    pub participant_id: ParticipantId,
    /// Number of checks so far
    pub view_count: u32,
    /// First check
    pub first_view_at: DateTime<Utc>,
    /// Most recent check
    pub last_view_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_sorted_and_validated() {
        let numbers = LottoNumbers::new([9, 1, 45, 30, 2, 17]).unwrap();
        assert_eq!(numbers.as_array(), &[1, 2, 9, 17, 30, 45]);
        assert_eq!(numbers.to_string(), "1-2-9-17-30-45");

        assert_eq!(
            LottoNumbers::new([0, 1, 2, 3, 4, 5]),
            Err(NumbersError::OutOfRange(0))
        );
        assert_eq!(
            LottoNumbers::new([46, 1, 2, 3, 4, 5]),
            Err(NumbersError::OutOfRange(46))
        );
        assert_eq!(
            LottoNumbers::new([7, 1, 2, 3, 4, 7]),
            Err(NumbersError::Repeated(7))
        );
    }

    #[test]
    fn same_set_in_any_order_is_equal() {
        let a = LottoNumbers::new([1, 2, 3, 4, 5, 6]).unwrap();
        let b = LottoNumbers::new([6, 5, 4, 3, 2, 1]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn from_columns_rejects_bad_rows() {
        assert!(LottoNumbers::from_columns(&[1, 2, 3, 4, 5, 6]).is_ok());
        assert_eq!(
            LottoNumbers::from_columns(&[1, 2, 3]),
            Err(NumbersError::WrongLength(3))
        );
        assert_eq!(
            LottoNumbers::from_columns(&[-1, 2, 3, 4, 5, 6]),
            Err(NumbersError::OutOfRange(-1))
        );
    }

    #[test]
    fn match_count() {
        let winning = LottoNumbers::new([1, 2, 3, 4, 5, 6]).unwrap();
        let slot = LottoNumbers::new([1, 2, 3, 40, 41, 42]).unwrap();
        assert_eq!(slot.matches(&winning), 3);
        assert_eq!(winning.matches(&winning), 6);
    }

    #[test]
    fn tier_acceptance() {
        assert!(Tier::First.accepts_matches(6));
        assert!(!Tier::Second.accepts_matches(6));
        assert!(Tier::Fourth.accepts_matches(3));
        assert!(Tier::None.accepts_matches(0));
        assert!(Tier::None.accepts_matches(2));
        assert!(!Tier::None.accepts_matches(3));
    }

    #[test]
    fn tier_names_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(tier.as_str().parse::<Tier>(), Ok(tier));
        }
        assert!("FIFTH".parse::<Tier>().is_err());
        assert_eq!(
            serde_json::to_string(&Tier::Second).unwrap(),
            "\"SECOND\""
        );
    }

    #[test]
    fn numbers_deserialize_through_validation() {
        let ok: LottoNumbers = serde_json::from_str("[6,5,4,3,2,1]").unwrap();
        assert_eq!(ok.as_array(), &[1, 2, 3, 4, 5, 6]);
        assert!(serde_json::from_str::<LottoNumbers>("[1,1,2,3,4,5]").is_err());
    }

    #[test]
    fn event_windows() {
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: "spring".to_string(),
            start_at: now - chrono::Duration::days(1),
            end_at: now + chrono::Duration::days(1),
            announce_start_at: now + chrono::Duration::days(2),
            announce_end_at: now + chrono::Duration::days(5),
            status: EventStatus::Active,
            winner_fingerprint: Fingerprint::new("W"),
        };
        assert!(event.is_open_for_participation(now));
        assert!(!event.is_announcing(now));
        assert!(event.is_announcing(now + chrono::Duration::days(3)));

        let ready = Event {
            status: EventStatus::Ready,
            ..event
        };
        assert!(!ready.is_open_for_participation(now));
    }

    #[test]
    fn fingerprint_short_prefix() {
        assert_eq!(Fingerprint::new("abcdef0123456789").short(), "abcdef01");
        assert_eq!(Fingerprint::new("W").short(), "W");
    }
}
