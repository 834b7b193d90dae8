//! Eligibility resolution.
//!
//! Decides which tiers a participant may be matched to. The result is a set:
//! the allocator draws uniformly across every unused slot of every eligible
//! tier in one go, it does not walk the tiers in order.

use crate::types::{Event, Fingerprint, Tier};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::RangeInclusive;

/// Inclusive ticket-sequence window for a mid-tier prize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRange {
    /// First sequence number in the window
    pub start: u32,
    /// Last sequence number in the window
    pub end: u32,
}

impl SequenceRange {
    /// Create a window covering `start..=end`.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether `seq` falls inside the window.
    #[must_use]
    pub const fn contains(&self, seq: u32) -> bool {
        self.start <= seq && seq <= self.end
    }
}

impl From<RangeInclusive<u32>> for SequenceRange {
    fn from(range: RangeInclusive<u32>) -> Self {
        Self::new(*range.start(), *range.end())
    }
}

/// Event-scoped eligibility thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    /// Sequence window that may receive SECOND.
    ///
    /// Default: 2000..=7000
    pub second: SequenceRange,

    /// Sequence window that may receive THIRD.
    ///
    /// Default: 1000..=8000
    pub third: SequenceRange,
}

impl EligibilityPolicy {
    /// Create a policy from explicit windows.
    #[must_use]
    pub const fn new(second: SequenceRange, third: SequenceRange) -> Self {
        Self { second, third }
    }

    /// Set the SECOND window.
    #[must_use]
    pub const fn with_second(mut self, range: SequenceRange) -> Self {
        self.second = range;
        self
    }

    /// Set the THIRD window.
    #[must_use]
    pub const fn with_third(mut self, range: SequenceRange) -> Self {
        self.third = range;
        self
    }

    /// Tiers a participant may receive.
    ///
    /// - the designated winner gets FIRST
    /// - sequence inside the SECOND window gets SECOND
    /// - sequence inside the THIRD window gets THIRD
    /// - everyone gets FOURTH and NONE
    ///
    /// # Examples
    ///
    /// ```
    /// use lotto_core::eligibility::EligibilityPolicy;
    /// use lotto_core::types::{Fingerprint, Tier};
    ///
    /// let policy = EligibilityPolicy::default();
    /// let winner = Fingerprint::new("W");
    ///
    /// let tiers = policy.resolve(&Fingerprint::new("someone"), &winner, 1500);
    /// assert_eq!(tiers.as_slice(), &[Tier::Third, Tier::Fourth, Tier::None]);
    /// ```
    #[must_use]
    pub fn resolve(
        &self,
        fingerprint: &Fingerprint,
        winner: &Fingerprint,
        ticket_seq: u32,
    ) -> EligibleTiers {
        let mut tiers = SmallVec::new();
        if fingerprint == winner {
            tiers.push(Tier::First);
        }
        if self.second.contains(ticket_seq) {
            tiers.push(Tier::Second);
        }
        if self.third.contains(ticket_seq) {
            tiers.push(Tier::Third);
        }
        tiers.push(Tier::Fourth);
        tiers.push(Tier::None);
        EligibleTiers(tiers)
    }

    /// [`EligibilityPolicy::resolve`] against an event's designated winner.
    #[must_use]
    pub fn resolve_for(&self, fingerprint: &Fingerprint, event: &Event, ticket_seq: u32) -> EligibleTiers {
        self.resolve(fingerprint, &event.winner_fingerprint, ticket_seq)
    }
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::new(
            SequenceRange::new(2_000, 7_000),
            SequenceRange::new(1_000, 8_000),
        )
    }
}

/// Set of tiers a participant may be matched to, most valuable first.
///
/// Always ends with FOURTH and NONE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleTiers(SmallVec<[Tier; 5]>);

impl EligibleTiers {
    /// Tiers as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Tier] {
        &self.0
    }

    /// Whether `tier` is eligible.
    #[must_use]
    pub fn contains(&self, tier: Tier) -> bool {
        self.0.contains(&tier)
    }

    /// Storage names, for `tier = ANY($n)` style queries.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(Tier::as_str).collect()
    }
}

impl FromIterator<Tier> for EligibleTiers {
    fn from_iter<I: IntoIterator<Item = Tier>>(iter: I) -> Self {
        let mut tiers: SmallVec<[Tier; 5]> = iter.into_iter().collect();
        tiers.sort_unstable();
        tiers.dedup();
        Self(tiers)
    }
}
