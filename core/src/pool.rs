//! Outcome pool generation.
//!
//! A pool is the full inventory of slots for one event, built once before any
//! participant arrives. Generation is a pure function of a [`PoolConfig`], the
//! event's hidden winning numbers and a random source, so tests can fix both.
//!
//! # Algorithm
//!
//! 1. Draw six distinct winning numbers (kept out of every public result).
//! 2. FIRST is the winning combination itself.
//! 3. SECOND / THIRD / FOURTH keep 5 / 4 / 3 random winning numbers and fill
//!    the rest from the numbers that are not winning.
//! 4. NONE draws six numbers and rejects any draw with three or more matches.
//! 5. A combination already present in the pool is redrawn with its tier's rule.
//!
//! Every redraw loop is bounded; running out of attempts is reported as an
//! error instead of spinning forever.
//!
//! # Example
//!
//! ```
//! use lotto_core::config::PoolConfig;
//! use lotto_core::pool::PoolGenerator;
//! use lotto_core::types::Tier;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let pool = PoolGenerator::new(PoolConfig::new(10, 1, 1, 2, 3))
//!     .generate(&mut rng)
//!     .unwrap();
//!
//! assert_eq!(pool.slots().len(), 10);
//! assert_eq!(pool.count(Tier::None), 3);
//! ```

use crate::config::PoolConfig;
use crate::error::LottoError;
use crate::types::{GeneratedSlot, LottoNumbers, MAX_NUMBER, MIN_NUMBER, PICK, Tier};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Default redraw budget for a single slot.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

const DOMAIN: usize = (MAX_NUMBER - MIN_NUMBER + 1) as usize;

fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

/// How many distinct combinations exist for a tier.
///
/// Used to reject pool shapes the generator could never fill.
#[must_use]
pub fn combinations_for(tier: Tier) -> u64 {
    let pick = PICK as u64;
    let losing = DOMAIN as u64 - pick;
    match tier.required_matches() {
        Some(k) => {
            let k = k as u64;
            binomial(pick, k) * binomial(losing, pick - k)
        }
        None => (0..=2).map(|k| binomial(pick, k) * binomial(losing, pick - k)).sum(),
    }
}

/// Draw six distinct numbers uniformly from the whole domain.
pub fn draw_numbers<R: Rng + ?Sized>(rng: &mut R) -> LottoNumbers {
    let mut numbers = [0u8; PICK];
    for (slot, index) in numbers
        .iter_mut()
        .zip(rand::seq::index::sample(rng, DOMAIN, PICK).into_iter())
    {
        // index < DOMAIN (45), so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        let n = index as u8 + MIN_NUMBER;
        *slot = n;
    }
    sorted(numbers)
}

/// Draw the event's hidden winning combination.
pub fn draw_winning<R: Rng + ?Sized>(rng: &mut R) -> LottoNumbers {
    draw_numbers(rng)
}

fn sorted(mut numbers: [u8; PICK]) -> LottoNumbers {
    numbers.sort_unstable();
    // Distinct and in range by construction
    LottoNumbers::from_sorted(numbers)
}

/// Combination that shares exactly `matches` numbers with `winning`.
///
/// `matches` must be at most six; the remaining positions come from the
/// numbers that are not in `winning`, without repeats.
pub fn draw_with_matches<R: Rng + ?Sized>(
    matches: usize,
    winning: &LottoNumbers,
    rng: &mut R,
) -> LottoNumbers {
    let matches = matches.min(PICK);
    let losing: Vec<u8> = (MIN_NUMBER..=MAX_NUMBER)
        .filter(|n| !winning.contains(*n))
        .collect();

    let mut numbers = [0u8; PICK];
    let kept = winning.as_array().choose_multiple(rng, matches);
    let filler = losing.choose_multiple(rng, PICK - matches);
    for (slot, n) in numbers.iter_mut().zip(kept.chain(filler)) {
        *slot = *n;
    }
    sorted(numbers)
}

/// Combination with at most two matches, by rejection sampling.
///
/// Returns `None` if `max_attempts` draws all matched three or more.
pub fn draw_losing<R: Rng + ?Sized>(
    winning: &LottoNumbers,
    rng: &mut R,
    max_attempts: u32,
) -> Option<LottoNumbers> {
    (0..max_attempts)
        .map(|_| draw_numbers(rng))
        .find(|candidate| Tier::None.accepts_matches(candidate.matches(winning)))
}

/// One candidate for `tier`, before the pool-wide uniqueness check.
pub fn draw_candidate<R: Rng + ?Sized>(
    tier: Tier,
    winning: &LottoNumbers,
    rng: &mut R,
    max_attempts: u32,
) -> Option<LottoNumbers> {
    match tier.required_matches() {
        Some(PICK) => Some(*winning),
        Some(k) => Some(draw_with_matches(k, winning, rng)),
        None => draw_losing(winning, rng, max_attempts),
    }
}

/// A generated pool together with the winning numbers it was built against.
#[derive(Debug, Clone)]
pub struct GeneratedPool {
    winning: LottoNumbers,
    slots: Vec<GeneratedSlot>,
}

impl GeneratedPool {
    /// The hidden winning numbers. Never returned to participants.
    #[must_use]
    pub const fn winning(&self) -> &LottoNumbers {
        &self.winning
    }

    /// All slots, FIRST first and NONE last.
    #[must_use]
    pub fn slots(&self) -> &[GeneratedSlot] {
        &self.slots
    }

    /// Take ownership of the slots.
    #[must_use]
    pub fn into_slots(self) -> Vec<GeneratedSlot> {
        self.slots
    }

    /// Number of slots in a tier.
    #[must_use]
    pub fn count(&self, tier: Tier) -> usize {
        self.slots.iter().filter(|s| s.tier == tier).count()
    }
}

/// Builds outcome pools for a fixed [`PoolConfig`].
#[derive(Debug, Clone)]
pub struct PoolGenerator {
    config: PoolConfig,
    max_attempts: u32,
}

impl PoolGenerator {
    /// Create a generator for the given pool shape.
    #[must_use]
    pub const fn new(config: PoolConfig) -> Self {
        Self {
            config,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the redraw budget per slot.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Pool shape this generator produces.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Draw winning numbers and build the pool around them.
    ///
    /// # Errors
    ///
    /// See [`PoolGenerator::generate_with`].
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GeneratedPool, LottoError> {
        let winning = draw_winning(rng);
        self.generate_with(winning, rng)
    }

    /// Build the pool around caller-supplied winning numbers.
    ///
    /// # Errors
    ///
    /// Returns [`LottoError::Config`] if the configuration is invalid or a slot
    /// could not be made unique within the redraw budget.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        winning: LottoNumbers,
        rng: &mut R,
    ) -> Result<GeneratedPool, LottoError> {
        self.config.validate()?;

        let capacity = self.config.total as usize;
        let mut slots = Vec::with_capacity(capacity);
        let mut seen: HashSet<LottoNumbers> = HashSet::with_capacity(capacity);

        for tier in Tier::ALL {
            for _ in 0..self.config.count(tier) {
                let numbers = self.unique_candidate(tier, &winning, rng, &seen)?;
                seen.insert(numbers);
                slots.push(GeneratedSlot { numbers, tier });
            }
        }

        Ok(GeneratedPool { winning, slots })
    }

    fn unique_candidate<R: Rng + ?Sized>(
        &self,
        tier: Tier,
        winning: &LottoNumbers,
        rng: &mut R,
        seen: &HashSet<LottoNumbers>,
    ) -> Result<LottoNumbers, LottoError> {
        for _ in 0..self.max_attempts {
            if let Some(candidate) = draw_candidate(tier, winning, rng, self.max_attempts) {
                if !seen.contains(&candidate) {
                    return Ok(candidate);
                }
            }
        }
        Err(LottoError::Config(format!(
            "no unique {tier} combination found after {} attempts",
            self.max_attempts
        )))
    }
}

impl Default for PoolGenerator {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn winning() -> LottoNumbers {
        LottoNumbers::new([3, 11, 19, 27, 35, 43]).unwrap()
    }

    fn assert_pool_invariants(pool: &GeneratedPool, config: &PoolConfig) {
        assert_eq!(pool.slots().len(), config.total as usize);
        for tier in Tier::ALL {
            assert_eq!(pool.count(tier), config.count(tier) as usize, "{tier}");
        }
        let unique: HashSet<_> = pool.slots().iter().map(|s| s.numbers).collect();
        assert_eq!(unique.len(), pool.slots().len(), "duplicate combination");
        for slot in pool.slots() {
            let matches = slot.numbers.matches(pool.winning());
            assert!(
                slot.tier.accepts_matches(matches),
                "{} has {matches} matches for {}",
                slot.numbers,
                slot.tier
            );
        }
    }

    #[test]
    fn combination_capacity() {
        assert_eq!(combinations_for(Tier::First), 1);
        assert_eq!(combinations_for(Tier::Second), 6 * 39);
        assert_eq!(combinations_for(Tier::Third), 15 * 741);
        assert_eq!(combinations_for(Tier::Fourth), 20 * 9_139);
        assert_eq!(
            Tier::ALL.iter().map(|t| combinations_for(*t)).sum::<u64>(),
            binomial(45, 6)
        );
    }

    #[test]
    fn first_slot_is_the_winning_combination() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = PoolGenerator::new(PoolConfig::new(10, 1, 1, 2, 3))
            .generate_with(winning(), &mut rng)
            .unwrap();
        let first: Vec<_> = pool
            .slots()
            .iter()
            .filter(|s| s.tier == Tier::First)
            .collect();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].numbers, winning());
    }

    #[test]
    fn draw_with_matches_is_exact() {
        let mut rng = StdRng::seed_from_u64(2);
        for k in 0..=6 {
            for _ in 0..50 {
                let numbers = draw_with_matches(k, &winning(), &mut rng);
                assert_eq!(numbers.matches(&winning()), k);
            }
        }
    }

    #[test]
    fn losing_draw_respects_budget() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(draw_losing(&winning(), &mut rng, 0).is_none());
        let numbers = draw_losing(&winning(), &mut rng, 1_000).unwrap();
        assert!(numbers.matches(&winning()) <= 2);
    }

    #[test]
    fn default_pool_holds_every_invariant() {
        let config = PoolConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let pool = PoolGenerator::new(config).generate(&mut rng).unwrap();
        assert_pool_invariants(&pool, &config);
    }

    #[test]
    fn saturated_tier_uses_every_combination() {
        // 234 SECOND combinations exist; asking for all of them must still succeed
        let config = PoolConfig::new(234, 0, 234, 0, 0);
        let mut rng = StdRng::seed_from_u64(5);
        let pool = PoolGenerator::new(config)
            .with_max_attempts(1_000_000)
            .generate(&mut rng)
            .unwrap();
        assert_pool_invariants(&pool, &config);
    }

    #[test]
    fn exhausted_budget_is_an_error() {
        let config = PoolConfig::new(2, 0, 2, 0, 0);
        let mut rng = StdRng::seed_from_u64(6);
        let result = PoolGenerator::new(config)
            .with_max_attempts(0)
            .generate(&mut rng);
        assert!(matches!(result, Err(LottoError::Config(_))));
    }

    #[test]
    fn invalid_config_is_rejected_before_drawing() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = PoolGenerator::new(PoolConfig::new(3, 1, 1, 1, 1)).generate(&mut rng);
        assert!(matches!(result, Err(LottoError::Config(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn small_pools_hold_every_invariant(
            seed in any::<u64>(),
            second in 0u32..10,
            third in 0u32..30,
            fourth in 0u32..60,
            none in 0u32..100,
        ) {
            let total = 1 + second + third + fourth + none;
            let config = PoolConfig::new(total, 1, second, third, fourth);
            let mut rng = StdRng::seed_from_u64(seed);
            let pool = PoolGenerator::new(config).generate(&mut rng).unwrap();
            assert_pool_invariants(&pool, &config);
        }
    }
}
