//! Pool configuration.
//!
//! Configuration values should be provided by the application, not hardcoded.
//! The defaults below are the standard 10,000-slot event.

use crate::error::LottoError;
use crate::types::Tier;
use serde::{Deserialize, Serialize};

/// Shape of an event's outcome pool.
///
/// The NONE tier is never configured directly: it takes whatever is left of
/// `total` after the paying tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Total number of slots.
    ///
    /// Default: 10,000
    pub total: u32,

    /// FIRST slots. Only one winning combination exists, so this is 0 or 1.
    ///
    /// Default: 1
    pub first: u32,

    /// SECOND slots (five matches).
    ///
    /// Default: 5
    pub second: u32,

    /// THIRD slots (four matches).
    ///
    /// Default: 44
    pub third: u32,

    /// FOURTH slots (three matches).
    ///
    /// Default: 950
    pub fourth: u32,

    /// Rows per bulk insert.
    ///
    /// Default: 1,000
    pub batch_size: usize,
}

impl PoolConfig {
    /// Create a pool shape from explicit tier counts.
    #[must_use]
    pub const fn new(total: u32, first: u32, second: u32, third: u32, fourth: u32) -> Self {
        Self {
            total,
            first,
            second,
            third,
            fourth,
            batch_size: 1_000,
        }
    }

    /// Set rows per bulk insert.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// NONE slots: the remainder of `total`.
    #[must_use]
    pub const fn none(&self) -> u32 {
        self.total
            .saturating_sub(self.first)
            .saturating_sub(self.second)
            .saturating_sub(self.third)
            .saturating_sub(self.fourth)
    }

    /// Configured slot count for a tier.
    #[must_use]
    pub const fn count(&self, tier: Tier) -> u32 {
        match tier {
            Tier::First => self.first,
            Tier::Second => self.second,
            Tier::Third => self.third,
            Tier::Fourth => self.fourth,
            Tier::None => self.none(),
        }
    }

    /// Check that the tiers fit in `total` and the generator can satisfy them.
    ///
    /// # Errors
    ///
    /// Returns [`LottoError::Config`] when:
    /// - paying tiers add up to more than `total`
    /// - more than one FIRST slot is requested
    /// - a tier asks for more distinct combinations than exist for its match-count
    /// - `batch_size` is zero
    pub fn validate(&self) -> Result<(), LottoError> {
        let paying = u64::from(self.first)
            + u64::from(self.second)
            + u64::from(self.third)
            + u64::from(self.fourth);
        if paying > u64::from(self.total) {
            return Err(LottoError::Config(format!(
                "paying tiers ({paying}) exceed total slots ({})",
                self.total
            )));
        }
        if self.batch_size == 0 {
            return Err(LottoError::Config("batch_size must be positive".into()));
        }
        for tier in Tier::ALL {
            let capacity = crate::pool::combinations_for(tier);
            if u64::from(self.count(tier)) > capacity {
                return Err(LottoError::Config(format!(
                    "{tier} asks for {} slots but only {capacity} distinct combinations exist",
                    self.count(tier)
                )));
            }
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(10_000, 1, 5, 44, 950)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shape() {
        let config = PoolConfig::default();
        assert_eq!(config.none(), 9_000);
        assert_eq!(Tier::ALL.iter().map(|t| config.count(*t)).sum::<u32>(), 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_overfull_tiers() {
        let config = PoolConfig::new(10, 1, 5, 5, 5);
        assert!(matches!(config.validate(), Err(LottoError::Config(_))));
    }

    #[test]
    fn rejects_second_first_slot() {
        let config = PoolConfig::new(10, 2, 0, 0, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_batch() {
        let config = PoolConfig::default().with_batch_size(0);
        assert!(config.validate().is_err());
    }
}
