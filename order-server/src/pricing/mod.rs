//! Pricing Module
//!
//! Prices a cart into an order-ready breakdown. Evaluators are pure
//! functions over amounts and frozen rule snapshots; the engine reads the
//! catalog through [`StoreRead`](crate::orders::storage::StoreRead) and
//! composes them.

mod engine;
mod evaluators;

pub use engine::*;
pub use evaluators::*;

use shared::types::Money;

/// Store-wide pricing knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    /// Flat fee charged below `freeship_min`
    pub delivery_fee: Money,
    /// Post-discount total from which delivery is free
    pub freeship_min: Money,
    /// Referral bonus, whole percent of the remaining total
    pub referral_bonus_percent: u32,
    pub max_referral_bonus: Money,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            delivery_fee: 4_000,
            freeship_min: 50_000,
            referral_bonus_percent: 10,
            max_referral_bonus: 10_000,
        }
    }
}
