//! Category Model

use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Category offer kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferType {
    /// Fixed amount off
    Flat,
    /// Whole percent of the category total
    Percent,
}

/// Discount rule attached to a category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryOffer {
    pub offer_type: OfferType,
    /// Amount for `Flat`, whole percent for `Percent`
    pub discount: i64,
    /// Category total required before the offer applies
    #[serde(default)]
    pub min_purchase_amount: Money,
    /// Cap for `Percent` offers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redeemable: Option<Money>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<CategoryOffer>,
}

fn default_true() -> bool {
    true
}
