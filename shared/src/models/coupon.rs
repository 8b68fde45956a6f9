//! Coupon Model

use serde::{Deserialize, Serialize};

use crate::types::{Money, Timestamp};

/// Coupon discount kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Fixed,
    Percentage,
}

/// Coupon entity
///
/// `used_count` is only ever changed through the counter ledger, which keeps
/// `used_count <= usage_limit` after every commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Upper-case code, also the storage key
    pub code: String,
    pub discount_type: DiscountType,
    /// Amount for `Fixed`, whole percent for `Percentage`
    pub discount_value: i64,
    #[serde(default)]
    pub min_purchase_amount: Money,
    /// Cap for `Percentage` coupons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<Money>,
    pub usage_limit: u32,
    #[serde(default)]
    pub used_count: u32,
    pub per_user_limit: u32,
    /// Expiry (Unix millis)
    pub expires_at: Timestamp,
    pub is_active: bool,
}

impl Coupon {
    /// Normalize a user-entered code to the storage key form
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }
}
