//! Common types for the shared crate

use serde::{Deserialize, Serialize};

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// Monetary amount in the smallest currency unit (paise for INR)
///
/// Never a float: percentages are computed through `rust_decimal` by the
/// engine and rounded back to whole units.
pub type Money = i64;

/// Shipping address as resolved by the address book at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingAddress {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}
