//! User Model (the parts the order engine owns)

use serde::{Deserialize, Serialize};

use crate::types::Money;

/// User entity
///
/// `wallet` and `referral_credits` change only through their ledgers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Wallet balance, never negative
    #[serde(default)]
    pub wallet: Money,
    /// Unused referral-bonus credits; one is consumed per order that uses it
    #[serde(default)]
    pub referral_credits: u32,
}
