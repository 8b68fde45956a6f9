//! Wallet ledger rows

use serde::{Deserialize, Serialize};

use crate::order::{TransactionStatus, TransactionType};
use crate::types::{Money, Timestamp};

/// Why the wallet balance moved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletReason {
    TopUp,
    OrderPayment,
    OrderRefund,
}

/// Append-only wallet ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletTransaction {
    pub id: String,
    pub user_id: String,
    pub kind: TransactionType,
    pub amount: Money,
    pub reason: WalletReason,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    pub balance_after: Money,
    pub created_at: Timestamp,
}
