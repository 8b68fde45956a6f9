//! Money-movement transactions
//!
//! Rows are append-only: a superseded transaction changes `status`, it is
//! never deleted or re-priced.

use serde::{Deserialize, Serialize};

use super::status::PaymentMethod;
use super::types::OrderPrice;
use crate::types::{Money, Timestamp};

/// Direction of money, from the store's point of view
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money returned to the customer
    Credit,
    /// Money charged to the customer
    Debit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionReason {
    OrderPlaced,
    ItemCancelled,
    ItemReturned,
    OrderCancelled,
    OrderReturned,
    OrderExpired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Refunded,
    Cancelled,
}

/// One money-movement record for an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub order_id: u64,
    pub user_id: String,
    pub kind: TransactionType,
    pub reason: TransactionReason,
    pub status: TransactionStatus,
    pub payment_method: PaymentMethod,
    /// For debits: the order value at this point. For credits: the amount refunded.
    pub amount: Money,
    /// Full price snapshot at creation
    pub price: OrderPrice,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
