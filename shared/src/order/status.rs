//! Status vocabularies
//!
//! Orders and their items share one status vocabulary. The transition rules
//! live in the engine; this module only names the states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order and item status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderStatus {
    /// Online order created, payment not yet captured
    Initialized,
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    #[serde(rename = "Return Requested")]
    ReturnRequested,
    #[serde(rename = "Return Approved")]
    ReturnApproved,
    #[serde(rename = "Return Rejected")]
    ReturnRejected,
}

impl OrderStatus {
    /// Cancelled and Returned remove an item from the priced set for good
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Initialized => "Initialized",
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
            OrderStatus::ReturnRequested => "Return Requested",
            OrderStatus::ReturnApproved => "Return Approved",
            OrderStatus::ReturnRejected => "Return Rejected",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer pays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    /// Store wallet, debited at checkout
    Wallet,
    /// Online gateway, captured after signature verification
    Razorpay,
}

/// Payment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    Unpaid,
}
