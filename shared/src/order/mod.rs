//! Order domain types
//!
//! - Status vocabularies for orders, items and payments
//! - The order aggregate with its frozen price and rule snapshots
//! - Append-only money-movement transactions

pub mod status;
pub mod transaction;
pub mod types;

// Re-exports
pub use status::{OrderStatus, PaymentMethod, PaymentStatus};
pub use transaction::{Transaction, TransactionReason, TransactionStatus, TransactionType};
pub use types::*;
