//! Shared types for the storefront order engine
//!
//! Domain shapes used by the engine and by whatever transport sits in front
//! of it: orders, items, price snapshots, transactions, catalog models and
//! the unified error taxonomy.

pub mod error;
pub mod models;
pub mod order;
pub mod types;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
pub use types::{Money, ShippingAddress, Timestamp};
