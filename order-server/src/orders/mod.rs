//! Order engine
//!
//! - **manager**: OrdersManager, the transaction boundary and public API
//! - **actions**: one command handler per mutation
//! - **storage**: redb persistence for orders, catalog and ledgers
//! - **state_machine**: order and item status transitions
//! - **refund**: discount retention when items leave an order
//! - **removal**: cancel/return plumbing shared by the actions
//! - **expiry_sweeper**: background expiry of unpaid online orders
//!
//! # Data Flow
//!
//! ```text
//! caller → OrdersManager ─┬─ collaborators (address, gateway)   before
//!                         ├─ write txn: action → ledgers → order
//!                         └─ collaborators (email, images)      after
//! ```

pub mod actions;
pub mod expiry_sweeper;
pub mod manager;
pub mod money;
pub mod refund;
pub mod removal;
pub mod state_machine;
pub mod storage;
pub mod traits;

// Re-exports
pub use expiry_sweeper::ExpirySweeper;
pub use manager::{ManagerError, OrderFilter, OrdersManager, PlaceOrderRequest};
pub use storage::{OrderStorage, StorageError};
pub use traits::{Actor, OrderError};

// Re-export shared types for convenience
pub use shared::order::{Order, OrderPrice, OrderStatus, PaymentMethod, PaymentStatus};
