//! Data models
//!
//! Catalog and account entities the order engine reads and writes.
//! All values are stored as JSON in the engine's redb tables.

pub mod cart;
pub mod category;
pub mod coupon;
pub mod product;
pub mod user;
pub mod wallet;

// Re-exports
pub use cart::*;
pub use category::*;
pub use coupon::*;
pub use product::*;
pub use user::*;
pub use wallet::*;
