//! Ledgers
//!
//! Every balance-like value the engine owns (stock, wallet, coupon usage,
//! referral credits, order money movement) changes only through these
//! functions, inside the caller's write transaction. Wallet and counter
//! mutations append an immutable row next to the scalar they move.

pub mod counter;
pub mod stock;
pub mod transaction;
pub mod wallet;

pub use counter::{CounterEntry, CounterReason};
