//! Action plumbing: context, metadata, handler trait and action errors

use redb::WriteTransaction;
use shared::error::ErrorCode;
use shared::models::User;
use shared::order::{Order, OrderStatus, Transaction};
use shared::types::Money;
use thiserror::Error;

use super::manager::classify_storage_error;
use super::storage::{OrderStorage, StorageError, StoreRead};
use crate::pricing::PricingConfig;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while an action runs inside a write transaction
///
/// Any of these aborts the transaction, so nothing an action did before
/// failing is ever committed.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    #[error("Order item not found: {0}")]
    ItemNotFound(String),

    #[error("Cart is empty")]
    CartEmpty,

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Insufficient stock for {product_id} ({size}): requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        size: String,
        requested: u32,
        available: u64,
    },

    #[error("Insufficient wallet balance: required {required}, available {available}")]
    InsufficientBalance { required: Money, available: Money },

    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error("Coupon expired: {0}")]
    CouponExpired(String),

    #[error("Coupon usage limit reached: {0}")]
    CouponLimitReached(String),

    #[error("Coupon {code} requires a minimum purchase of {required}")]
    MinPurchaseRequired { code: String, required: Money },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Payment verification failed for order {0}")]
    PaymentVerificationFailed(u64),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl OrderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            OrderError::ItemNotFound(_) => ErrorCode::OrderItemNotFound,
            OrderError::CartEmpty => ErrorCode::CartEmpty,
            OrderError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            OrderError::UserNotFound(_) => ErrorCode::UserNotFound,
            OrderError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            OrderError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            OrderError::InvalidCoupon(_) => ErrorCode::InvalidCoupon,
            OrderError::CouponExpired(_) => ErrorCode::CouponExpired,
            OrderError::CouponLimitReached(_) => ErrorCode::CouponLimitReached,
            OrderError::MinPurchaseRequired { .. } => ErrorCode::MinPurchaseRequired,
            OrderError::InvalidTransition { .. } => ErrorCode::InvalidStatusTransition,
            OrderError::PaymentVerificationFailed(_) => ErrorCode::PaymentVerificationFailed,
            OrderError::Validation(_) => ErrorCode::ValidationFailed,
            OrderError::Storage(e) => classify_storage_error(e),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A customer, scoped to their own orders
    Customer(String),
    /// Store staff
    Admin,
    /// Background jobs
    System,
}

/// Command metadata
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub actor: Actor,
    pub timestamp: i64,
}

impl CommandMetadata {
    pub fn new(actor: Actor) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            actor,
            timestamp: shared::util::now_millis(),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// Everything an action may touch, bound to one write transaction
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a OrderStorage,
    pricing: &'a PricingConfig,
    now: i64,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        txn: &'a WriteTransaction,
        storage: &'a OrderStorage,
        pricing: &'a PricingConfig,
        now: i64,
    ) -> Self {
        Self {
            txn,
            storage,
            pricing,
            now,
        }
    }

    pub fn txn(&self) -> &'a WriteTransaction {
        self.txn
    }

    pub fn storage(&self) -> &'a OrderStorage {
        self.storage
    }

    pub fn pricing(&self) -> &'a PricingConfig {
        self.pricing
    }

    /// Wall-clock time the action runs at (Unix millis)
    pub fn now(&self) -> i64 {
        self.now
    }

    /// Load an order fresh from this transaction
    pub fn load_order(&self, order_id: u64) -> Result<Order, OrderError> {
        self.txn
            .read_order(order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Load an order the actor is allowed to see
    ///
    /// A customer asking for someone else's order gets `OrderNotFound`.
    pub fn load_order_for(&self, order_id: u64, actor: &Actor) -> Result<Order, OrderError> {
        let order = self.load_order(order_id)?;
        match actor {
            Actor::Customer(user_id) if *user_id != order.user_id => {
                Err(OrderError::OrderNotFound(order_id))
            }
            _ => Ok(order),
        }
    }

    pub fn save_order(&self, order: &mut Order) -> Result<(), OrderError> {
        order.updated_at = self.now;
        self.storage.save_order(self.txn, order)?;
        Ok(())
    }

    pub fn load_user(&self, user_id: &str) -> Result<User, OrderError> {
        self.txn
            .user(user_id)?
            .ok_or_else(|| OrderError::UserNotFound(user_id.to_string()))
    }

    pub fn load_transaction(&self, transaction_id: &str) -> Result<Transaction, OrderError> {
        self.txn.transaction(transaction_id)?.ok_or_else(|| {
            OrderError::Validation(format!("transaction {transaction_id} is missing"))
        })
    }
}

// ============================================================================
// Handler
// ============================================================================

/// What an action produced
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub order: Order,
    /// Amount credited back to the customer by this action
    pub refunded: Money,
    /// Send the order confirmation once committed
    pub send_confirmation: bool,
    /// False when the action found nothing to do
    pub applied: bool,
}

impl ActionOutcome {
    pub fn changed(order: Order) -> Self {
        Self {
            order,
            refunded: 0,
            send_confirmation: false,
            applied: true,
        }
    }

    pub fn skipped(order: Order) -> Self {
        Self {
            applied: false,
            ..Self::changed(order)
        }
    }

    pub fn with_refund(mut self, refunded: Money) -> Self {
        self.refunded = refunded;
        self
    }

    pub fn with_confirmation(mut self) -> Self {
        self.send_confirmation = true;
        self
    }
}

/// Command handler trait
///
/// Handlers are synchronous: they run inside a redb write transaction and
/// must never wait on the network.
pub trait CommandHandler {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError>;
}
