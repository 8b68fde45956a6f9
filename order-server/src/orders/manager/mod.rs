//! OrdersManager - transaction boundary and public order API
//!
//! Every mutation runs as one [`CommandAction`] inside one redb write
//! transaction. Collaborator calls (address lookup, payment gateway, image
//! signing, email) happen before the transaction opens or after it commits,
//! never in between.
//!
//! # Command Flow
//!
//! ```text
//! execute(action, actor)
//!     ├─ 1. Begin write transaction
//!     ├─ 2. Create CommandContext
//!     ├─ 3. Run the action (sync)
//!     ├─ 4. Commit, or abort on error
//!     ├─ 5. Retry retryable failures (bounded)
//!     └─ 6. Post-commit side effects (confirmation email)
//! ```

mod error;
pub use error::*;

use super::actions::{
    ApproveReturnAction, CancelItemAction, CancelOrderAction, CommandAction,
    ConfirmReceivedAction, ExpireOrderAction, PlaceOrderAction, RejectReturnAction,
    RequestReturnAction, UpdateStatusAction, VerifyPaymentAction,
};
use super::storage::{OrderStorage, StorageError, StoreRead};
use super::traits::{
    ActionOutcome, Actor, CommandContext, CommandHandler, CommandMetadata, OrderError,
};
use crate::core::Config;
use crate::ledger::{stock, transaction, wallet};
use crate::pricing::{PricingConfig, price_cart};
use crate::services::Services;
use shared::error::{AppError, AppResult};
use shared::models::{Cart, CartItem, Coupon, WalletReason, WalletTransaction};
use shared::order::{Order, OrderPrice, OrderStatus, PaymentMethod, Transaction};
use shared::types::Money;

const DEFAULT_MAX_WRITE_RETRIES: u32 = 3;
const DEFAULT_ORDER_EXPIRY_MS: i64 = 15 * 60 * 1000;

/// Checkout input
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub user_id: String,
    pub address_id: String,
    pub payment_method: PaymentMethod,
}

/// Filters for [`OrdersManager::list_orders`]
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub offset: usize,
    /// `None` returns everything after `offset`
    pub limit: Option<usize>,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| order.status == s)
            && self.payment_method.is_none_or(|m| order.payment.method == m)
    }
}

/// OrdersManager for command processing
pub struct OrdersManager {
    storage: OrderStorage,
    pricing: PricingConfig,
    services: Services,
    max_write_retries: u32,
    order_expiry_ms: i64,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &self.storage)
            .field("pricing", &self.pricing)
            .field("max_write_retries", &self.max_write_retries)
            .field("order_expiry_ms", &self.order_expiry_ms)
            .finish()
    }
}

impl OrdersManager {
    pub fn new(storage: OrderStorage, config: &Config, services: Services) -> Self {
        Self {
            storage,
            pricing: config.pricing(),
            services,
            max_write_retries: config.max_write_retries,
            order_expiry_ms: config.order_expiry_secs as i64 * 1000,
        }
    }

    /// Manager with default retry and expiry settings (tests, tools)
    pub fn with_settings(storage: OrderStorage, pricing: PricingConfig, services: Services) -> Self {
        Self {
            storage,
            pricing,
            services,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
            order_expiry_ms: DEFAULT_ORDER_EXPIRY_MS,
        }
    }

    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// How long an online order may wait for payment capture
    pub fn order_expiry_ms(&self) -> i64 {
        self.order_expiry_ms
    }

    // ========== Transaction Boundary ==========

    /// Run `f` inside a write transaction stamped with the current time
    pub fn with_transaction<T>(
        &self,
        label: &str,
        f: impl FnMut(&mut CommandContext<'_>) -> Result<T, OrderError>,
    ) -> ManagerResult<T> {
        self.with_transaction_at(label, shared::util::now_millis(), f)
    }

    /// Run `f` inside a write transaction
    ///
    /// Commits on `Ok`, aborts on `Err`. A write conflict reruns `f` on a
    /// fresh transaction up to `max_write_retries` more times; every other
    /// error is returned after the first attempt.
    pub fn with_transaction_at<T>(
        &self,
        label: &str,
        now: i64,
        mut f: impl FnMut(&mut CommandContext<'_>) -> Result<T, OrderError>,
    ) -> ManagerResult<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let txn = self.storage.begin_write()?;
            let result = {
                let mut ctx = CommandContext::new(&txn, &self.storage, &self.pricing, now);
                f(&mut ctx)
            };

            let err: ManagerError = match result {
                Ok(value) => match txn.commit() {
                    Ok(()) => return Ok(value),
                    Err(e) => StorageError::from(e).into(),
                },
                Err(e) => {
                    if let Err(abort_err) = txn.abort() {
                        tracing::warn!(label, error = %abort_err, "Failed to abort transaction");
                    }
                    e.into()
                }
            };

            if err.is_retryable() && attempt <= self.max_write_retries {
                tracing::warn!(label, attempt, error = %err, "Retrying transaction");
                continue;
            }
            return Err(err);
        }
    }

    /// Execute one action and run its post-commit side effects
    pub fn execute(&self, action: CommandAction, actor: Actor) -> ManagerResult<ActionOutcome> {
        let metadata = CommandMetadata::new(actor);
        tracing::debug!(
            command_id = %metadata.command_id,
            action = action.name(),
            actor = ?metadata.actor,
            "Executing order action"
        );
        let outcome = self.with_transaction(action.name(), |ctx| action.execute(ctx, &metadata))?;

        if outcome.send_confirmation {
            self.spawn_confirmation(outcome.order.clone());
        }
        Ok(outcome)
    }

    /// Fire-and-forget confirmation email
    fn spawn_confirmation(&self, order: Order) {
        let email = self.services.email.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = email.send_order_confirmation(&order).await {
                        tracing::warn!(order_id = order.order_id, error = %e, "Order confirmation email failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    order_id = order.order_id,
                    "No async runtime, order confirmation not sent"
                );
            }
        }
    }

    // ========== Checkout ==========

    /// Place an order from the user's cart
    pub async fn place_order(&self, request: PlaceOrderRequest) -> AppResult<Order> {
        let shipping_address = self
            .services
            .addresses
            .shipping_address(&request.address_id, &request.user_id)
            .await
            .map_err(|e| ManagerError::Internal(e.to_string()))?
            .ok_or_else(|| ManagerError::AddressNotFound(request.address_id.clone()))?;

        // The gateway order exists before our transaction opens
        let (provider_order_id, expected_total) =
            if request.payment_method == PaymentMethod::Razorpay {
                let price = self.preview_price(&request.user_id)?;
                let receipt = format!("cart-{}", request.user_id);
                let provider_order = self
                    .services
                    .payments
                    .create_provider_order(price.total, &receipt)
                    .await
                    .map_err(|e| ManagerError::Gateway(e.to_string()))?;
                (Some(provider_order.id), Some(price.total))
            } else {
                (None, None)
            };

        let action = CommandAction::PlaceOrder(PlaceOrderAction {
            user_id: request.user_id.clone(),
            payment_method: request.payment_method,
            shipping_address,
            provider_order_id,
            expected_total,
        });
        let outcome = self.execute(action, Actor::Customer(request.user_id))?;
        tracing::info!(
            order_id = outcome.order.order_id,
            total = outcome.order.price.total,
            method = ?outcome.order.payment.method,
            "Order placed"
        );
        Ok(self.sign_images(outcome.order).await)
    }

    /// Capture an online payment after checking the gateway signature
    pub async fn verify_online_order(
        &self,
        order_id: u64,
        payment_id: &str,
        signature: &str,
    ) -> AppResult<Order> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        let provider_order_id = order
            .payment
            .provider_order_id
            .as_deref()
            .ok_or(OrderError::PaymentVerificationFailed(order_id))?;

        if !self
            .services
            .payments
            .verify_signature(provider_order_id, payment_id, signature)
            .await
        {
            tracing::warn!(order_id, payment_id, "Payment signature rejected");
            return Err(OrderError::PaymentVerificationFailed(order_id).into());
        }

        let action = CommandAction::VerifyPayment(VerifyPaymentAction {
            order_id,
            provider_payment_id: payment_id.to_string(),
        });
        let outcome = self.execute(action, Actor::System)?;
        Ok(self.sign_images(outcome.order).await)
    }

    /// Price the user's cart without touching anything
    pub fn preview_price(&self, user_id: &str) -> AppResult<OrderPrice> {
        let read_txn = self.storage.begin_read()?;
        let cart = read_txn
            .cart(user_id)?
            .filter(|c| !c.is_empty())
            .ok_or(OrderError::CartEmpty)?;
        let user = read_txn
            .user(user_id)?
            .ok_or_else(|| OrderError::UserNotFound(user_id.to_string()))?;
        let quote = price_cart(
            &read_txn,
            &cart,
            &user,
            &self.pricing,
            shared::util::now_millis(),
        )?;
        Ok(quote.price)
    }

    // ========== Cancellation and Returns ==========

    pub async fn cancel_order(
        &self,
        actor: Actor,
        order_id: u64,
        reason: Option<String>,
    ) -> AppResult<Order> {
        let action = CommandAction::CancelOrder(CancelOrderAction { order_id, reason });
        self.run_for_client(action, actor).await
    }

    pub async fn cancel_item(
        &self,
        actor: Actor,
        order_id: u64,
        item_id: &str,
        reason: Option<String>,
    ) -> AppResult<Order> {
        let action = CommandAction::CancelItem(CancelItemAction {
            order_id,
            item_id: item_id.to_string(),
            reason,
        });
        self.run_for_client(action, actor).await
    }

    /// Ask to return one delivered item, or the whole order when `item_id` is `None`
    pub async fn request_return(
        &self,
        actor: Actor,
        order_id: u64,
        item_id: Option<&str>,
        reason: &str,
    ) -> AppResult<Order> {
        let action = CommandAction::RequestReturn(RequestReturnAction {
            order_id,
            item_id: item_id.map(str::to_string),
            reason: reason.to_string(),
        });
        self.run_for_client(action, actor).await
    }

    pub async fn approve_return(&self, order_id: u64, item_id: Option<&str>) -> AppResult<Order> {
        let action = CommandAction::ApproveReturn(ApproveReturnAction {
            order_id,
            item_id: item_id.map(str::to_string),
        });
        self.run_for_client(action, Actor::Admin).await
    }

    pub async fn reject_return(&self, order_id: u64, item_id: Option<&str>) -> AppResult<Order> {
        let action = CommandAction::RejectReturn(RejectReturnAction {
            order_id,
            item_id: item_id.map(str::to_string),
        });
        self.run_for_client(action, Actor::Admin).await
    }

    /// Returned goods for one approved item arrived: refund it
    pub async fn confirm_item_received(&self, order_id: u64, item_id: &str) -> AppResult<Order> {
        let action = CommandAction::ConfirmReceived(ConfirmReceivedAction {
            order_id,
            item_id: Some(item_id.to_string()),
        });
        self.run_for_client(action, Actor::Admin).await
    }

    /// Returned goods for every approved item arrived
    pub async fn confirm_order_received(&self, order_id: u64) -> AppResult<Order> {
        let action = CommandAction::ConfirmReceived(ConfirmReceivedAction {
            order_id,
            item_id: None,
        });
        self.run_for_client(action, Actor::Admin).await
    }

    pub async fn update_order_status(&self, order_id: u64, status: OrderStatus) -> AppResult<Order> {
        let action = CommandAction::UpdateStatus(UpdateStatusAction { order_id, status });
        self.run_for_client(action, Actor::Admin).await
    }

    async fn run_for_client(&self, action: CommandAction, actor: Actor) -> AppResult<Order> {
        let outcome = self.execute(action, actor)?;
        Ok(self.sign_images(outcome.order).await)
    }

    // ========== Expiry ==========

    /// Cancel online orders still unpaid `order_expiry_ms` after placement
    ///
    /// One transaction per order. Failures are logged and the sweep moves on;
    /// returns how many orders were actually expired.
    pub fn expire_initialized_orders(&self, now: i64) -> AppResult<usize> {
        let candidates = self.storage.initialized_orders()?;
        let mut expired = 0;

        for (order_id, created_at) in candidates {
            if created_at + self.order_expiry_ms > now {
                continue;
            }
            let action = ExpireOrderAction { order_id };
            let metadata = CommandMetadata::new(Actor::System);
            match self.with_transaction_at("expire_order", now, |ctx| {
                action.execute(ctx, &metadata)
            }) {
                Ok(outcome) if outcome.applied => expired += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(order_id, error = %e, "Failed to expire order");
                }
            }
        }

        if expired > 0 {
            tracing::info!(expired, "Expired unpaid online orders");
        }
        Ok(expired)
    }

    // ========== Cart ==========

    pub fn get_cart(&self, user_id: &str) -> AppResult<Cart> {
        Ok(self
            .storage
            .get_cart(user_id)?
            .unwrap_or_else(|| Cart::new(user_id)))
    }

    /// Add units of a product size, merging with an existing line
    pub fn add_to_cart(
        &self,
        user_id: &str,
        product_id: &str,
        size: &str,
        quantity: u32,
    ) -> AppResult<Cart> {
        if quantity == 0 {
            return Err(AppError::validation("quantity must be positive"));
        }

        let cart = self.with_transaction("add_to_cart", |ctx| {
            let txn = ctx.txn();
            ctx.load_user(user_id)?;
            let product = txn
                .product(product_id)?
                .filter(|p| p.is_active)
                .ok_or_else(|| OrderError::ProductNotFound(product_id.to_string()))?;

            let mut cart = txn.cart(user_id)?.unwrap_or_else(|| Cart::new(user_id));
            let in_cart = cart
                .items
                .iter()
                .find(|i| i.product_id == product_id && i.size == size)
                .map(|i| i.quantity)
                .unwrap_or(0);
            let wanted = in_cart
                .checked_add(quantity)
                .ok_or_else(|| OrderError::Validation("quantity too large".to_string()))?;
            let available = stock::stock_level(txn, product_id, size)?;
            if u64::from(wanted) > available {
                return Err(OrderError::InsufficientStock {
                    product_id: product_id.to_string(),
                    size: size.to_string(),
                    requested: wanted,
                    available,
                });
            }

            let price = product.effective_price();
            match cart
                .items
                .iter_mut()
                .find(|i| i.product_id == product_id && i.size == size)
            {
                Some(line) => {
                    line.quantity = wanted;
                    line.price = price;
                }
                None => cart.items.push(CartItem {
                    product_id: product_id.to_string(),
                    size: size.to_string(),
                    quantity,
                    price,
                }),
            }
            ctx.storage().put_cart(txn, &cart)?;
            Ok(cart)
        })?;
        Ok(cart)
    }

    /// Attach a coupon to the cart after checking it against the cart as priced now
    pub fn apply_coupon(&self, user_id: &str, code: &str) -> AppResult<Cart> {
        let code = Coupon::normalize_code(code);
        if code.is_empty() {
            return Err(AppError::validation("coupon code is required"));
        }

        let cart = self.with_transaction("apply_coupon", |ctx| {
            let txn = ctx.txn();
            if txn.coupon(&code)?.is_none() {
                return Err(OrderError::InvalidCoupon(code.clone()));
            }
            let mut cart = txn
                .cart(user_id)?
                .filter(|c| !c.is_empty())
                .ok_or(OrderError::CartEmpty)?;
            let user = ctx.load_user(user_id)?;

            cart.coupon_code = Some(code.clone());
            price_cart(txn, &cart, &user, ctx.pricing(), ctx.now())?;
            ctx.storage().put_cart(txn, &cart)?;
            Ok(cart)
        })?;
        tracing::debug!(user_id, coupon = %code, "Coupon applied to cart");
        Ok(cart)
    }

    pub fn remove_coupon(&self, user_id: &str) -> AppResult<Cart> {
        let cart = self.with_transaction("remove_coupon", |ctx| {
            let txn = ctx.txn();
            let mut cart = txn.cart(user_id)?.unwrap_or_else(|| Cart::new(user_id));
            if cart.coupon_code.take().is_some() {
                ctx.storage().put_cart(txn, &cart)?;
            }
            Ok(cart)
        })?;
        Ok(cart)
    }

    // ========== Wallet and Stock ==========

    pub fn top_up_wallet(&self, user_id: &str, amount: Money) -> AppResult<WalletTransaction> {
        let entry = self.with_transaction("top_up_wallet", |ctx| {
            wallet::credit(ctx, user_id, amount, WalletReason::TopUp, None)
        })?;
        tracing::info!(user_id, amount, balance = entry.balance_after, "Wallet topped up");
        Ok(entry)
    }

    /// Add units to a product size
    pub fn restock(&self, product_id: &str, size: &str, units: u32) -> AppResult<u64> {
        let level = self.with_transaction("restock", |ctx| {
            stock::restore_stock(ctx, product_id, size, units)
        })?;
        tracing::info!(product_id, size, units, level, "Stock replenished");
        Ok(level)
    }

    /// Stocktake: overwrite the units on hand with a counted level
    pub fn stock_take(&self, product_id: &str, size: &str, units: u64) -> AppResult<()> {
        self.with_transaction("stock_take", |ctx| {
            stock::set_stock(ctx, product_id, size, units)
        })?;
        tracing::info!(product_id, size, units, "Stock counted");
        Ok(())
    }

    pub fn wallet_history(&self, user_id: &str) -> AppResult<Vec<WalletTransaction>> {
        Ok(wallet::history(&self.storage, user_id)?)
    }

    // ========== Queries ==========

    /// Money-movement rows of an order, oldest first
    pub fn order_transactions(&self, order_id: u64) -> AppResult<Vec<Transaction>> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        Ok(transaction::for_order(&self.storage, &order)?)
    }

    /// Order details; a customer only sees their own orders
    pub async fn get_order_details(&self, order_id: u64, user_id: Option<&str>) -> AppResult<Order> {
        let order = self
            .storage
            .get_order(order_id)?
            .filter(|o| user_id.is_none_or(|u| o.user_id == u))
            .ok_or(OrderError::OrderNotFound(order_id))?;
        Ok(self.sign_images(order).await)
    }

    /// Orders matching `filter`, newest first
    pub async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let read_txn = self.storage.begin_read()?;
        let mut ids = match filter.user_id.as_deref() {
            Some(user_id) => read_txn.read_user_order_ids(user_id)?,
            None => self.storage.order_ids()?,
        };
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut orders = Vec::new();
        for id in ids {
            if let Some(order) = read_txn.read_order(id)?
                && filter.matches(&order)
            {
                orders.push(order);
            }
        }

        let page = orders
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX));
        let mut signed = Vec::new();
        for order in page {
            signed.push(self.sign_images(order).await);
        }
        Ok(signed)
    }

    /// Replace each item's image key with a signed URL
    pub async fn sign_images(&self, mut order: Order) -> Order {
        for item in order.items.iter_mut() {
            if let Some(key) = item.image.take() {
                item.image = self.services.images.signed_url(&key).await;
            }
        }
        order
    }
}

#[cfg(test)]
mod tests;
