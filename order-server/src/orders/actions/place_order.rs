//! PlaceOrder command handler
//!
//! Turns the user's cart into an order in one transaction: pricing, stock,
//! wallet debit, first transaction row, coupon usage, referral credit and
//! cart removal.

use shared::models::WalletReason;
use shared::order::{
    Order, OrderStatus, OrderTimeline, Payment, PaymentMethod, PaymentStatus, TransactionReason,
    TransactionStatus, TransactionType,
};
use shared::types::{Money, ShippingAddress};

use crate::ledger::{counter, stock, transaction, wallet};
use crate::orders::storage::{ORDER_ID_SEQUENCE, StoreRead};
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};
use crate::pricing::price_cart;

/// PlaceOrder action
#[derive(Debug, Clone)]
pub struct PlaceOrderAction {
    pub user_id: String,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    /// Gateway order created before the transaction (online payments)
    pub provider_order_id: Option<String>,
    /// Total the gateway order was created for; the cart must still price to it
    pub expected_total: Option<Money>,
}

impl CommandHandler for PlaceOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        let now = ctx.now();

        // 1. Price the cart as it is inside this transaction
        let cart = ctx
            .txn()
            .cart(&self.user_id)?
            .filter(|c| !c.is_empty())
            .ok_or(OrderError::CartEmpty)?;
        let user = ctx.load_user(&self.user_id)?;
        let quote = price_cart(ctx.txn(), &cart, &user, ctx.pricing(), now)?;
        if let Some(expected) = self.expected_total
            && expected != quote.price.total
        {
            return Err(OrderError::Validation(format!(
                "cart total changed from {expected} to {} while paying",
                quote.price.total
            )));
        }

        // 2. Reserve stock
        for line in &quote.lines {
            stock::reduce_stock(ctx, &line.product.id, &line.size, line.quantity)?;
        }

        // 3. Build the order
        let order_id = ctx.storage().next_sequence(ctx.txn(), ORDER_ID_SEQUENCE)?;
        let status = match self.payment_method {
            PaymentMethod::Razorpay => OrderStatus::Initialized,
            PaymentMethod::Cod | PaymentMethod::Wallet => OrderStatus::Pending,
        };
        let mut order = Order {
            order_id,
            user_id: self.user_id.clone(),
            status,
            payment: Payment {
                method: self.payment_method,
                status: PaymentStatus::Pending,
                provider_order_id: self.provider_order_id.clone(),
                provider_payment_id: None,
                paid_amount: 0,
                refunded_amount: 0,
            },
            price: quote.price.clone(),
            items: quote.freeze_items(status),
            shipping_address: self.shipping_address.clone(),
            transaction_ids: Vec::new(),
            timeline: OrderTimeline {
                placed_at: now,
                ..Default::default()
            },
            cancel_reason: None,
            return_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        // 4. Collect wallet payments up front
        let total = order.price.total;
        if self.payment_method == PaymentMethod::Wallet {
            if total > 0 {
                wallet::debit(
                    ctx,
                    &self.user_id,
                    total,
                    WalletReason::OrderPayment,
                    Some(order_id),
                )?;
            }
            order.payment.status = PaymentStatus::Paid;
            order.payment.paid_amount = total;
            order.timeline.paid_at = Some(now);
        }

        // 5. First transaction row: the original priced snapshot
        let first_status = if order.is_paid() {
            TransactionStatus::Success
        } else {
            TransactionStatus::Pending
        };
        transaction::record(
            ctx,
            &mut order,
            TransactionType::Debit,
            TransactionReason::OrderPlaced,
            first_status,
            total,
        )?;

        // 6. Counters and cart
        if let Some(code) = order.coupon_code().map(str::to_string) {
            counter::apply_coupon_usage(ctx, &code, order_id)?;
        }
        if quote.uses_referral() {
            counter::consume_referral_credit(ctx, &self.user_id, order_id)?;
        }
        ctx.storage().remove_cart(ctx.txn(), &self.user_id)?;

        if status == OrderStatus::Initialized {
            ctx.storage().mark_initialized(ctx.txn(), order_id, now)?;
        }
        ctx.save_order(&mut order)?;

        let outcome = ActionOutcome::changed(order);
        Ok(if status == OrderStatus::Initialized {
            outcome
        } else {
            outcome.with_confirmation()
        })
    }
}
