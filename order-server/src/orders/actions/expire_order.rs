//! ExpireOrder command handler
//!
//! Cancels an online order whose payment was never captured. Idempotent:
//! an order that already left `Initialized` is only dropped from the sweep
//! index.

use shared::order::{
    OrderStatus, PaymentStatus, TransactionReason, TransactionStatus, TransactionType,
};

use crate::ledger::{counter, stock, transaction};
use crate::orders::state_machine::{refresh_order_status, transition_item};
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

const EXPIRED_REASON: &str = "Payment not completed in time";

/// ExpireOrder action
#[derive(Debug, Clone)]
pub struct ExpireOrderAction {
    pub order_id: u64,
}

impl CommandHandler for ExpireOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        // 1. Drop from the sweep index; skip orders that already moved on
        ctx.storage().clear_initialized(ctx.txn(), self.order_id)?;
        let mut order = ctx.load_order(self.order_id)?;
        if order.status != OrderStatus::Initialized {
            return Ok(ActionOutcome::skipped(order));
        }

        // 2. Cancel live items and put their stock back
        let now = ctx.now();
        let mut expired = Vec::with_capacity(order.items.len());
        for (index, item) in order.items.iter_mut().enumerate() {
            if item.status.is_terminal() {
                continue;
            }
            transition_item(item, OrderStatus::Cancelled, now)?;
            item.cancel_reason = Some(EXPIRED_REASON.to_string());
            expired.push(index);
        }
        stock::restore_all_stock(ctx, expired.iter().map(|&i| &order.items[i]))?;
        refresh_order_status(&mut order, now);

        // 3. Release the coupon use
        if let Some(code) = order.coupon_code().map(str::to_string) {
            counter::release_coupon_usage(ctx, &code, order.order_id)?;
        }

        // 4. Failed payment rows
        transaction::supersede_latest(ctx, &order, TransactionStatus::Failed)?;
        let total = order.price.total;
        transaction::record(
            ctx,
            &mut order,
            TransactionType::Debit,
            TransactionReason::OrderExpired,
            TransactionStatus::Failed,
            total,
        )?;
        order.payment.status = PaymentStatus::Failed;
        order.cancel_reason = Some(EXPIRED_REASON.to_string());

        ctx.save_order(&mut order)?;
        tracing::info!(order_id = order.order_id, "Expired unpaid online order");
        Ok(ActionOutcome::changed(order))
    }
}
