//! UpdateStatus command handler (admin)
//!
//! Moves an order forward through fulfillment: Processing, Shipped,
//! Delivered. Every item sharing the order's status moves with it.

use shared::order::{Order, OrderStatus, PaymentMethod, PaymentStatus, TransactionStatus};

use crate::ledger::transaction;
use crate::orders::state_machine::{check_transition, stamp_order, transition_item};
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

/// UpdateStatus action
#[derive(Debug, Clone)]
pub struct UpdateStatusAction {
    pub order_id: u64,
    pub status: OrderStatus,
}

impl CommandHandler for UpdateStatusAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        // 1. Only the forward fulfillment states are set directly
        if !matches!(
            self.status,
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        ) {
            return Err(OrderError::Validation(format!(
                "status {} cannot be set directly",
                self.status
            )));
        }

        // 2. Load order and validate the move
        let mut order = ctx.load_order_for(self.order_id, &metadata.actor)?;
        let from = order.status;
        check_transition(from, self.status)?;

        // 3. Items sharing the order status move with it
        let now = ctx.now();
        for item in order.items.iter_mut().filter(|i| i.status == from) {
            transition_item(item, self.status, now)?;
        }
        order.status = self.status;
        stamp_order(&mut order.timeline, self.status, now);

        // 4. Delivery side effects
        if self.status == OrderStatus::Delivered {
            on_delivered(ctx, &mut order)?;
        }

        ctx.save_order(&mut order)?;
        tracing::info!(order_id = order.order_id, from = %from, to = %self.status, "Order status updated");
        Ok(ActionOutcome::changed(order))
    }
}

/// Cash on delivery is collected now, at the order's current total
fn on_delivered(
    ctx: &CommandContext<'_>,
    order: &mut Order,
) -> Result<(), OrderError> {
    if order.payment.method != PaymentMethod::Cod || order.is_paid() {
        return Ok(());
    }
    order.payment.status = PaymentStatus::Paid;
    order.payment.paid_amount = order.price.total;
    order.timeline.paid_at = Some(ctx.now());

    let latest = transaction::latest_for(ctx, order)?;
    if latest.status == TransactionStatus::Pending {
        transaction::mark_status(ctx, &latest.id, TransactionStatus::Success)?;
    }
    Ok(())
}
