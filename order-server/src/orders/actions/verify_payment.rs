//! VerifyPayment command handler
//!
//! Captures an online payment whose signature was already checked by the
//! gateway: `Initialized` → `Pending`, payment `Paid`.

use shared::order::{OrderStatus, PaymentStatus, TransactionStatus};

use crate::ledger::transaction;
use crate::orders::state_machine::{refresh_order_status, transition_item};
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

/// VerifyPayment action
#[derive(Debug, Clone)]
pub struct VerifyPaymentAction {
    pub order_id: u64,
    pub provider_payment_id: String,
}

impl CommandHandler for VerifyPaymentAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        // 1. Load order
        let mut order = ctx.load_order_for(self.order_id, &metadata.actor)?;

        // 2. Replayed capture of the same payment is a no-op
        if order.is_paid()
            && order.payment.provider_payment_id.as_deref() == Some(self.provider_payment_id.as_str())
        {
            return Ok(ActionOutcome::skipped(order));
        }
        if order.status != OrderStatus::Initialized {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Pending,
            });
        }

        // 3. Move live items to Pending
        let now = ctx.now();
        for item in order.items.iter_mut().filter(|i| !i.status.is_terminal()) {
            transition_item(item, OrderStatus::Pending, now)?;
        }
        refresh_order_status(&mut order, now);

        // 4. Record the capture
        order.payment.status = PaymentStatus::Paid;
        order.payment.provider_payment_id = Some(self.provider_payment_id.clone());
        // The gateway order was created for the first snapshot's amount
        let first = transaction::first_for(ctx, &order)?;
        order.payment.paid_amount = first.amount;
        order.timeline.paid_at = Some(now);

        transaction::mark_status(ctx, &first.id, TransactionStatus::Success)?;

        // 5. Leave the expiry index and persist
        ctx.storage().clear_initialized(ctx.txn(), order.order_id)?;
        ctx.save_order(&mut order)?;

        Ok(ActionOutcome::changed(order).with_confirmation())
    }
}
