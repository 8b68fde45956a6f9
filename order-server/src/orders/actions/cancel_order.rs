//! CancelOrder command handler
//!
//! Cancels every live item at once. Allowed while the order has not
//! shipped.

use shared::order::OrderStatus;

use crate::orders::removal::{Removal, remove_items};
use crate::orders::state_machine::check_transition;
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

/// CancelOrder action
#[derive(Debug, Clone)]
pub struct CancelOrderAction {
    pub order_id: u64,
    pub reason: Option<String>,
}

impl CommandHandler for CancelOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        // 1. Load order and check it may still be cancelled
        let mut order = ctx.load_order_for(self.order_id, &metadata.actor)?;
        check_transition(order.status, OrderStatus::Cancelled)?;

        // 2. Remove every live item; the last one restores the first snapshot
        let was_initialized = order.status == OrderStatus::Initialized;
        let item_ids: Vec<String> = order.active_items().map(|i| i.item_id.clone()).collect();
        let refunded = remove_items(
            ctx,
            &mut order,
            &item_ids,
            Removal::Cancel,
            self.reason.as_deref(),
        )?;
        order.cancel_reason = self.reason.clone();

        // 3. An unpaid online order no longer needs expiring
        if was_initialized {
            ctx.storage().clear_initialized(ctx.txn(), order.order_id)?;
        }
        ctx.save_order(&mut order)?;
        Ok(ActionOutcome::changed(order).with_refund(refunded))
    }
}
