//! CancelItem command handler

use shared::order::OrderStatus;

use crate::orders::removal::{Removal, remove_items};
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

/// CancelItem action
///
/// Cancels one line; the remaining lines are re-priced and the freed-up
/// amount is credited to the wallet when the order was paid.
///
/// Refused while an online order awaits capture: the gateway order was
/// created for the full total, so only the whole order can be cancelled.
#[derive(Debug, Clone)]
pub struct CancelItemAction {
    pub order_id: u64,
    pub item_id: String,
    pub reason: Option<String>,
}

impl CommandHandler for CancelItemAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        // 1. Load order
        let mut order = ctx.load_order_for(self.order_id, &metadata.actor)?;

        // 2. Unpaid online orders are cancelled whole
        if order.status == OrderStatus::Initialized {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        // 3. Remove the line, re-price and refund
        let refunded = remove_items(
            ctx,
            &mut order,
            std::slice::from_ref(&self.item_id),
            Removal::Cancel,
            self.reason.as_deref(),
        )?;
        ctx.save_order(&mut order)?;
        Ok(ActionOutcome::changed(order).with_refund(refunded))
    }
}
