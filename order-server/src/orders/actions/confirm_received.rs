//! ConfirmReceived command handler (admin)
//!
//! Returned goods arrived: approved items become `Returned`, stock comes
//! back and the refund is credited.

use shared::order::OrderStatus;

use super::review_return::items_in;
use crate::orders::removal::{Removal, remove_items};
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

/// ConfirmReceived action
#[derive(Debug, Clone)]
pub struct ConfirmReceivedAction {
    pub order_id: u64,
    /// `None` confirms every approved item of the order
    pub item_id: Option<String>,
}

impl CommandHandler for ConfirmReceivedAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        // 1. Load order
        let mut order = ctx.load_order_for(self.order_id, &metadata.actor)?;

        // 2. Approved returns in scope
        let item_ids: Vec<String> = items_in(
            &order,
            self.item_id.as_deref(),
            OrderStatus::ReturnApproved,
            OrderStatus::Returned,
        )?
        .into_iter()
        .map(|index| order.items[index].item_id.clone())
        .collect();

        // 3. Back on the shelf, money back to the wallet
        let refunded = remove_items(ctx, &mut order, &item_ids, Removal::Return, None)?;
        ctx.save_order(&mut order)?;
        Ok(ActionOutcome::changed(order).with_refund(refunded))
    }
}
