//! RequestReturn command handler
//!
//! A customer asks to send back one delivered item, or every live item of
//! a delivered order. No money moves until the goods are received.

use shared::order::{Order, OrderStatus};

use crate::orders::state_machine::{refresh_order_status, transition_item};
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

/// RequestReturn action
#[derive(Debug, Clone)]
pub struct RequestReturnAction {
    pub order_id: u64,
    /// `None` returns the whole order
    pub item_id: Option<String>,
    pub reason: String,
}

impl CommandHandler for RequestReturnAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        // 1. Validate input
        if self.reason.trim().is_empty() {
            return Err(OrderError::Validation("return reason is required".to_string()));
        }

        // 2. Load order
        let mut order = ctx.load_order_for(self.order_id, &metadata.actor)?;
        let now = ctx.now();

        // 3. Flag the targeted items
        let indices = target_items(&order, self.item_id.as_deref(), OrderStatus::ReturnRequested)?;
        for index in indices {
            let item = &mut order.items[index];
            transition_item(item, OrderStatus::ReturnRequested, now)?;
            item.return_reason = Some(self.reason.clone());
        }
        if self.item_id.is_none() {
            order.return_reason = Some(self.reason.clone());
        }

        // 4. Aggregate and persist
        refresh_order_status(&mut order, now);
        ctx.save_order(&mut order)?;
        Ok(ActionOutcome::changed(order))
    }
}

/// Item positions an order- or item-level request applies to
///
/// For a single item the item must exist. For the whole order every live
/// item is targeted and the order itself must allow the move.
pub(super) fn target_items(
    order: &Order,
    item_id: Option<&str>,
    to: OrderStatus,
) -> Result<Vec<usize>, OrderError> {
    match item_id {
        Some(item_id) => order
            .item_index(item_id)
            .map(|i| vec![i])
            .ok_or_else(|| OrderError::ItemNotFound(item_id.to_string())),
        None => {
            crate::orders::state_machine::check_transition(order.status, to)?;
            Ok(order
                .items
                .iter()
                .enumerate()
                .filter(|(_, i)| !i.status.is_terminal())
                .map(|(index, _)| index)
                .collect())
        }
    }
}
