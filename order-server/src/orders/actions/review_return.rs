//! ApproveReturn / RejectReturn command handlers (admin)

use shared::order::{Order, OrderStatus};

use crate::orders::state_machine::{refresh_order_status, transition_item};
use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

/// Items awaiting `from`, or the one named
///
/// Without an item id, every item currently in `from` is picked; finding
/// none is an invalid transition for the order.
pub(super) fn items_in(
    order: &Order,
    item_id: Option<&str>,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<Vec<usize>, OrderError> {
    if let Some(item_id) = item_id {
        let index = order
            .item_index(item_id)
            .ok_or_else(|| OrderError::ItemNotFound(item_id.to_string()))?;
        return Ok(vec![index]);
    }
    let indices: Vec<usize> = order
        .items
        .iter()
        .enumerate()
        .filter(|(_, i)| i.status == from)
        .map(|(index, _)| index)
        .collect();
    if indices.is_empty() {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to,
        });
    }
    Ok(indices)
}

fn review(
    ctx: &mut CommandContext<'_>,
    metadata: &CommandMetadata,
    order_id: u64,
    item_id: Option<&str>,
    to: OrderStatus,
) -> Result<ActionOutcome, OrderError> {
    // 1. Load order
    let mut order = ctx.load_order_for(order_id, &metadata.actor)?;
    let now = ctx.now();

    // 2. Decide every requested item in scope
    for index in items_in(&order, item_id, OrderStatus::ReturnRequested, to)? {
        transition_item(&mut order.items[index], to, now)?;
    }

    // 3. Aggregate and persist
    refresh_order_status(&mut order, now);
    ctx.save_order(&mut order)?;
    Ok(ActionOutcome::changed(order))
}

/// ApproveReturn action
#[derive(Debug, Clone)]
pub struct ApproveReturnAction {
    pub order_id: u64,
    pub item_id: Option<String>,
}

impl CommandHandler for ApproveReturnAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        review(
            ctx,
            metadata,
            self.order_id,
            self.item_id.as_deref(),
            OrderStatus::ReturnApproved,
        )
    }
}

/// RejectReturn action
#[derive(Debug, Clone)]
pub struct RejectReturnAction {
    pub order_id: u64,
    pub item_id: Option<String>,
}

impl CommandHandler for RejectReturnAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        review(
            ctx,
            metadata,
            self.order_id,
            self.item_id.as_deref(),
            OrderStatus::ReturnRejected,
        )
    }
}
