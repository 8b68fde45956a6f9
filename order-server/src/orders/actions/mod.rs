//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use crate::orders::traits::{
    ActionOutcome, CommandContext, CommandHandler, CommandMetadata, OrderError,
};

mod cancel_item;
mod cancel_order;
mod confirm_received;
mod expire_order;
mod place_order;
mod request_return;
mod review_return;
mod update_status;
mod verify_payment;

pub use cancel_item::CancelItemAction;
pub use cancel_order::CancelOrderAction;
pub use confirm_received::ConfirmReceivedAction;
pub use expire_order::ExpireOrderAction;
pub use place_order::PlaceOrderAction;
pub use request_return::RequestReturnAction;
pub use review_return::{ApproveReturnAction, RejectReturnAction};
pub use update_status::UpdateStatusAction;
pub use verify_payment::VerifyPaymentAction;

/// CommandAction enum - dispatches to concrete action implementations
#[derive(Debug, Clone)]
pub enum CommandAction {
    PlaceOrder(PlaceOrderAction),
    VerifyPayment(VerifyPaymentAction),
    CancelOrder(CancelOrderAction),
    CancelItem(CancelItemAction),
    RequestReturn(RequestReturnAction),
    ApproveReturn(ApproveReturnAction),
    RejectReturn(RejectReturnAction),
    ConfirmReceived(ConfirmReceivedAction),
    UpdateStatus(UpdateStatusAction),
    ExpireOrder(ExpireOrderAction),
}

impl CommandAction {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            CommandAction::PlaceOrder(_) => "place_order",
            CommandAction::VerifyPayment(_) => "verify_payment",
            CommandAction::CancelOrder(_) => "cancel_order",
            CommandAction::CancelItem(_) => "cancel_item",
            CommandAction::RequestReturn(_) => "request_return",
            CommandAction::ApproveReturn(_) => "approve_return",
            CommandAction::RejectReturn(_) => "reject_return",
            CommandAction::ConfirmReceived(_) => "confirm_received",
            CommandAction::UpdateStatus(_) => "update_status",
            CommandAction::ExpireOrder(_) => "expire_order",
        }
    }
}

/// Manual implementation of CommandHandler for CommandAction
impl CommandHandler for CommandAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<ActionOutcome, OrderError> {
        match self {
            CommandAction::PlaceOrder(action) => action.execute(ctx, metadata),
            CommandAction::VerifyPayment(action) => action.execute(ctx, metadata),
            CommandAction::CancelOrder(action) => action.execute(ctx, metadata),
            CommandAction::CancelItem(action) => action.execute(ctx, metadata),
            CommandAction::RequestReturn(action) => action.execute(ctx, metadata),
            CommandAction::ApproveReturn(action) => action.execute(ctx, metadata),
            CommandAction::RejectReturn(action) => action.execute(ctx, metadata),
            CommandAction::ConfirmReceived(action) => action.execute(ctx, metadata),
            CommandAction::UpdateStatus(action) => action.execute(ctx, metadata),
            CommandAction::ExpireOrder(action) => action.execute(ctx, metadata),
        }
    }
}
