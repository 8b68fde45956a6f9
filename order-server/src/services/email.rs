//! Email sender that only logs

use async_trait::async_trait;
use shared::order::Order;

use super::{EmailSender, ServiceError};

/// Writes confirmations to the log instead of a mail server
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), ServiceError> {
        tracing::info!(
            order_id = order.order_id,
            user_id = %order.user_id,
            total = order.price.total,
            items = order.items.len(),
            "Order confirmation sent"
        );
        Ok(())
    }
}
