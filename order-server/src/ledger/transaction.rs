//! Transaction ledger: money movements per order
//!
//! Rows are append-only. Superseding a row changes its status; its amount
//! and price snapshot stay as they were written.

use shared::order::{Order, Transaction, TransactionReason, TransactionStatus, TransactionType};
use shared::types::Money;

use crate::orders::storage::{OrderStorage, StorageResult};
use crate::orders::traits::{CommandContext, OrderError};

/// Append a row snapshotting `order.price` and link it to the order
///
/// The order itself is not saved here; the caller persists it with the
/// rest of its changes.
pub fn record(
    ctx: &CommandContext<'_>,
    order: &mut Order,
    kind: TransactionType,
    reason: TransactionReason,
    status: TransactionStatus,
    amount: Money,
) -> Result<Transaction, OrderError> {
    let now = ctx.now();
    let transaction = Transaction {
        id: shared::util::new_id(),
        order_id: order.order_id,
        user_id: order.user_id.clone(),
        kind,
        reason,
        status,
        payment_method: order.payment.method,
        amount,
        price: order.price.clone(),
        created_at: now,
        updated_at: now,
    };
    ctx.storage().put_transaction(ctx.txn(), &transaction)?;
    order.transaction_ids.push(transaction.id.clone());

    tracing::debug!(
        order_id = order.order_id,
        transaction_id = %transaction.id,
        kind = ?kind,
        reason = ?reason,
        amount,
        "Transaction recorded"
    );
    Ok(transaction)
}

/// Change the status of an existing row
pub fn mark_status(
    ctx: &CommandContext<'_>,
    transaction_id: &str,
    status: TransactionStatus,
) -> Result<Transaction, OrderError> {
    let mut transaction = ctx.load_transaction(transaction_id)?;
    transaction.status = status;
    transaction.updated_at = ctx.now();
    ctx.storage().put_transaction(ctx.txn(), &transaction)?;
    Ok(transaction)
}

/// The order's original priced snapshot
pub fn first_for(ctx: &CommandContext<'_>, order: &Order) -> Result<Transaction, OrderError> {
    let id = order.first_transaction_id().ok_or_else(|| {
        OrderError::Validation(format!("order {} has no transactions", order.order_id))
    })?;
    ctx.load_transaction(id)
}

/// The order's most recent row
pub fn latest_for(ctx: &CommandContext<'_>, order: &Order) -> Result<Transaction, OrderError> {
    let id = order.latest_transaction_id().ok_or_else(|| {
        OrderError::Validation(format!("order {} has no transactions", order.order_id))
    })?;
    ctx.load_transaction(id)
}

/// Mark the latest row as superseded, when it still describes live money
///
/// Rows already `Failed`, `Refunded` or `Cancelled` are left alone.
pub fn supersede_latest(
    ctx: &CommandContext<'_>,
    order: &Order,
    status: TransactionStatus,
) -> Result<(), OrderError> {
    let latest = latest_for(ctx, order)?;
    if matches!(
        latest.status,
        TransactionStatus::Pending | TransactionStatus::Success
    ) {
        mark_status(ctx, &latest.id, status)?;
    }
    Ok(())
}

/// All rows of an order in creation order
pub fn for_order(storage: &OrderStorage, order: &Order) -> StorageResult<Vec<Transaction>> {
    let mut rows = Vec::with_capacity(order.transaction_ids.len());
    for id in &order.transaction_ids {
        if let Some(row) = storage.get_transaction(id)? {
            rows.push(row);
        }
    }
    Ok(rows)
}
