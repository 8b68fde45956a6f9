//! Taking items out of an order (cancel or return)
//!
//! Runs inside the caller's write transaction: item transitions, stock
//! restoration, price recomputation, transaction rows, wallet credit and
//! coupon release all commit together or not at all.

use shared::models::WalletReason;
use shared::order::{
    Order, OrderStatus, PaymentStatus, TransactionReason, TransactionStatus, TransactionType,
};
use shared::types::Money;

use super::refund::recompute_after_removal;
use super::state_machine::{refresh_order_status, transition_item};
use super::traits::{CommandContext, OrderError};
use crate::ledger::{counter, stock, transaction, wallet};

/// Why items leave the order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Cancel,
    Return,
}

impl Removal {
    fn target(self) -> OrderStatus {
        match self {
            Removal::Cancel => OrderStatus::Cancelled,
            Removal::Return => OrderStatus::Returned,
        }
    }

    fn item_reason(self) -> TransactionReason {
        match self {
            Removal::Cancel => TransactionReason::ItemCancelled,
            Removal::Return => TransactionReason::ItemReturned,
        }
    }

    fn order_reason(self) -> TransactionReason {
        match self {
            Removal::Cancel => TransactionReason::OrderCancelled,
            Removal::Return => TransactionReason::OrderReturned,
        }
    }
}

/// Remove the given items and settle the money; returns the amount refunded
///
/// When the items are the last live ones, the order price is reset to the
/// snapshot of its first transaction and whatever is still refundable goes
/// back. Otherwise the discounts are recomputed over the remaining items.
pub fn remove_items(
    ctx: &CommandContext<'_>,
    order: &mut Order,
    item_ids: &[String],
    removal: Removal,
    reason: Option<&str>,
) -> Result<Money, OrderError> {
    if item_ids.is_empty() {
        return Err(OrderError::Validation("no items to remove".to_string()));
    }
    let now = ctx.now();
    let before = order.price.clone();

    // ========== Item transitions ==========
    let mut removed = Vec::with_capacity(item_ids.len());
    for item_id in item_ids {
        let index = order
            .item_index(item_id)
            .ok_or_else(|| OrderError::ItemNotFound(item_id.clone()))?;
        let item = &mut order.items[index];
        transition_item(item, removal.target(), now)?;
        if let Some(reason) = reason {
            match removal {
                Removal::Cancel => item.cancel_reason = Some(reason.to_string()),
                Removal::Return => {
                    item.return_reason.get_or_insert_with(|| reason.to_string());
                }
            }
        }
        removed.push(index);
    }

    let removed_items: Vec<_> = removed.iter().map(|&i| &order.items[i]).collect();
    stock::restore_all_stock(ctx, removed_items.iter().copied())?;

    // ========== Money ==========
    let refund = if order.active_item_count() == 0 {
        settle_full(ctx, order, removal)?
    } else {
        let remaining: Vec<_> = order.active_items().collect();
        let recomputed = recompute_after_removal(&before, &remaining, &removed_items, ctx.pricing());
        order.price = recomputed.price;
        settle_partial(ctx, order, removal, recomputed.refund)?
    };

    // ========== Aggregate ==========
    refresh_order_status(order, now);
    if order.status == OrderStatus::Cancelled {
        if let Some(code) = order.coupon_code().map(str::to_string) {
            counter::release_coupon_usage(ctx, &code, order.order_id)?;
        }
        if order.cancel_reason.is_none() {
            order.cancel_reason = reason.map(str::to_string);
        }
    }

    tracing::info!(
        order_id = order.order_id,
        removal = ?removal,
        items = item_ids.len(),
        refund,
        status = %order.status,
        "Items removed from order"
    );
    Ok(refund)
}

/// Last live items gone: back to the original snapshot
fn settle_full(
    ctx: &CommandContext<'_>,
    order: &mut Order,
    removal: Removal,
) -> Result<Money, OrderError> {
    let first = transaction::first_for(ctx, order)?;
    order.price = first.price;

    let refund = order.payment.refundable();
    let superseded = if refund > 0 {
        TransactionStatus::Refunded
    } else {
        TransactionStatus::Cancelled
    };
    transaction::supersede_latest(ctx, order, superseded)?;

    let row_status = if refund > 0 {
        TransactionStatus::Success
    } else {
        TransactionStatus::Cancelled
    };
    transaction::record(
        ctx,
        order,
        TransactionType::Credit,
        removal.order_reason(),
        row_status,
        refund,
    )?;

    if refund > 0 {
        credit_refund(ctx, order, refund)?;
    }
    order.payment.status = if order.payment.paid_amount > 0 {
        PaymentStatus::Refunded
    } else {
        PaymentStatus::Unpaid
    };
    Ok(refund)
}

/// Some items remain: re-priced order, refund what the removal freed up
fn settle_partial(
    ctx: &CommandContext<'_>,
    order: &mut Order,
    removal: Removal,
    owed: Money,
) -> Result<Money, OrderError> {
    let paid = order.is_paid();
    let refund = if paid {
        owed.min(order.payment.refundable())
    } else {
        0
    };

    let superseded = if paid {
        TransactionStatus::Refunded
    } else {
        TransactionStatus::Cancelled
    };
    transaction::supersede_latest(ctx, order, superseded)?;

    let row_status = if paid {
        TransactionStatus::Success
    } else {
        TransactionStatus::Pending
    };
    let total = order.price.total;
    transaction::record(
        ctx,
        order,
        TransactionType::Debit,
        removal.item_reason(),
        row_status,
        total,
    )?;

    if refund > 0 {
        credit_refund(ctx, order, refund)?;
    }
    Ok(refund)
}

fn credit_refund(
    ctx: &CommandContext<'_>,
    order: &mut Order,
    refund: Money,
) -> Result<(), OrderError> {
    wallet::credit(
        ctx,
        &order.user_id,
        refund,
        WalletReason::OrderRefund,
        Some(order.order_id),
    )?;
    order.payment.refunded_amount += refund;
    Ok(())
}
