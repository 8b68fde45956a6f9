//! Order and item state machines
//!
//! Items move through the same vocabulary as orders, each on its own. The
//! order status is then derived from its items by [`aggregate_status`].
//!
//! ```text
//! Initialized ─┬─► Pending ─┬─► Processing ─┬─► Shipped ─► Delivered ─► Return Requested
//!              │            │               │                              │
//!              └────────────┴───────────────┴─► Cancelled      ┌───────────┴──────────┐
//!                                                              ▼                      ▼
//!                                                       Return Approved        Return Rejected
//!                                                              │
//!                                                              ▼
//!                                                          Returned
//! ```

use shared::order::{ItemTimeline, Order, OrderItem, OrderStatus, OrderTimeline};
use shared::types::Timestamp;

use super::traits::OrderError;

/// Whether `from -> to` is a legal move
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Initialized, Pending)
            | (Initialized, Cancelled)
            | (Pending, Processing)
            | (Pending, Cancelled)
            | (Processing, Shipped)
            | (Processing, Cancelled)
            | (Shipped, Delivered)
            | (Delivered, ReturnRequested)
            | (ReturnRequested, ReturnApproved)
            | (ReturnRequested, ReturnRejected)
            | (ReturnApproved, Returned)
    )
}

pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

/// Order status as a function of its item statuses
///
/// - every item terminal: `Returned` if any item was returned, else `Cancelled`
/// - every live item in the same status: that status
/// - otherwise the order keeps `prior`
pub fn aggregate_status(prior: OrderStatus, items: &[OrderItem]) -> OrderStatus {
    if items.is_empty() {
        return prior;
    }
    let mut live = items.iter().filter(|i| !i.status.is_terminal());
    match live.next() {
        None => {
            if items.iter().any(|i| i.status == OrderStatus::Returned) {
                OrderStatus::Returned
            } else {
                OrderStatus::Cancelled
            }
        }
        Some(first) => {
            if live.all(|i| i.status == first.status) {
                first.status
            } else {
                prior
            }
        }
    }
}

/// Re-derive the order status from its items; returns true if it moved
pub fn refresh_order_status(order: &mut Order, now: Timestamp) -> bool {
    let next = aggregate_status(order.status, &order.items);
    if next == order.status {
        return false;
    }
    order.status = next;
    stamp_order(&mut order.timeline, next, now);
    true
}

/// Move one item, stamping its timeline
pub fn transition_item(
    item: &mut OrderItem,
    to: OrderStatus,
    now: Timestamp,
) -> Result<(), OrderError> {
    check_transition(item.status, to)?;
    item.status = to;
    stamp_item(&mut item.timeline, to, now);
    Ok(())
}

fn stamp_item(timeline: &mut ItemTimeline, status: OrderStatus, now: Timestamp) {
    match status {
        OrderStatus::Cancelled => timeline.cancelled_at = Some(now),
        OrderStatus::ReturnRequested => timeline.return_requested_at = Some(now),
        OrderStatus::ReturnApproved | OrderStatus::ReturnRejected => {
            timeline.return_reviewed_at = Some(now)
        }
        OrderStatus::Returned => timeline.returned_at = Some(now),
        _ => {}
    }
}

/// Stamp the order timeline for a status it just entered
pub fn stamp_order(timeline: &mut OrderTimeline, status: OrderStatus, now: Timestamp) {
    let slot = match status {
        OrderStatus::Processing => &mut timeline.processing_at,
        OrderStatus::Shipped => &mut timeline.shipped_at,
        OrderStatus::Delivered => &mut timeline.delivered_at,
        OrderStatus::Cancelled => &mut timeline.cancelled_at,
        OrderStatus::ReturnRequested => &mut timeline.return_requested_at,
        OrderStatus::ReturnApproved | OrderStatus::ReturnRejected => {
            &mut timeline.return_reviewed_at
        }
        OrderStatus::Returned => &mut timeline.returned_at,
        OrderStatus::Initialized | OrderStatus::Pending => return,
    };
    slot.get_or_insert(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    fn item(status: OrderStatus) -> OrderItem {
        OrderItem {
            item_id: shared::util::new_id(),
            product_id: "p1".to_string(),
            size: "M".to_string(),
            quantity: 1,
            title: "Shirt".to_string(),
            slug: "shirt".to_string(),
            image: None,
            category_id: "shirts".to_string(),
            list_price: 1_000,
            sale_price: 1_000,
            status,
            cancel_reason: None,
            return_reason: None,
            timeline: ItemTimeline::default(),
        }
    }

    #[test]
    fn test_forward_transitions() {
        assert!(can_transition(Initialized, Pending));
        assert!(can_transition(Pending, Processing));
        assert!(can_transition(Processing, Cancelled));
        assert!(can_transition(Shipped, Delivered));
        assert!(can_transition(ReturnRequested, ReturnRejected));
        assert!(can_transition(ReturnApproved, Returned));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!can_transition(Shipped, Cancelled));
        assert!(!can_transition(Delivered, Cancelled));
        assert!(!can_transition(Pending, Delivered));
        assert!(!can_transition(Cancelled, Pending));
        assert!(!can_transition(Returned, ReturnRequested));
        assert!(!can_transition(ReturnRejected, ReturnApproved));
        assert!(!can_transition(Delivered, Returned));

        let err = check_transition(Cancelled, Processing).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: Cancelled,
                to: Processing
            }
        ));
    }

    #[test]
    fn test_aggregate_all_terminal() {
        assert_eq!(aggregate_status(Pending, &[item(Cancelled), item(Cancelled)]), Cancelled);
        assert_eq!(aggregate_status(Delivered, &[item(Cancelled), item(Returned)]), Returned);
    }

    #[test]
    fn test_aggregate_mixed_keeps_prior() {
        let items = [item(Cancelled), item(Pending)];
        assert_eq!(aggregate_status(Pending, &items), Pending);

        let items = [item(ReturnRequested), item(Delivered)];
        assert_eq!(aggregate_status(Delivered, &items), Delivered);

        let items = [item(ReturnRequested), item(Cancelled)];
        assert_eq!(aggregate_status(Delivered, &items), ReturnRequested);
    }

    #[test]
    fn test_transition_item_stamps_timeline() {
        let mut it = item(Pending);
        transition_item(&mut it, Cancelled, 42).unwrap();
        assert_eq!(it.status, Cancelled);
        assert_eq!(it.timeline.cancelled_at, Some(42));

        assert!(transition_item(&mut it, Pending, 43).is_err());
        assert_eq!(it.status, Cancelled);
    }

    #[test]
    fn test_stamp_order_keeps_first_time() {
        let mut timeline = OrderTimeline::default();
        stamp_order(&mut timeline, Shipped, 10);
        stamp_order(&mut timeline, Shipped, 20);
        assert_eq!(timeline.shipped_at, Some(10));
    }
}
