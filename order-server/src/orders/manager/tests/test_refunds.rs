use super::*;
use rand::seq::SliceRandom;

// ========================================================================
// Two ₹1000 shirts, category 10% up to ₹150, SAVE10 10% up to ₹100
// ========================================================================

#[tokio::test]
async fn test_cancel_one_item_retains_discounts_proportionally() {
    let shop = create_test_shop();
    let manager = &shop.manager;
    let order = place_scenario_wallet_order(manager).await;
    assert_eq!(order.price.special_discount, 15_000);
    assert_eq!(order.price.coupon_discount, 10_000);
    assert_eq!(order.price.total, 175_000);

    let p1 = item_id_of(&order, "p1");
    let after = manager
        .cancel_item(Actor::Customer("u1".into()), order.order_id, &p1, Some("Duplicate".into()))
        .await
        .unwrap();

    // 1000 - (150 - 100) - (100 - 90) = 940
    assert_eq!(after.payment.refunded_amount, 94_000);
    assert_eq!(wallet_balance(manager, "u1"), 25_000 + 94_000);
    assert_eq!(after.price.subtotal, 100_000);
    assert_eq!(after.price.special_discount, 10_000);
    assert_eq!(after.price.discount, 10_000);
    assert_eq!(after.price.coupon_discount, 9_000);
    assert_eq!(after.price.delivery_fee, 0);
    assert_eq!(after.price.total, 81_000);
    assert_eq!(after.status, OrderStatus::Pending);
    assert_eq!(after.payment.status, PaymentStatus::Paid);
    assert_eq!(after.item(&p1).unwrap().cancel_reason.as_deref(), Some("Duplicate"));
    assert_price_identity(&after);

    let txs = manager.order_transactions(order.order_id).unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].status, TransactionStatus::Refunded);
    assert_eq!(txs[0].amount, 175_000);
    assert_eq!(txs[1].reason, TransactionReason::ItemCancelled);
    assert_eq!(txs[1].status, TransactionStatus::Success);
    assert_eq!(txs[1].amount, 81_000);
    assert_eq!(txs[1].price, after.price);

    assert_eq!(stock_of(manager, "p1"), 5);
    assert_eq!(stock_of(manager, "p2"), 4);
    // The order is still live, so the coupon stays used
    assert_eq!(coupon_used(manager, "SAVE10"), 1);
}

#[tokio::test]
async fn test_last_item_restores_first_snapshot() {
    let shop = create_test_shop();
    let manager = &shop.manager;
    let order = place_scenario_wallet_order(manager).await;
    let customer = Actor::Customer("u1".into());

    manager
        .cancel_item(customer.clone(), order.order_id, &item_id_of(&order, "p1"), None)
        .await
        .unwrap();
    let done = manager
        .cancel_item(customer, order.order_id, &item_id_of(&order, "p2"), Some("Not needed".into()))
        .await
        .unwrap();

    let txs = manager.order_transactions(order.order_id).unwrap();
    assert_eq!(txs[0].amount, 175_000);
    assert_eq!(done.price, txs[0].price);
    assert_eq!(done.price.total, 175_000);
    assert_eq!(done.status, OrderStatus::Cancelled);
    assert_eq!(done.cancel_reason.as_deref(), Some("Not needed"));
    assert_eq!(done.payment.status, PaymentStatus::Refunded);
    assert_eq!(done.payment.refunded_amount, 175_000);
    assert_eq!(wallet_balance(manager, "u1"), 200_000);
    assert_price_identity(&done);

    let last = txs.last().unwrap();
    assert_eq!(last.reason, TransactionReason::OrderCancelled);
    assert_eq!(last.amount, 81_000);
    assert_eq!(txs[1].status, TransactionStatus::Refunded);

    assert_eq!(stock_of(manager, "p1"), 5);
    assert_eq!(stock_of(manager, "p2"), 5);
    assert_eq!(coupon_used(manager, "SAVE10"), 0);
}

#[tokio::test]
async fn test_cancel_equivalence() {
    // Item by item in any order ends where a single order cancel ends
    let whole = create_test_shop();
    whole.manager.top_up_wallet("u1", 400_000).unwrap();
    fill_cart(&whole.manager, "u1", &["p1", "p2", "p3"], Some("SAVE10"));
    let order = place(&whole.manager, "u1", PaymentMethod::Wallet).await.unwrap();
    let cancelled = whole
        .manager
        .cancel_order(Actor::Customer("u1".into()), order.order_id, None)
        .await
        .unwrap();

    let piecewise = create_test_shop();
    piecewise.manager.top_up_wallet("u1", 400_000).unwrap();
    fill_cart(&piecewise.manager, "u1", &["p1", "p2", "p3"], Some("SAVE10"));
    let order = place(&piecewise.manager, "u1", PaymentMethod::Wallet).await.unwrap();
    let mut item_ids: Vec<String> = order.items.iter().map(|i| i.item_id.clone()).collect();
    item_ids.shuffle(&mut rand::thread_rng());

    let mut last = order.clone();
    for item_id in &item_ids {
        last = piecewise
            .manager
            .cancel_item(Actor::Customer("u1".into()), order.order_id, item_id, None)
            .await
            .unwrap();
        assert_price_identity(&last);
        assert!(last.payment.refunded_amount <= last.payment.paid_amount);
    }

    assert_eq!(last.status, cancelled.status);
    assert_eq!(last.price, cancelled.price);
    assert_eq!(last.payment.refunded_amount, cancelled.payment.refunded_amount);
    assert_eq!(last.payment.status, cancelled.payment.status);
    assert_eq!(
        wallet_balance(&piecewise.manager, "u1"),
        wallet_balance(&whole.manager, "u1")
    );
    assert_eq!(wallet_balance(&whole.manager, "u1"), 400_000);
    for product_id in ["p1", "p2", "p3"] {
        assert_eq!(stock_of(&piecewise.manager, product_id), 5);
        assert_eq!(stock_of(&whole.manager, product_id), 5);
    }
}

#[tokio::test]
async fn test_coupon_usage_counts_live_orders() {
    let shop = create_test_shop();
    let manager = &shop.manager;
    let mut orders = Vec::new();
    for user_id in ["u1", "u2", "u3"] {
        fill_cart(manager, user_id, &["p1"], Some("SAVE10"));
        orders.push(place(manager, user_id, PaymentMethod::Cod).await.unwrap());
    }
    assert_eq!(coupon_used(manager, "SAVE10"), 3);

    for order in &orders[..2] {
        manager
            .cancel_order(Actor::Customer(order.user_id.clone()), order.order_id, None)
            .await
            .unwrap();
    }
    assert_eq!(coupon_used(manager, "SAVE10"), 1);

    // A cancelled order frees the user's own coupon use as well
    fill_cart(manager, "u1", &["p2"], Some("SAVE10"));
    place(manager, "u1", PaymentMethod::Cod).await.unwrap();
    assert_eq!(coupon_used(manager, "SAVE10"), 2);
}

#[tokio::test]
async fn test_unpaid_cod_partial_cancel_collects_new_total() {
    let shop = create_test_shop();
    let manager = &shop.manager;
    fill_cart(manager, "u1", &["p1", "p2"], Some("SAVE10"));
    let order = place(manager, "u1", PaymentMethod::Cod).await.unwrap();

    let after = manager
        .cancel_item(Actor::Admin, order.order_id, &item_id_of(&order, "p2"), None)
        .await
        .unwrap();
    assert_eq!(after.price.total, 81_000);
    assert_eq!(after.payment.refunded_amount, 0);
    assert_eq!(wallet_balance(manager, "u1"), 0);

    let txs = manager.order_transactions(order.order_id).unwrap();
    assert_eq!(txs[0].status, TransactionStatus::Cancelled);
    assert_eq!(txs[1].status, TransactionStatus::Pending);

    let delivered = deliver(manager, order.order_id).await;
    assert_eq!(delivered.payment.status, PaymentStatus::Paid);
    assert_eq!(delivered.payment.paid_amount, 81_000);
    assert_price_identity(&delivered);
    let txs = manager.order_transactions(order.order_id).unwrap();
    assert_eq!(txs[1].status, TransactionStatus::Success);
}

#[tokio::test]
async fn test_cancel_unpaid_cod_order_is_unpaid() {
    let shop = create_test_shop();
    let manager = &shop.manager;
    fill_cart(manager, "u1", &["p1", "p2"], None);
    let order = place(manager, "u1", PaymentMethod::Cod).await.unwrap();

    let cancelled = manager
        .cancel_order(Actor::Customer("u1".into()), order.order_id, Some("Changed plans".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment.status, PaymentStatus::Unpaid);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("Changed plans"));
    assert!(cancelled.timeline.cancelled_at.is_some());
    assert_eq!(wallet_balance(manager, "u1"), 0);

    let txs = manager.order_transactions(order.order_id).unwrap();
    assert_eq!(txs[0].status, TransactionStatus::Cancelled);
    assert_eq!(txs[1].status, TransactionStatus::Cancelled);
    assert_eq!(txs[1].amount, 0);

    let err = manager
        .cancel_order(Actor::Customer("u1".into()), order.order_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
}

#[tokio::test]
async fn test_falling_below_free_shipping_adds_fee() {
    let shop = create_test_shop();
    let manager = &shop.manager;
    manager
        .storage()
        .save_product(&product("p4", 30_000))
        .unwrap();
    manager.storage().set_stock("p4", "M", 5).unwrap();
    manager.top_up_wallet("u1", 200_000).unwrap();
    fill_cart(manager, "u1", &["p4", "p1"], None);
    let order = place(manager, "u1", PaymentMethod::Wallet).await.unwrap();
    // 1300 - 130 category, free shipping
    assert_eq!(order.price.special_discount, 13_000);
    assert_eq!(order.price.delivery_fee, 0);
    assert_eq!(order.price.total, 117_000);

    let after = manager
        .cancel_item(Actor::Customer("u1".into()), order.order_id, &item_id_of(&order, "p1"), None)
        .await
        .unwrap();
    // ₹300 left: ₹30 category, below free shipping so the fee is charged again
    assert_eq!(after.price.special_discount, 3_000);
    assert_eq!(after.price.delivery_fee, 4_000);
    assert_eq!(after.price.total, 31_000);
    // 1000 - (130 - 30)
    assert_eq!(after.payment.refunded_amount, 90_000);
    assert_price_identity(&after);
}
