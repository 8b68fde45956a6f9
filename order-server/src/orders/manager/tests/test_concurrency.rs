use super::*;
use crate::ledger::stock;

fn conflict() -> OrderError {
    OrderError::Storage(StorageError::VersionConflict {
        order_id: 1,
        expected: 1,
        found: 2,
    })
}

// ========================================================================
// Transaction boundary
// ========================================================================

#[test]
fn test_write_conflict_is_retried() {
    let shop = create_test_shop();
    let mut attempts = 0;
    let value = shop
        .manager
        .with_transaction("conflict", |_ctx| {
            attempts += 1;
            if attempts < 3 { Err(conflict()) } else { Ok(attempts) }
        })
        .unwrap();
    assert_eq!(value, 3);
}

#[test]
fn test_write_conflict_surfaces_after_retries() {
    let shop = create_test_shop();
    let mut attempts = 0;
    let err = shop
        .manager
        .with_transaction("conflict", |_ctx| -> Result<(), OrderError> {
            attempts += 1;
            Err(conflict())
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::WriteConflict);
    assert_eq!(attempts, 4);

    let app: AppError = err.into();
    assert_eq!(app.code, ErrorCode::WriteConflict);
}

#[test]
fn test_failed_action_rolls_back_and_is_not_retried() {
    let shop = create_test_shop();
    let mut attempts = 0;
    let err = shop
        .manager
        .with_transaction("half_done", |ctx| -> Result<(), OrderError> {
            attempts += 1;
            stock::set_stock(ctx, "p1", "M", 0)?;
            Err(OrderError::Validation("stop".to_string()))
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
    assert_eq!(attempts, 1);
    assert_eq!(stock_of(&shop.manager, "p1"), 5);
}

#[test]
fn test_storage_fault_is_not_retried() {
    let shop = create_test_shop();
    let mut attempts = 0;
    let err = shop
        .manager
        .with_transaction("io_fault", |_ctx| -> Result<(), OrderError> {
            attempts += 1;
            let io = std::io::Error::other("disk hiccup");
            Err(OrderError::Storage(StorageError::Storage(redb::StorageError::Io(io))))
        })
        .unwrap_err();
    assert_eq!(attempts, 1);
    assert_eq!(err.code(), ErrorCode::SystemBusy);
    assert!(!err.is_retryable());
}

// ========================================================================
// Concurrent callers
// ========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_item_cancellations_keep_every_update() {
    let shop = create_test_shop();
    let manager = Arc::new(shop.manager);
    manager.top_up_wallet("u1", 400_000).unwrap();
    fill_cart(&manager, "u1", &["p1", "p2", "p3"], Some("SAVE10"));
    let order = place(&manager, "u1", PaymentMethod::Wallet).await.unwrap();
    assert_eq!(order.price.total, 275_000);

    let mut handles = Vec::new();
    for item in &order.items {
        let manager = manager.clone();
        let item_id = item.item_id.clone();
        let order_id = order.order_id;
        handles.push(tokio::spawn(async move {
            manager
                .cancel_item(Actor::Customer("u1".into()), order_id, &item_id, None)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = manager.storage().get_order(order.order_id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert!(stored.items.iter().all(|i| i.status == OrderStatus::Cancelled));
    // placement + one save per cancellation
    assert_eq!(stored.version, 4);
    assert_eq!(stored.transaction_ids.len(), 4);
    assert_eq!(stored.payment.refunded_amount, 275_000);
    assert_eq!(wallet_balance(&manager, "u1"), 400_000);

    let txs = manager.order_transactions(order.order_id).unwrap();
    assert_eq!(stored.price, txs[0].price);
    for product_id in ["p1", "p2", "p3"] {
        assert_eq!(stock_of(&manager, product_id), 5);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_checkouts_for_last_unit() {
    let shop = create_test_shop();
    let manager = Arc::new(shop.manager);
    for user_id in ["u1", "u2"] {
        fill_cart(&manager, user_id, &["p1"], None);
    }
    manager.storage().set_stock("p1", "M", 1).unwrap();

    let mut handles = Vec::new();
    for user_id in ["u1", "u2"] {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            place(&manager, user_id, PaymentMethod::Cod).await
        }));
    }
    let mut placed = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(e) => {
                assert_eq!(e.code, ErrorCode::InsufficientStock);
                out_of_stock += 1;
            }
        }
    }
    assert_eq!((placed, out_of_stock), (1, 1));
    assert_eq!(stock_of(&manager, "p1"), 0);
    assert_eq!(manager.storage().order_ids().unwrap().len(), 1);
}

#[test]
fn test_wallet_top_ups_from_many_threads() {
    let shop = create_test_shop();
    let manager = Arc::new(shop.manager);

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                for _ in 0..10 {
                    manager.top_up_wallet("u2", 1_000).unwrap();
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(wallet_balance(&manager, "u2"), 80_000);
    let history = manager.wallet_history("u2").unwrap();
    assert_eq!(history.len(), 80);
    assert_eq!(history.last().unwrap().balance_after, 80_000);
}
