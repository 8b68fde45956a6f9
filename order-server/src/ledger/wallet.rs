//! Wallet ledger
//!
//! `User.wallet` never goes negative, and every change to it is paired with
//! a `WalletTransaction` row written in the same transaction.

use shared::models::{WalletReason, WalletTransaction};
use shared::order::{TransactionStatus, TransactionType};
use shared::types::Money;

use crate::orders::storage::{Ledger, OrderStorage, StorageResult};
use crate::orders::traits::{CommandContext, OrderError};

/// Add `amount` to the user's balance
pub fn credit(
    ctx: &CommandContext<'_>,
    user_id: &str,
    amount: Money,
    reason: WalletReason,
    order_id: Option<u64>,
) -> Result<WalletTransaction, OrderError> {
    if amount <= 0 {
        return Err(OrderError::Validation(format!(
            "wallet credit must be positive, got {amount}"
        )));
    }
    apply(ctx, user_id, TransactionType::Credit, amount, reason, order_id)
}

/// Take `amount` from the user's balance
///
/// Fails with `InsufficientBalance` rather than letting the balance go
/// negative; the surrounding transaction then aborts as a whole.
pub fn debit(
    ctx: &CommandContext<'_>,
    user_id: &str,
    amount: Money,
    reason: WalletReason,
    order_id: Option<u64>,
) -> Result<WalletTransaction, OrderError> {
    if amount <= 0 {
        return Err(OrderError::Validation(format!(
            "wallet debit must be positive, got {amount}"
        )));
    }
    apply(ctx, user_id, TransactionType::Debit, amount, reason, order_id)
}

fn apply(
    ctx: &CommandContext<'_>,
    user_id: &str,
    kind: TransactionType,
    amount: Money,
    reason: WalletReason,
    order_id: Option<u64>,
) -> Result<WalletTransaction, OrderError> {
    let mut user = ctx.load_user(user_id)?;
    let balance_after = match kind {
        TransactionType::Credit => user.wallet + amount,
        TransactionType::Debit => {
            if user.wallet < amount {
                return Err(OrderError::InsufficientBalance {
                    required: amount,
                    available: user.wallet,
                });
            }
            user.wallet - amount
        }
    };
    user.wallet = balance_after;
    ctx.storage().put_user(ctx.txn(), &user)?;

    let row = WalletTransaction {
        id: shared::util::new_id(),
        user_id: user_id.to_string(),
        kind,
        amount,
        reason,
        status: TransactionStatus::Success,
        order_id,
        balance_after,
        created_at: ctx.now(),
    };
    ctx.storage()
        .append_ledger_row(ctx.txn(), Ledger::Wallet, user_id, &row)?;

    tracing::debug!(user_id = %user_id, kind = ?kind, amount, balance_after, "Wallet updated");
    Ok(row)
}

/// Wallet rows of one user, oldest first
pub fn history(storage: &OrderStorage, user_id: &str) -> StorageResult<Vec<WalletTransaction>> {
    storage.ledger_rows(Ledger::Wallet, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PricingConfig;
    use shared::models::User;

    fn seed_user(storage: &OrderStorage, wallet: Money) {
        storage
            .save_user(&User {
                id: "u1".to_string(),
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                wallet,
                referral_credits: 0,
            })
            .unwrap();
    }

    #[test]
    fn test_credit_and_debit_pair_with_rows() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_user(&storage, 1_000);
        let pricing = PricingConfig::default();

        let txn = storage.begin_write().unwrap();
        let ctx = CommandContext::new(&txn, &storage, &pricing, 5);
        credit(&ctx, "u1", 500, WalletReason::TopUp, None).unwrap();
        let row = debit(&ctx, "u1", 1_200, WalletReason::OrderPayment, Some(1)).unwrap();
        assert_eq!(row.balance_after, 300);
        txn.commit().unwrap();

        assert_eq!(storage.get_user("u1").unwrap().unwrap().wallet, 300);
        let rows = history(&storage, "u1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, TransactionType::Credit);
        assert_eq!(rows[1].order_id, Some(1));
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_user(&storage, 100);
        let pricing = PricingConfig::default();

        let txn = storage.begin_write().unwrap();
        let ctx = CommandContext::new(&txn, &storage, &pricing, 5);
        let err = debit(&ctx, "u1", 101, WalletReason::OrderPayment, None).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientBalance {
                required: 101,
                available: 100
            }
        ));
        txn.abort().unwrap();

        assert_eq!(storage.get_user("u1").unwrap().unwrap().wallet, 100);
        assert!(history(&storage, "u1").unwrap().is_empty());
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_user(&storage, 100);
        let pricing = PricingConfig::default();

        let txn = storage.begin_write().unwrap();
        let ctx = CommandContext::new(&txn, &storage, &pricing, 5);
        assert!(credit(&ctx, "u1", 0, WalletReason::TopUp, None).is_err());
        assert!(debit(&ctx, "u1", -5, WalletReason::OrderPayment, None).is_err());
    }
}
