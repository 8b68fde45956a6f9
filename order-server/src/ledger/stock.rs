//! Stock ledger: units on hand per (product, size)

use shared::order::OrderItem;

use crate::orders::storage::StoreRead;
use crate::orders::traits::{CommandContext, OrderError};

/// Decrement stock, failing when fewer than `quantity` units are on hand
///
/// The conditional check and the write happen in the caller's transaction,
/// so two checkouts racing for the last unit cannot both succeed.
pub fn reduce_stock(
    ctx: &CommandContext<'_>,
    product_id: &str,
    size: &str,
    quantity: u32,
) -> Result<u64, OrderError> {
    let available = ctx.txn().read_stock(product_id, size)?.unwrap_or(0);
    let requested = u64::from(quantity);
    if available < requested {
        return Err(OrderError::InsufficientStock {
            product_id: product_id.to_string(),
            size: size.to_string(),
            requested: quantity,
            available,
        });
    }
    let remaining = available - requested;
    ctx.storage()
        .write_stock(ctx.txn(), product_id, size, remaining)?;
    Ok(remaining)
}

/// Unconditional increment, used when items are cancelled or returned
pub fn restore_stock(
    ctx: &CommandContext<'_>,
    product_id: &str,
    size: &str,
    quantity: u32,
) -> Result<u64, OrderError> {
    let current = ctx.txn().read_stock(product_id, size)?.unwrap_or(0);
    let restored = current + u64::from(quantity);
    ctx.storage()
        .write_stock(ctx.txn(), product_id, size, restored)?;
    Ok(restored)
}

/// Restore every given item's quantity
pub fn restore_all_stock<'i>(
    ctx: &CommandContext<'_>,
    items: impl IntoIterator<Item = &'i OrderItem>,
) -> Result<(), OrderError> {
    for item in items {
        restore_stock(ctx, &item.product_id, &item.size, item.quantity)?;
    }
    Ok(())
}

/// Overwrite the units on hand (restock / stocktake)
pub fn set_stock(
    ctx: &CommandContext<'_>,
    product_id: &str,
    size: &str,
    units: u64,
) -> Result<(), OrderError> {
    ctx.storage().write_stock(ctx.txn(), product_id, size, units)?;
    Ok(())
}

/// Units on hand; zero when never stocked
pub fn stock_level(
    store: &impl StoreRead,
    product_id: &str,
    size: &str,
) -> Result<u64, OrderError> {
    Ok(store.read_stock(product_id, size)?.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::OrderStorage;
    use crate::pricing::PricingConfig;

    #[test]
    fn test_reduce_then_restore_is_a_no_op() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("p1", "M", 10).unwrap();
        let pricing = PricingConfig::default();

        let txn = storage.begin_write().unwrap();
        let ctx = CommandContext::new(&txn, &storage, &pricing, 1);
        assert_eq!(reduce_stock(&ctx, "p1", "M", 3).unwrap(), 7);
        assert_eq!(restore_stock(&ctx, "p1", "M", 3).unwrap(), 10);
        txn.commit().unwrap();

        assert_eq!(storage.stock_level("p1", "M").unwrap(), 10);
    }

    #[test]
    fn test_reduce_below_zero_fails_and_leaves_stock() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.set_stock("p1", "M", 2).unwrap();
        let pricing = PricingConfig::default();

        let txn = storage.begin_write().unwrap();
        let ctx = CommandContext::new(&txn, &storage, &pricing, 1);
        let err = reduce_stock(&ctx, "p1", "M", 3).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(stock_level(ctx.txn(), "p1", "M").unwrap(), 2);
    }

    #[test]
    fn test_unstocked_size_counts_as_zero() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let pricing = PricingConfig::default();

        let txn = storage.begin_write().unwrap();
        let ctx = CommandContext::new(&txn, &storage, &pricing, 1);
        assert!(reduce_stock(&ctx, "p1", "XL", 1).is_err());
        assert_eq!(restore_stock(&ctx, "p1", "XL", 2).unwrap(), 2);
        set_stock(&ctx, "p1", "XL", 9).unwrap();
        assert_eq!(stock_level(ctx.txn(), "p1", "XL").unwrap(), 9);
    }
}
