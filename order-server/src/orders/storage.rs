//! redb-based storage layer for orders, catalog and ledgers
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order aggregate |
//! | `user_orders` | `(user_id, order_id)` | `()` | Per-user order index |
//! | `initialized_orders` | `order_id` | `created_at` | Orders awaiting payment capture |
//! | `transactions` | `transaction_id` | `Transaction` | Money-movement rows (append-only) |
//! | `products` | `product_id` | `Product` | Catalog |
//! | `stock` | `(product_id, size)` | `u64` | Stock per size |
//! | `categories` | `category_id` | `Category` | Categories and their offers |
//! | `coupons` | `code` | `Coupon` | Coupons |
//! | `users` | `user_id` | `User` | Wallet balance and referral credits |
//! | `carts` | `user_id` | `Cart` | Carts |
//! | `wallet_ledger` | `(user_id, seq)` | `WalletTransaction` | Wallet rows (append-only) |
//! | `counter_ledger` | `(counter, seq)` | `CounterEntry` | Coupon usage / referral credit rows |
//! | `sequence_counter` | name | `u64` | Order ids and ledger sequences |
//!
//! # Transactions
//!
//! Every mutating call takes the caller's `WriteTransaction`; nothing here
//! commits on its own except the seeding helpers at the bottom. Reads go
//! through [`StoreRead`], implemented for both read and write transactions,
//! so the same lookup code serves previews and mutations.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Cart, Category, Coupon, Product, User};
use shared::order::{Order, Transaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("orders");

/// Per-user order index: key = (user_id, order_id), value = empty
const USER_ORDERS_TABLE: TableDefinition<(&str, u64), ()> = TableDefinition::new("user_orders");

/// Orders still in `Initialized`: key = order_id, value = created_at millis
const INITIALIZED_ORDERS_TABLE: TableDefinition<u64, i64> =
    TableDefinition::new("initialized_orders");

const TRANSACTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");
const CATEGORIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("categories");
const COUPONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("coupons");
const USERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");

/// Stock: key = (product_id, size), value = units on hand
const STOCK_TABLE: TableDefinition<(&str, &str), u64> = TableDefinition::new("stock");

/// Wallet rows: key = (user_id, seq)
const WALLET_LEDGER_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("wallet_ledger");

/// Counter rows: key = (counter, seq)
const COUNTER_LEDGER_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("counter_ledger");

/// Named counters: key = counter name, value = last issued value
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;
type LedgerTable = TableDefinition<'static, (&'static str, u64), &'static [u8]>;

pub const ORDER_ID_SEQUENCE: &str = "order_id";
const WALLET_SEQUENCE: &str = "wallet_entry";
const COUNTER_SEQUENCE: &str = "counter_entry";

/// Append-only ledgers kept in storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    Wallet,
    Counter,
}

impl Ledger {
    fn table(self) -> LedgerTable {
        match self {
            Ledger::Wallet => WALLET_LEDGER_TABLE,
            Ledger::Counter => COUNTER_LEDGER_TABLE,
        }
    }

    fn sequence(self) -> &'static str {
        match self {
            Ledger::Wallet => WALLET_SEQUENCE,
            Ledger::Counter => COUNTER_SEQUENCE,
        }
    }
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order {order_id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        order_id: u64,
        expected: u64,
        found: u64,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

// ========== Read access ==========

/// Lookups shared by read and write transactions
pub trait StoreRead {
    fn read_json<T: DeserializeOwned>(&self, table: JsonTable, key: &str)
    -> StorageResult<Option<T>>;

    fn read_order(&self, order_id: u64) -> StorageResult<Option<Order>>;

    /// Units on hand; `None` when the (product, size) was never stocked
    fn read_stock(&self, product_id: &str, size: &str) -> StorageResult<Option<u64>>;

    /// Order ids of one user, ascending
    fn read_user_order_ids(&self, user_id: &str) -> StorageResult<Vec<u64>>;

    fn product(&self, product_id: &str) -> StorageResult<Option<Product>> {
        self.read_json(PRODUCTS_TABLE, product_id)
    }

    fn category(&self, category_id: &str) -> StorageResult<Option<Category>> {
        self.read_json(CATEGORIES_TABLE, category_id)
    }

    fn coupon(&self, code: &str) -> StorageResult<Option<Coupon>> {
        self.read_json(COUPONS_TABLE, code)
    }

    fn user(&self, user_id: &str) -> StorageResult<Option<User>> {
        self.read_json(USERS_TABLE, user_id)
    }

    fn cart(&self, user_id: &str) -> StorageResult<Option<Cart>> {
        self.read_json(CARTS_TABLE, user_id)
    }

    fn transaction(&self, transaction_id: &str) -> StorageResult<Option<Transaction>> {
        self.read_json(TRANSACTIONS_TABLE, transaction_id)
    }

    /// All orders of one user, oldest first
    fn user_orders(&self, user_id: &str) -> StorageResult<Vec<Order>> {
        let mut orders = Vec::new();
        for order_id in self.read_user_order_ids(user_id)? {
            if let Some(order) = self.read_order(order_id)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }
}

macro_rules! impl_store_read {
    ($txn:ty) => {
        impl StoreRead for $txn {
            fn read_json<T: DeserializeOwned>(
                &self,
                table: JsonTable,
                key: &str,
            ) -> StorageResult<Option<T>> {
                let table = self.open_table(table)?;
                match table.get(key)? {
                    Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
                    None => Ok(None),
                }
            }

            fn read_order(&self, order_id: u64) -> StorageResult<Option<Order>> {
                let table = self.open_table(ORDERS_TABLE)?;
                match table.get(order_id)? {
                    Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
                    None => Ok(None),
                }
            }

            fn read_stock(&self, product_id: &str, size: &str) -> StorageResult<Option<u64>> {
                let table = self.open_table(STOCK_TABLE)?;
                Ok(table.get((product_id, size))?.map(|guard| guard.value()))
            }

            fn read_user_order_ids(&self, user_id: &str) -> StorageResult<Vec<u64>> {
                let table = self.open_table(USER_ORDERS_TABLE)?;
                let mut ids = Vec::new();
                for result in table.range((user_id, 0u64)..=(user_id, u64::MAX))? {
                    let (key, _) = result?;
                    ids.push(key.value().1);
                }
                Ok(ids)
            }
        }
    };
}

impl_store_read!(ReadTransaction);
impl_store_read!(WriteTransaction);

// ========== Storage ==========

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns the
    /// write is on disk, and a crash mid-write leaves the previous state.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables so read transactions never hit a missing table
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(USER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(INITIALIZED_ORDERS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(COUPONS_TABLE)?;
            let _ = write_txn.open_table(USERS_TABLE)?;
            let _ = write_txn.open_table(CARTS_TABLE)?;
            let _ = write_txn.open_table(STOCK_TABLE)?;
            let _ = write_txn.open_table(WALLET_LEDGER_TABLE)?;
            let _ = write_txn.open_table(COUNTER_LEDGER_TABLE)?;
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    ///
    /// redb admits one writer at a time; a second caller blocks here until
    /// the first commits or aborts.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction over the last committed state
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Sequence Operations ==========

    /// Increment and return a named sequence
    pub fn next_sequence(&self, txn: &WriteTransaction, name: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table.get(name)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(name, next)?;
        Ok(next)
    }

    /// Current value of a named sequence (read-only)
    #[cfg(test)]
    pub fn current_sequence(&self, name: &str) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table.get(name)?.map(|guard| guard.value()).unwrap_or(0))
    }

    // ========== Order Operations ==========

    /// Store an order, bumping its version
    ///
    /// Fails with [`StorageError::VersionConflict`] when the stored copy is
    /// not the version the caller loaded.
    pub fn save_order(&self, txn: &WriteTransaction, order: &mut Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let stored_version = match table.get(order.order_id)? {
            Some(value) => Some(serde_json::from_slice::<Order>(value.value())?.version),
            None => None,
        };
        if let Some(found) = stored_version
            && found != order.version
        {
            return Err(StorageError::VersionConflict {
                order_id: order.order_id,
                expected: order.version,
                found,
            });
        }

        order.version += 1;
        let value = serde_json::to_vec(order)?;
        table.insert(order.order_id, value.as_slice())?;

        if stored_version.is_none() {
            let mut index = txn.open_table(USER_ORDERS_TABLE)?;
            index.insert((order.user_id.as_str(), order.order_id), ())?;
        }
        Ok(())
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: u64) -> StorageResult<Option<Order>> {
        self.db.begin_read()?.read_order(order_id)
    }

    /// All order ids, ascending
    pub fn order_ids(&self) -> StorageResult<Vec<u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut ids = Vec::new();
        for result in table.iter()? {
            let (key, _) = result?;
            ids.push(key.value());
        }
        Ok(ids)
    }

    /// Track an order awaiting payment capture
    pub fn mark_initialized(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
        created_at: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(INITIALIZED_ORDERS_TABLE)?;
        table.insert(order_id, created_at)?;
        Ok(())
    }

    pub fn clear_initialized(&self, txn: &WriteTransaction, order_id: u64) -> StorageResult<()> {
        let mut table = txn.open_table(INITIALIZED_ORDERS_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    /// Orders awaiting capture as `(order_id, created_at)`
    pub fn initialized_orders(&self) -> StorageResult<Vec<(u64, i64)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INITIALIZED_ORDERS_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            entries.push((key.value(), value.value()));
        }
        Ok(entries)
    }

    // ========== Transaction Rows ==========

    pub fn put_transaction(
        &self,
        txn: &WriteTransaction,
        transaction: &Transaction,
    ) -> StorageResult<()> {
        self.put_json(txn, TRANSACTIONS_TABLE, &transaction.id, transaction)
    }

    // ========== Catalog and Accounts ==========

    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        self.put_json(txn, PRODUCTS_TABLE, &product.id, product)
    }

    pub fn put_category(&self, txn: &WriteTransaction, category: &Category) -> StorageResult<()> {
        self.put_json(txn, CATEGORIES_TABLE, &category.id, category)
    }

    pub fn put_coupon(&self, txn: &WriteTransaction, coupon: &Coupon) -> StorageResult<()> {
        self.put_json(txn, COUPONS_TABLE, &coupon.code, coupon)
    }

    pub fn put_user(&self, txn: &WriteTransaction, user: &User) -> StorageResult<()> {
        self.put_json(txn, USERS_TABLE, &user.id, user)
    }

    pub fn put_cart(&self, txn: &WriteTransaction, cart: &Cart) -> StorageResult<()> {
        self.put_json(txn, CARTS_TABLE, &cart.user_id, cart)
    }

    pub fn remove_cart(&self, txn: &WriteTransaction, user_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(CARTS_TABLE)?;
        table.remove(user_id)?;
        Ok(())
    }

    pub fn write_stock(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
        size: &str,
        units: u64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_TABLE)?;
        table.insert((product_id, size), units)?;
        Ok(())
    }

    fn put_json<T: Serialize>(
        &self,
        txn: &WriteTransaction,
        table: JsonTable,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(table)?;
        let bytes = serde_json::to_vec(value)?;
        table.insert(key, bytes.as_slice())?;
        Ok(())
    }

    // ========== Ledgers ==========

    /// Append a row to a ledger under `owner`
    pub fn append_ledger_row<T: Serialize>(
        &self,
        txn: &WriteTransaction,
        ledger: Ledger,
        owner: &str,
        row: &T,
    ) -> StorageResult<u64> {
        let seq = self.next_sequence(txn, ledger.sequence())?;
        let mut table = txn.open_table(ledger.table())?;
        let bytes = serde_json::to_vec(row)?;
        table.insert((owner, seq), bytes.as_slice())?;
        Ok(seq)
    }

    /// All rows of a ledger under `owner`, in append order
    pub fn ledger_rows<T: DeserializeOwned>(
        &self,
        ledger: Ledger,
        owner: &str,
    ) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ledger.table())?;

        let mut rows = Vec::new();
        for result in table.range((owner, 0u64)..=(owner, u64::MAX))? {
            let (_key, value) = result?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    // ========== Seeding ==========
    // Self-committing helpers for catalog and account setup

    pub fn save_product(&self, product: &Product) -> StorageResult<()> {
        self.commit_with(|txn| self.put_product(txn, product))
    }

    pub fn save_category(&self, category: &Category) -> StorageResult<()> {
        self.commit_with(|txn| self.put_category(txn, category))
    }

    pub fn save_coupon(&self, coupon: &Coupon) -> StorageResult<()> {
        self.commit_with(|txn| self.put_coupon(txn, coupon))
    }

    pub fn save_user(&self, user: &User) -> StorageResult<()> {
        self.commit_with(|txn| self.put_user(txn, user))
    }

    pub fn set_stock(&self, product_id: &str, size: &str, units: u64) -> StorageResult<()> {
        self.commit_with(|txn| self.write_stock(txn, product_id, size, units))
    }

    pub fn get_product(&self, product_id: &str) -> StorageResult<Option<Product>> {
        self.db.begin_read()?.product(product_id)
    }

    pub fn get_coupon(&self, code: &str) -> StorageResult<Option<Coupon>> {
        self.db.begin_read()?.coupon(code)
    }

    pub fn get_user(&self, user_id: &str) -> StorageResult<Option<User>> {
        self.db.begin_read()?.user(user_id)
    }

    pub fn get_cart(&self, user_id: &str) -> StorageResult<Option<Cart>> {
        self.db.begin_read()?.cart(user_id)
    }

    pub fn get_transaction(&self, transaction_id: &str) -> StorageResult<Option<Transaction>> {
        self.db.begin_read()?.transaction(transaction_id)
    }

    pub fn stock_level(&self, product_id: &str, size: &str) -> StorageResult<u64> {
        Ok(self
            .db
            .begin_read()?
            .read_stock(product_id, size)?
            .unwrap_or(0))
    }

    fn commit_with(
        &self,
        f: impl FnOnce(&WriteTransaction) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        if let Err(e) = f(&txn) {
            txn.abort()?;
            return Err(e);
        }
        txn.commit()?;
        Ok(())
    }
}
