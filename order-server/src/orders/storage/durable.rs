//! redb-based durable backend
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Order records |
//!
//! redb commits are copy-on-write with an atomic pointer swap, so the file is
//! always in a consistent state. Conditional writes run inside a single write
//! transaction; redb serializes writers, which makes read-compare-write atomic.

use super::{BackendError, BackendResult, ListFilter, OrderBackend};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::order::{Order, StoreSource};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// redb errors
#[derive(Debug, Error)]
pub enum RedbError {
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
}

impl From<RedbError> for BackendError {
    fn from(err: RedbError) -> Self {
        BackendError::Unavailable(err.to_string())
    }
}

fn db_err(err: impl Into<RedbError>) -> BackendError {
    err.into().into()
}

/// Durable order backend backed by redb
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RedbError> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self, RedbError> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self, RedbError> {
        // Create tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn read_order(&self, id: &str) -> BackendResult<Option<Order>> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(ORDERS_TABLE).map_err(db_err)?;
        match table.get(id).map_err(db_err)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderBackend for RedbBackend {
    fn source(&self) -> StoreSource {
        StoreSource::Durable
    }

    async fn insert(&self, order: &Order) -> BackendResult<()> {
        let value = serde_json::to_vec(order)?;
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(ORDERS_TABLE).map_err(db_err)?;
            if table.get(order.id.as_str()).map_err(db_err)?.is_some() {
                return Err(BackendError::AlreadyExists(order.id.clone()));
            }
            table
                .insert(order.id.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: &str) -> BackendResult<Option<Order>> {
        self.read_order(id)
    }

    async fn list(&self, filter: &ListFilter) -> BackendResult<Vec<Order>> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(ORDERS_TABLE).map_err(db_err)?;

        let mut orders = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (_, value) = entry.map_err(db_err)?;
            let order: Order = serde_json::from_slice(value.value())?;
            if filter.matches(&order) {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn replace(&self, order: &Order, expected_version: u64) -> BackendResult<()> {
        let value = serde_json::to_vec(order)?;
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(ORDERS_TABLE).map_err(db_err)?;
            let current: Order = match table.get(order.id.as_str()).map_err(db_err)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => return Err(BackendError::NotFound(order.id.clone())),
            };
            if current.version != expected_version {
                return Err(BackendError::VersionConflict {
                    id: order.id.clone(),
                    expected: expected_version,
                    actual: current.version,
                });
            }
            table
                .insert(order.id.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }
}

/// Durable backend that could not be opened
///
/// Every call reports `Unavailable`, so the store runs on the fallback.
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    reason: String,
}

impl OfflineBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unavailable<T>(&self) -> BackendResult<T> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl OrderBackend for OfflineBackend {
    fn source(&self) -> StoreSource {
        StoreSource::Durable
    }

    async fn insert(&self, _order: &Order) -> BackendResult<()> {
        self.unavailable()
    }

    async fn get(&self, _id: &str) -> BackendResult<Option<Order>> {
        self.unavailable()
    }

    async fn list(&self, _filter: &ListFilter) -> BackendResult<Vec<Order>> {
        self.unavailable()
    }

    async fn replace(&self, _order: &Order, _expected_version: u64) -> BackendResult<()> {
        self.unavailable()
    }
}
