//! Process-local fallback store
//!
//! Holds records whose durable write failed. Volatile: content is lost on
//! restart. Every operation takes the map lock once, so insert and
//! conditional replace are atomic with respect to each other.

use super::{BackendError, BackendResult, ListFilter, OrderBackend};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared::order::{Order, StoreSource};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct FallbackStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl FallbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }

    /// Snapshot of every record held here
    pub fn all(&self) -> Vec<Order> {
        self.orders.read().values().cloned().collect()
    }

    /// Write a record whose durable copy won the read but could not be
    /// updated. A stale copy held here (older than `expected_version`) is
    /// overwritten; a newer one is a conflict.
    pub fn adopt(&self, order: &Order, expected_version: u64) -> BackendResult<()> {
        let mut orders = self.orders.write();
        if let Some(current) = orders.get(&order.id)
            && current.version > expected_version
        {
            return Err(BackendError::VersionConflict {
                id: order.id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    /// Drop the copy of `id` if the durable store now holds `version` or newer.
    /// Returns whether a copy was dropped.
    pub fn discard_superseded(&self, id: &str, version: u64) -> bool {
        let mut orders = self.orders.write();
        match orders.get(id) {
            Some(current) if current.version <= version => {
                orders.remove(id);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl OrderBackend for FallbackStore {
    fn source(&self) -> StoreSource {
        StoreSource::Fallback
    }

    async fn insert(&self, order: &Order) -> BackendResult<()> {
        let mut orders = self.orders.write();
        if orders.contains_key(&order.id) {
            return Err(BackendError::AlreadyExists(order.id.clone()));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> BackendResult<Option<Order>> {
        Ok(self.orders.read().get(id).cloned())
    }

    async fn list(&self, filter: &ListFilter) -> BackendResult<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect())
    }

    /// Conditional write. A record the fallback has never seen is taken over
    /// as-is; this is how an update of a durable record lands here when the
    /// durable write fails.
    async fn replace(&self, order: &Order, expected_version: u64) -> BackendResult<()> {
        let mut orders = self.orders.write();
        if let Some(current) = orders.get(&order.id)
            && current.version != expected_version
        {
            return Err(BackendError::VersionConflict {
                id: order.id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }
}
