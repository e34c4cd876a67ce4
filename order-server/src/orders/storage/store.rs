//! OrderStore - uniform CRUD over the durable backend and the fallback
//!
//! Failure semantics:
//! - durable error (unreachable) → `warn`, retried once on the fallback
//! - reads consult both backends; the higher `version` of a record wins
//! - both fail → `StorageUnavailable`, logged at `error`
//! - version mismatch → `ConcurrentModification`, never an overwrite

use super::{BackendError, FallbackStore, ListFilter, OrderBackend, sort_newest_first};
use crate::orders::classifier;
use crate::orders::error::{OrderError, OrderResult};
use crate::orders::status_machine;
use shared::order::{Order, OrderStatus, StoreSource};
use std::collections::HashMap;
use std::sync::Arc;

/// The only mutations the store accepts
#[derive(Debug, Clone, PartialEq)]
pub enum OrderPatch {
    /// Status move already validated by the status machine
    Status {
        status: OrderStatus,
        estimated_time: Option<String>,
    },
    EstimatedTime(String),
    Notes(Option<String>),
    /// Add the test classification (tag, flag, metadata)
    MarkTest,
}

impl OrderPatch {
    /// Apply to a record. Terminal orders only accept notes and classification.
    pub fn apply(self, order: &mut Order, now: i64) -> OrderResult<()> {
        match self {
            OrderPatch::Status {
                status,
                estimated_time,
            } => {
                ensure_mutable(order)?;
                if !status_machine::can_transition(order.status, status) {
                    return Err(OrderError::InvalidTransition {
                        from: order.status,
                        to: status,
                    });
                }
                order.set_status(status, estimated_time, now);
            }
            OrderPatch::EstimatedTime(eta) => {
                ensure_mutable(order)?;
                order.estimated_time = Some(eta);
                order.touch(now);
            }
            OrderPatch::Notes(notes) => order.set_notes(notes, now),
            OrderPatch::MarkTest => {
                if classifier::mark_test(order) {
                    order.touch(now);
                }
            }
        }
        Ok(())
    }
}

fn ensure_mutable(order: &Order) -> OrderResult<()> {
    if order.is_terminal() {
        return Err(OrderError::OrderFinalized {
            id: order.id.clone(),
            status: order.status,
        });
    }
    Ok(())
}

/// Dual-backend order store
#[derive(Clone)]
pub struct OrderStore {
    durable: Arc<dyn OrderBackend>,
    fallback: Arc<FallbackStore>,
}

impl OrderStore {
    pub fn new(durable: Arc<dyn OrderBackend>, fallback: Arc<FallbackStore>) -> Self {
        Self { durable, fallback }
    }

    pub fn fallback(&self) -> &Arc<FallbackStore> {
        &self.fallback
    }

    /// Whether the durable backend currently answers reads
    pub async fn durable_reachable(&self) -> bool {
        self.durable.get("").await.is_ok()
    }

    /// Persist a new order; durable first, fallback on failure
    pub async fn create(&self, mut order: Order) -> OrderResult<Order> {
        order.source = StoreSource::Durable;
        let durable_err = match self.durable.insert(&order).await {
            Ok(()) => {
                tracing::debug!(order_id = %order.id, "Order persisted to durable store");
                return Ok(order);
            }
            Err(BackendError::AlreadyExists(id)) => {
                return Err(OrderError::ConcurrentModification { id, expected: 0 });
            }
            Err(e) => e,
        };

        tracing::warn!(
            order_id = %order.id,
            error = %durable_err,
            "Durable write failed, writing order to fallback store"
        );
        order.source = StoreSource::Fallback;
        match self.fallback.insert(&order).await {
            Ok(()) => Ok(order),
            Err(BackendError::AlreadyExists(id)) => {
                Err(OrderError::ConcurrentModification { id, expected: 0 })
            }
            Err(e) => Err(self.both_failed(&order.id, &durable_err, &e)),
        }
    }

    /// Reads both backends and returns the copy with the higher `version`.
    /// A record the fallback took over after a failed durable write stays
    /// visible once the durable store answers again.
    pub async fn get_by_id(&self, id: &str) -> OrderResult<Order> {
        let durable = self.durable.get(id).await;
        let fallback = self.fallback.get(id).await;
        let found = match (durable, fallback) {
            (Ok(durable), Ok(fallback)) => newer(durable, fallback),
            (Err(durable_err), Ok(fallback)) => {
                tracing::warn!(order_id = %id, error = %durable_err, "Durable read failed, reading fallback store");
                fallback
            }
            (Ok(durable), Err(fallback_err)) => {
                tracing::warn!(order_id = %id, error = %fallback_err, "Fallback read failed");
                durable
            }
            (Err(durable_err), Err(fallback_err)) => {
                return Err(self.both_failed(id, &durable_err, &fallback_err));
            }
        };
        found.ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    /// Orders of one user, newest first
    pub async fn list_by_user(&self, user_id: &str) -> OrderResult<Vec<Order>> {
        self.list(&ListFilter::by_user(user_id)).await
    }

    /// All orders, newest first
    pub async fn list_all(&self) -> OrderResult<Vec<Order>> {
        self.list(&ListFilter::all()).await
    }

    /// Filtered list, newest first, merged by id with the same rule as
    /// [`get_by_id`](Self::get_by_id)
    pub async fn list(&self, filter: &ListFilter) -> OrderResult<Vec<Order>> {
        let durable = self.durable.list(filter).await;
        let fallback = self.fallback.list(filter).await;
        let (durable, fallback) = match (durable, fallback) {
            (Ok(durable), Ok(fallback)) => (durable, fallback),
            (Err(durable_err), Ok(fallback)) => {
                tracing::warn!(error = %durable_err, "Durable list failed, listing fallback store");
                (Vec::new(), fallback)
            }
            (Ok(durable), Err(fallback_err)) => {
                tracing::warn!(error = %fallback_err, "Fallback list failed");
                (durable, Vec::new())
            }
            (Err(durable_err), Err(fallback_err)) => {
                return Err(self.both_failed("*", &durable_err, &fallback_err));
            }
        };

        let mut merged: HashMap<String, Order> =
            durable.into_iter().map(|o| (o.id.clone(), o)).collect();
        for order in fallback {
            match merged.get(&order.id) {
                Some(existing) if existing.version >= order.version => {}
                _ => {
                    merged.insert(order.id.clone(), order);
                }
            }
        }

        let mut orders: Vec<Order> = merged.into_values().collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    /// Apply a patch to the order at `expected_version`
    ///
    /// The write goes to the backend whose copy won the read; a durable write
    /// that fails lands in the fallback, tagged `source: fallback`.
    pub async fn update(&self, id: &str, expected_version: u64, patch: OrderPatch) -> OrderResult<Order> {
        let current = self.get_by_id(id).await?;
        if current.version != expected_version {
            return Err(OrderError::ConcurrentModification {
                id: id.to_string(),
                expected: expected_version,
            });
        }

        let mut updated = current.clone();
        patch.apply(&mut updated, shared::util::now_millis())?;
        self.write(updated, current.version).await
    }

    /// Terminal-state guard, then a status update to `cancelled`
    pub async fn cancel(&self, id: &str, expected_version: u64) -> OrderResult<Order> {
        let current = self.get_by_id(id).await?;
        ensure_mutable(&current)?;
        self.update(
            id,
            expected_version,
            OrderPatch::Status {
                status: OrderStatus::Cancelled,
                estimated_time: None,
            },
        )
        .await
    }

    /// Every record the fallback holds a newer copy of (drift to reconcile)
    pub fn pending_reconciliation(&self) -> Vec<Order> {
        let mut orders = self.fallback.all();
        sort_newest_first(&mut orders);
        orders
    }

    async fn write(&self, mut order: Order, expected_version: u64) -> OrderResult<Order> {
        if order.source == StoreSource::Durable {
            let durable_err = match self.durable.replace(&order, expected_version).await {
                Ok(()) => {
                    if self.fallback.discard_superseded(&order.id, order.version) {
                        tracing::debug!(order_id = %order.id, "Dropped superseded fallback copy");
                    }
                    return Ok(order);
                }
                Err(e @ BackendError::VersionConflict { .. }) => return Err(conflict(e)),
                Err(e) => e,
            };
            tracing::warn!(
                order_id = %order.id,
                error = %durable_err,
                "Durable update failed, writing order to fallback store"
            );
            order.source = StoreSource::Fallback;
            return match self.fallback.adopt(&order, expected_version) {
                Ok(()) => Ok(order),
                Err(e @ BackendError::VersionConflict { .. }) => Err(conflict(e)),
                Err(e) => Err(self.both_failed(&order.id, &durable_err, &e)),
            };
        }

        match self.fallback.replace(&order, expected_version).await {
            Ok(()) => Ok(order),
            Err(e @ BackendError::VersionConflict { .. }) => Err(conflict(e)),
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Fallback update failed");
                Err(OrderError::StorageUnavailable(e.to_string()))
            }
        }
    }

    fn both_failed(&self, id: &str, durable: &BackendError, fallback: &BackendError) -> OrderError {
        tracing::error!(
            order_id = %id,
            durable_error = %durable,
            fallback_error = %fallback,
            "Both order backends failed"
        );
        OrderError::StorageUnavailable(format!("durable: {}; fallback: {}", durable, fallback))
    }
}

/// Higher version wins; the durable copy wins a tie
fn newer(durable: Option<Order>, fallback: Option<Order>) -> Option<Order> {
    match (durable, fallback) {
        (Some(durable), Some(fallback)) if fallback.version > durable.version => Some(fallback),
        (Some(durable), _) => Some(durable),
        (None, fallback) => fallback,
    }
}

fn conflict(err: BackendError) -> OrderError {
    match err {
        BackendError::VersionConflict { id, expected, .. } => {
            OrderError::ConcurrentModification { id, expected }
        }
        other => OrderError::StorageUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::testing::FlakyWrites;
    use crate::orders::storage::{OfflineBackend, RedbBackend};
    use shared::order::{CreateOrderInput, OrderAmounts};

    fn order(id: &str, user: Option<&str>, created_at: i64) -> Order {
        let mut input = CreateOrderInput::pickup(Vec::new(), "Downtown");
        input.user_id = user.map(str::to_string);
        Order::from_input(id.into(), input, OrderAmounts::default(), created_at)
    }

    fn durable_store() -> OrderStore {
        OrderStore::new(
            Arc::new(RedbBackend::open_in_memory().unwrap()),
            Arc::new(FallbackStore::new()),
        )
    }

    fn flaky_store() -> (OrderStore, Arc<FlakyWrites>) {
        let durable = Arc::new(FlakyWrites::new());
        let store = OrderStore::new(durable.clone(), Arc::new(FallbackStore::new()));
        (store, durable)
    }

    fn status(status: OrderStatus) -> OrderPatch {
        OrderPatch::Status {
            status,
            estimated_time: None,
        }
    }

    fn offline_store() -> OrderStore {
        OrderStore::new(
            Arc::new(OfflineBackend::new("offline")),
            Arc::new(FallbackStore::new()),
        )
    }

    #[tokio::test]
    async fn test_create_durable() {
        let store = durable_store();
        let created = store.create(order("a", None, 1)).await.unwrap();
        assert_eq!(created.source, StoreSource::Durable);
        assert!(store.pending_reconciliation().is_empty());
        assert_eq!(store.get_by_id("a").await.unwrap().source, StoreSource::Durable);
    }

    #[tokio::test]
    async fn test_fallback_read_after_write() {
        let store = offline_store();
        let created = store.create(order("a", Some("u1"), 1)).await.unwrap();
        assert_eq!(created.source, StoreSource::Fallback);

        let loaded = store.get_by_id("a").await.unwrap();
        assert_eq!(loaded.source, StoreSource::Fallback);
        assert_eq!(store.list_by_user("u1").await.unwrap().len(), 1);
        assert_eq!(store.pending_reconciliation().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let store = durable_store();
        assert_eq!(
            store.get_by_id("nope").await.unwrap_err(),
            OrderError::NotFound("nope".into())
        );
        let store = offline_store();
        assert_eq!(
            store.get_by_id("nope").await.unwrap_err(),
            OrderError::NotFound("nope".into())
        );
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = durable_store();
        store.create(order("old", Some("u1"), 1)).await.unwrap();
        store.create(order("new", Some("u1"), 3)).await.unwrap();
        store.create(order("other", Some("u2"), 2)).await.unwrap();

        let ids: Vec<_> = store
            .list_by_user("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_requires_expected_version() {
        let store = durable_store();
        store.create(order("a", None, 1)).await.unwrap();

        let patch = OrderPatch::Status {
            status: OrderStatus::Confirmed,
            estimated_time: Some("15-20 minutes".into()),
        };
        let updated = store.update("a", 1, patch.clone()).await.unwrap();
        assert_eq!(updated.version, 2);

        let err = store.update("a", 1, patch).await.unwrap_err();
        assert!(matches!(err, OrderError::ConcurrentModification { .. }));
    }

    #[tokio::test]
    async fn test_cancel_guard() {
        let store = durable_store();
        store.create(order("a", None, 1)).await.unwrap();
        let cancelled = store.cancel("a", 1).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let err = store.cancel("a", cancelled.version).await.unwrap_err();
        assert_eq!(
            err,
            OrderError::OrderFinalized {
                id: "a".into(),
                status: OrderStatus::Cancelled
            }
        );
    }

    #[tokio::test]
    async fn test_terminal_order_accepts_notes_only() {
        let store = durable_store();
        store.create(order("a", None, 1)).await.unwrap();
        let done = store
            .update(
                "a",
                1,
                OrderPatch::Status {
                    status: OrderStatus::Completed,
                    estimated_time: None,
                },
            )
            .await
            .unwrap();

        let err = store
            .update("a", done.version, OrderPatch::EstimatedTime("soon".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderFinalized { .. }));

        let noted = store
            .update("a", done.version, OrderPatch::Notes(Some("left at door".into())))
            .await
            .unwrap();
        assert_eq!(noted.notes.as_deref(), Some("left at door"));
        assert_eq!(noted.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_fallback_record() {
        let store = offline_store();
        store.create(order("a", None, 1)).await.unwrap();
        let updated = store
            .update(
                "a",
                1,
                OrderPatch::Status {
                    status: OrderStatus::Preparing,
                    estimated_time: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.source, StoreSource::Fallback);
        assert_eq!(store.get_by_id("a").await.unwrap().status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_mark_test_patch_is_idempotent() {
        let store = durable_store();
        store.create(order("a", None, 1)).await.unwrap();
        let marked = store.update("a", 1, OrderPatch::MarkTest).await.unwrap();
        assert!(marked.is_test && marked.metadata.is_test);
        assert_eq!(marked.version, 2);

        let again = store.update("a", 2, OrderPatch::MarkTest).await.unwrap();
        assert_eq!(again.version, 2);
    }

    #[tokio::test]
    async fn test_fallback_created_order_survives_durable_recovery() {
        let (store, durable) = flaky_store();
        durable.fail_writes(true);
        let created = store.create(order("a", Some("u1"), 1)).await.unwrap();
        assert_eq!(created.source, StoreSource::Fallback);
        durable.fail_writes(false);

        // Durable answers Ok(None) for this id; the fallback copy still wins
        let loaded = store.get_by_id("a").await.unwrap();
        assert_eq!(loaded.source, StoreSource::Fallback);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert_eq!(store.list_by_user("u1").await.unwrap().len(), 1);

        let updated = store.update("a", 1, status(OrderStatus::Confirmed)).await.unwrap();
        assert_eq!(updated.source, StoreSource::Fallback);
        assert_eq!(store.get_by_id("a").await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_cancel_written_to_fallback_stays_cancelled() {
        let (store, durable) = flaky_store();
        store.create(order("a", None, 1)).await.unwrap();

        durable.fail_writes(true);
        let cancelled = store.cancel("a", 1).await.unwrap();
        assert_eq!(cancelled.source, StoreSource::Fallback);
        durable.fail_writes(false);

        // Durable still holds the pending v1 copy
        let loaded = store.get_by_id("a").await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Cancelled);
        assert_eq!(loaded.version, 2);

        let err = store.update("a", 2, status(OrderStatus::Confirmed)).await.unwrap_err();
        assert!(matches!(err, OrderError::OrderFinalized { .. }));

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, OrderStatus::Cancelled);
        assert_eq!(store.pending_reconciliation().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_fallback_copy_is_overwritten_and_dropped() {
        let (store, durable) = flaky_store();
        store.create(order("a", None, 1)).await.unwrap();

        // Durable moves ahead while a v1 copy sits in the fallback
        store.fallback().insert(&order("a", None, 1)).await.unwrap();
        store.update("a", 1, status(OrderStatus::Confirmed)).await.unwrap();
        assert!(store.pending_reconciliation().is_empty());

        store.fallback().insert(&order("a", None, 1)).await.unwrap();
        durable.fail_writes(true);
        let preparing = store.update("a", 2, status(OrderStatus::Preparing)).await.unwrap();
        assert_eq!(preparing.source, StoreSource::Fallback);
        assert_eq!(store.get_by_id("a").await.unwrap().version, 3);
    }
}
