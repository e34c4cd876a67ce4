//! OrderService - orchestration of create / update / cancel
//!
//! # Mutation Flow
//!
//! ```text
//! update_status(id, requested)
//!     ├─ 1. Acquire the per-order lock
//!     ├─ 2. Load current record (durable, or fallback when unreachable)
//!     ├─ 3. Validate via the status machine → effects
//!     ├─ 4. Conditional write at the loaded version
//!     ├─ 5. Execute effects (timers, scheduled tasks)
//!     ├─ 6. Publish the event
//!     └─ 7. Release the lock
//! ```
//!
//! Fan-out happens after the write and never rolls it back.


use super::classifier::OrderClassifier;
use super::error::{OrderError, OrderResult};
use super::fee::FeePolicy;
use super::locks::OrderLocks;
use super::money;
use super::scheduler::TaskScheduler;
use super::status_machine::{self, Effect};
use super::storage::{ListFilter, OrderPatch, OrderStore};
use super::timer::{OverdueOrder, TimerCoordinator};
use super::validation;
use crate::fanout::{RealtimeFanout, StatusUpdater};
use async_trait::async_trait;
use serde::Serialize;
use shared::order::{CreateOrderInput, Order, OrderEvent, OrderEventKind, OrderStatus};
use std::sync::Arc;
use std::time::Duration;

/// Default delay before a pending order confirms itself
pub const DEFAULT_AUTO_CONFIRM_DELAY: Duration = Duration::from_secs(10);

/// Tunables for the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub fee_policy: FeePolicy,
    pub auto_confirm_delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            fee_policy: FeePolicy::default(),
            auto_confirm_delay: DEFAULT_AUTO_CONFIRM_DELAY,
        }
    }
}

/// Per-id failure in a bulk update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub order_id: String,
    pub reason: String,
    pub message: String,
}

/// Partial-success report of a bulk status update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateReport {
    pub requested: usize,
    pub updated: usize,
    pub failed: Vec<BulkFailure>,
}

struct Inner {
    store: OrderStore,
    fanout: RealtimeFanout,
    classifier: OrderClassifier,
    scheduler: TaskScheduler,
    timers: Arc<TimerCoordinator>,
    locks: OrderLocks,
    config: ServiceConfig,
}

/// Order lifecycle orchestrator (cheap to clone)
#[derive(Clone)]
pub struct OrderService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("store", &"<OrderStore>")
            .field("pending_tasks", &self.inner.scheduler.pending())
            .field("timers", &self.inner.timers.len())
            .finish()
    }
}

impl OrderService {
    pub fn new(
        store: OrderStore,
        fanout: RealtimeFanout,
        classifier: OrderClassifier,
        scheduler: TaskScheduler,
        timers: Arc<TimerCoordinator>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                fanout,
                classifier,
                scheduler,
                timers,
                locks: OrderLocks::new(),
                config,
            }),
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.inner.store
    }

    pub fn fanout(&self) -> &RealtimeFanout {
        &self.inner.fanout
    }

    pub fn timers(&self) -> &TimerCoordinator {
        &self.inner.timers
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.inner.scheduler
    }

    pub fn classifier(&self) -> &OrderClassifier {
        &self.inner.classifier
    }

    // ========== Create ==========

    /// Validate, price, classify, persist, schedule auto-confirm, publish
    ///
    /// Returns as soon as the order is stored; the auto-confirm runs later.
    pub async fn create_order(&self, input: CreateOrderInput) -> OrderResult<Order> {
        validation::validate_create(&input)?;

        let amounts =
            money::calculate_amounts(&input.items, input.order_type, &self.inner.config.fee_policy);
        let id = shared::util::generate_order_id();
        let checkout = input.checkout.clone();
        let mut order = Order::from_input(id, input, amounts, shared::util::now_millis());
        self.inner.classifier.apply(&mut order, checkout.as_ref());

        let _guard = self.inner.locks.acquire(&order.id).await;
        let order = self.inner.store.create(order).await?;

        tracing::info!(
            order_id = %order.id,
            order_type = %order.order_type,
            total = order.total,
            is_test = order.is_test,
            source = ?order.source,
            "Order created"
        );

        self.schedule_auto_confirm(&order.id, self.inner.config.auto_confirm_delay);
        self.publish(OrderEventKind::Created, &order, None);
        Ok(order)
    }

    fn schedule_auto_confirm(&self, order_id: &str, delay: Duration) {
        let service = self.clone();
        let id = order_id.to_string();
        self.inner
            .scheduler
            .schedule(order_id, delay, move || async move { service.auto_confirm(&id).await });
    }

    /// Delayed `pending → confirmed`; a no-op if the order moved on meanwhile
    pub async fn auto_confirm(&self, order_id: &str) -> OrderResult<()> {
        let _guard = self.inner.locks.acquire(order_id).await;
        let current = self.inner.store.get_by_id(order_id).await?;
        if current.status != OrderStatus::Pending {
            tracing::debug!(order_id = %order_id, status = %current.status, "Auto-confirm skipped");
            return Ok(());
        }

        let eta = current.order_type.eta_window().to_string();
        let updated = self
            .inner
            .store
            .update(
                order_id,
                current.version,
                OrderPatch::Status {
                    status: OrderStatus::Confirmed,
                    estimated_time: Some(eta),
                },
            )
            .await?;

        tracing::info!(order_id = %order_id, "Order auto-confirmed");
        self.publish(OrderEventKind::StatusChanged, &updated, Some(current.status));
        Ok(())
    }

    // ========== Status ==========

    /// Move an order to `requested`; `estimated_time` overrides the default estimate
    pub async fn update_status(
        &self,
        order_id: &str,
        requested: OrderStatus,
        estimated_time: Option<String>,
    ) -> OrderResult<Order> {
        let guard = self.inner.locks.acquire(order_id).await;
        let current = self.inner.store.get_by_id(order_id).await?;
        let transition = status_machine::transition(current.status, requested, current.order_type)?;

        let estimated_time = estimated_time.or_else(|| {
            (requested == OrderStatus::Preparing && current.estimated_time.is_none())
                .then(|| current.order_type.eta_window().to_string())
        });

        let updated = self
            .inner
            .store
            .update(
                order_id,
                current.version,
                OrderPatch::Status {
                    status: requested,
                    estimated_time,
                },
            )
            .await?;

        tracing::info!(
            order_id = %order_id,
            from = %transition.from,
            to = %transition.to,
            "Order status updated"
        );

        if current.status == OrderStatus::Pending {
            // Manual move out of pending supersedes the auto-confirm
            self.inner.scheduler.cancel(order_id);
        }
        self.apply_effects(order_id, &transition.effects);

        let kind = if requested == OrderStatus::Cancelled {
            OrderEventKind::Cancelled
        } else {
            OrderEventKind::StatusChanged
        };
        self.publish(kind, &updated, Some(current.status));
        self.finish(order_id, &updated, guard);
        Ok(updated)
    }

    /// Cancel a non-terminal order
    pub async fn cancel_order(&self, order_id: &str) -> OrderResult<Order> {
        let guard = self.inner.locks.acquire(order_id).await;
        let current = self.inner.store.get_by_id(order_id).await?;
        if current.is_terminal() {
            return Err(OrderError::OrderFinalized {
                id: current.id,
                status: current.status,
            });
        }
        let transition =
            status_machine::transition(current.status, OrderStatus::Cancelled, current.order_type)?;

        let updated = self.inner.store.cancel(order_id, current.version).await?;
        tracing::info!(order_id = %order_id, from = %current.status, "Order cancelled");

        self.apply_effects(order_id, &transition.effects);
        self.publish(OrderEventKind::Cancelled, &updated, Some(current.status));
        self.finish(order_id, &updated, guard);
        Ok(updated)
    }

    /// Replace the order's notes; allowed in every state
    pub async fn update_notes(&self, order_id: &str, notes: Option<String>) -> OrderResult<Order> {
        let _guard = self.inner.locks.acquire(order_id).await;
        let current = self.inner.store.get_by_id(order_id).await?;
        let notes = notes.filter(|n| !n.trim().is_empty());

        let updated = self
            .inner
            .store
            .update(order_id, current.version, OrderPatch::Notes(notes))
            .await?;
        tracing::debug!(order_id = %order_id, "Order notes updated");
        self.publish(OrderEventKind::NotesUpdated, &updated, None);
        Ok(updated)
    }

    /// Replace the estimated ready time of a non-terminal order
    pub async fn update_estimated_time(&self, order_id: &str, estimated_time: String) -> OrderResult<Order> {
        let _guard = self.inner.locks.acquire(order_id).await;
        let current = self.inner.store.get_by_id(order_id).await?;

        let updated = self
            .inner
            .store
            .update(order_id, current.version, OrderPatch::EstimatedTime(estimated_time))
            .await?;
        tracing::info!(
            order_id = %order_id,
            estimated_time = updated.estimated_time.as_deref().unwrap_or_default(),
            "Order estimated time updated"
        );
        self.publish(OrderEventKind::EstimatedTimeUpdated, &updated, None);
        Ok(updated)
    }

    /// Re-run the classifier on a stored order. Returns the updated order if
    /// it changed, `None` if it was already classified correctly.
    pub async fn reclassify(&self, order_id: &str) -> OrderResult<Option<Order>> {
        let _guard = self.inner.locks.acquire(order_id).await;
        let current = self.inner.store.get_by_id(order_id).await?;

        let mut candidate = current.clone();
        if !self.inner.classifier.apply(&mut candidate, None) {
            return Ok(None);
        }

        let updated = self
            .inner
            .store
            .update(order_id, current.version, OrderPatch::MarkTest)
            .await?;
        tracing::info!(order_id = %order_id, "Order reclassified as test");
        self.publish(OrderEventKind::Reclassified, &updated, None);
        Ok(Some(updated))
    }

    /// Apply one status to many orders; each id succeeds or fails on its own
    pub async fn bulk_update_status(&self, order_ids: &[String], status: OrderStatus) -> BulkUpdateReport {
        let mut report = BulkUpdateReport {
            requested: order_ids.len(),
            updated: 0,
            failed: Vec::new(),
        };

        for id in order_ids {
            let result = if status == OrderStatus::Cancelled {
                self.cancel_order(id).await
            } else {
                self.update_status(id, status, None).await
            };
            match result {
                Ok(_) => report.updated += 1,
                Err(e) => report.failed.push(BulkFailure {
                    order_id: id.clone(),
                    reason: e.reason().to_string(),
                    message: e.to_string(),
                }),
            }
        }

        tracing::info!(
            requested = report.requested,
            updated = report.updated,
            failed = report.failed.len(),
            status = %status,
            "Bulk status update finished"
        );
        report
    }

    // ========== Reads ==========

    pub async fn get_order(&self, order_id: &str) -> OrderResult<Order> {
        self.inner.store.get_by_id(order_id).await
    }

    /// Newest first; all orders when `user_id` is `None`
    pub async fn list_orders(&self, user_id: Option<&str>) -> OrderResult<Vec<Order>> {
        match user_id {
            Some(uid) => self.inner.store.list_by_user(uid).await,
            None => self.inner.store.list_all().await,
        }
    }

    /// Manual-refresh snapshot for the kitchen: listed statuses only, test
    /// orders excluded, oldest created first
    pub async fn kitchen_snapshot(&self, statuses: &[OrderStatus]) -> OrderResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .inner
            .store
            .list(&ListFilter::all())
            .await?
            .into_iter()
            .filter(|o| !o.is_test && statuses.contains(&o.status))
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }

    // ========== Background ==========

    /// Restore process-local state after a restart: prep timers for
    /// `preparing` orders and auto-confirm for `pending` ones
    pub async fn resume(&self) -> OrderResult<usize> {
        let orders = self.inner.store.list_all().await?;
        let mut resumed = 0;
        for order in &orders {
            match order.status {
                OrderStatus::Preparing => {
                    self.inner.timers.rederive(order);
                    resumed += 1;
                }
                OrderStatus::Pending => {
                    self.schedule_auto_confirm(&order.id, self.inner.config.auto_confirm_delay);
                    resumed += 1;
                }
                _ => {}
            }
        }
        tracing::info!(total = orders.len(), resumed, "Order state resumed");
        Ok(resumed)
    }

    /// Log and return every overdue preparation
    pub fn sweep_overdue(&self) -> Vec<OverdueOrder> {
        let overdue = self.inner.timers.overdue_at(shared::util::now_millis());
        for o in &overdue {
            tracing::warn!(
                order_id = %o.order_id,
                elapsed_ms = o.elapsed_ms,
                estimated_minutes = o.estimated_minutes,
                "Order preparation overdue"
            );
        }
        overdue
    }

    // ========== Internals ==========

    fn apply_effects(&self, order_id: &str, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::StartPrepTimer { estimated_minutes } => {
                    self.inner.timers.start(order_id, *estimated_minutes);
                }
                Effect::StopPrepTimer => {
                    self.inner.timers.stop(order_id);
                }
                Effect::CancelScheduled => {
                    self.inner.scheduler.cancel(order_id);
                }
            }
        }
    }

    fn publish(&self, kind: OrderEventKind, order: &Order, previous: Option<OrderStatus>) {
        self.inner
            .fanout
            .publish(OrderEvent::new(kind, order.clone(), previous));
    }

    /// Release the lock; terminal orders also drop their lock and revision entries
    fn finish(&self, order_id: &str, order: &Order, guard: tokio::sync::OwnedMutexGuard<()>) {
        drop(guard);
        if order.is_terminal() {
            self.inner.locks.release(order_id);
            self.inner.fanout.forget(order_id);
        }
    }
}

#[async_trait]
impl StatusUpdater for OrderService {
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> OrderResult<Order> {
        OrderService::update_status(self, order_id, status, None).await
    }
}
