//! Real-time fan-out of order events
//!
//! ```text
//! OrderService ──publish──► RealtimeFanout (broadcast)
//!                                │
//!                                ├── Subscription ──► KitchenQueue
//!                                ├── Subscription ──► KanbanBoard
//!                                ├── Subscription ──► SSE stream
//!                                └── run_sink ──► FanoutSink (notification service)
//! ```
//!
//! Per-order ordering is monotonic by revision: an event at or below the
//! last published revision of the same order is dropped. Cross-order
//! ordering is not guaranteed. Delivery is at-least-once from a consumer's
//! point of view; consumers key idempotence on `(orderId, revision)`.

pub mod kanban;
pub mod kitchen;
pub mod view;

pub use kanban::{KanbanBoard, StatusUpdater};
pub use kitchen::KitchenQueue;
pub use view::{LiveOrderView, ViewUpdate};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::Stream;
use shared::order::{OrderEvent, OrderStatus};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Default broadcast buffer
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FanoutError {
    /// Push sink failed; logged, never surfaced to the mutation's caller
    #[error("Fan-out delivery to {sink} failed: {reason}")]
    DeliveryFailure { sink: String, reason: String },

    /// Subscriber fell behind and missed events; re-sync from a snapshot
    #[error("Subscriber lagged, {0} events skipped")]
    Lagged(u64),

    #[error("Fan-out channel closed")]
    Closed,
}

/// Which events a subscriber wants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// Empty means every status. An event matches if its new or previous
    /// status is listed, so consumers also see orders leaving their set.
    pub statuses: Vec<OrderStatus>,
    pub include_test: bool,
}

impl SubscriptionFilter {
    pub fn all() -> Self {
        Self {
            statuses: Vec::new(),
            include_test: true,
        }
    }

    pub fn statuses(statuses: Vec<OrderStatus>) -> Self {
        Self {
            statuses,
            include_test: false,
        }
    }

    pub fn matches(&self, event: &OrderEvent) -> bool {
        if event.snapshot.is_test && !self.include_test {
            return false;
        }
        self.statuses.is_empty()
            || self.statuses.contains(&event.status)
            || event
                .previous_status
                .is_some_and(|prev| self.statuses.contains(&prev))
    }
}

/// Broadcast hub for order events
#[derive(Clone)]
pub struct RealtimeFanout {
    tx: broadcast::Sender<Arc<OrderEvent>>,
    last_revision: Arc<DashMap<String, u64>>,
}

impl std::fmt::Debug for RealtimeFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeFanout")
            .field("subscribers", &self.tx.receiver_count())
            .field("tracked_orders", &self.last_revision.len())
            .finish()
    }
}

impl RealtimeFanout {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            last_revision: Arc::new(DashMap::new()),
        }
    }

    /// Publish an event. Returns false if it was stale and dropped.
    ///
    /// The revision check and the send happen under the same map entry, so
    /// two publishers of one order cannot reorder.
    pub fn publish(&self, event: OrderEvent) -> bool {
        let mut last = self.last_revision.entry(event.order_id.clone()).or_insert(0);
        if event.revision <= *last {
            tracing::debug!(
                order_id = %event.order_id,
                revision = event.revision,
                last = *last,
                "Dropping stale order event"
            );
            return false;
        }
        *last = event.revision;

        let kind = event.kind;
        let order_id = event.order_id.clone();
        // Err only means there are no subscribers right now
        let receivers = self.tx.send(Arc::new(event)).unwrap_or(0);
        tracing::debug!(order_id = %order_id, kind = ?kind, receivers, "Order event published");
        true
    }

    /// Last published revision for an order
    pub fn last_revision(&self, order_id: &str) -> Option<u64> {
        self.last_revision.get(order_id).map(|r| *r)
    }

    /// Stop tracking an order that will not change status again
    pub fn forget(&self, order_id: &str) {
        self.last_revision.remove(order_id);
    }

    pub fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RealtimeFanout {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Filtered event stream
pub struct Subscription {
    rx: broadcast::Receiver<Arc<OrderEvent>>,
    filter: SubscriptionFilter,
}

impl Subscription {
    /// Next matching event
    pub async fn recv(&mut self) -> Result<Arc<OrderEvent>, FanoutError> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => return Err(FanoutError::Lagged(n)),
                Err(broadcast::error::RecvError::Closed) => return Err(FanoutError::Closed),
            }
        }
    }

    /// Already-buffered matching event, without waiting
    pub fn try_recv(&mut self) -> Option<Result<Arc<OrderEvent>, FanoutError>> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(FanoutError::Lagged(n)));
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Some(Err(FanoutError::Closed));
                }
            }
        }
    }

    /// Stream of matching events; a lag is yielded as an error item and the
    /// stream continues, `Closed` ends it
    pub fn into_stream(self) -> impl Stream<Item = Result<Arc<OrderEvent>, FanoutError>> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            match sub.recv().await {
                Err(FanoutError::Closed) => None,
                item => Some((item, sub)),
            }
        })
    }
}

/// Push consumer (notification service), fire-and-forget
#[async_trait]
pub trait FanoutSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, event: &OrderEvent) -> Result<(), FanoutError>;
}

/// Sink that writes order notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl FanoutSink for LogNotifier {
    fn name(&self) -> &str {
        "log_notifier"
    }

    async fn deliver(&self, event: &OrderEvent) -> Result<(), FanoutError> {
        tracing::info!(
            order_id = %event.order_id,
            kind = ?event.kind,
            status = %event.status,
            revision = event.revision,
            "Order notification"
        );
        Ok(())
    }
}

/// Feed a sink from a subscription until shutdown
///
/// Sink failures are logged at `warn` and never retried; a lag is logged and
/// the loop carries on with newer events.
pub async fn run_sink(sink: Arc<dyn FanoutSink>, mut subscription: Subscription, shutdown: CancellationToken) {
    tracing::info!(sink = %sink.name(), "Fan-out sink started");
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = subscription.recv() => next,
        };
        match next {
            Ok(event) => {
                if let Err(e) = sink.deliver(&event).await {
                    tracing::warn!(sink = %sink.name(), order_id = %event.order_id, error = %e, "Fan-out delivery failed");
                }
            }
            Err(FanoutError::Lagged(n)) => {
                tracing::warn!(sink = %sink.name(), skipped = n, "Fan-out sink lagged");
            }
            Err(_) => break,
        }
    }
    tracing::info!(sink = %sink.name(), "Fan-out sink stopped");
}
