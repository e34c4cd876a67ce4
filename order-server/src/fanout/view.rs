//! Client-side live view of orders
//!
//! Shared by the kitchen queue and the kanban board. Events are applied
//! idempotently by revision, so duplicates and late deliveries are harmless.
//! Local optimistic changes can be committed or rolled back.

use super::FanoutError;
use shared::order::{Order, OrderEvent, OrderStatus};
use std::collections::{HashMap, HashSet};

/// Outcome of feeding one subscription result into a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUpdate {
    Applied,
    /// Duplicate or stale revision
    Ignored,
    /// Events were missed; reload from a snapshot
    ResyncRequired,
    Closed,
}

/// Local optimistic move awaiting confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    pub order_id: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    previous: Order,
}

#[derive(Debug, Clone)]
pub struct LiveOrderView {
    statuses: Vec<OrderStatus>,
    include_test: bool,
    orders: HashMap<String, Order>,
    /// Highest revision seen per order, including orders not shown. Reset
    /// to the snapshot's ids on every `load`.
    revisions: HashMap<String, u64>,
}

impl LiveOrderView {
    pub fn new(statuses: Vec<OrderStatus>, include_test: bool) -> Self {
        Self {
            statuses,
            include_test,
            orders: HashMap::new(),
            revisions: HashMap::new(),
        }
    }

    pub fn statuses(&self) -> &[OrderStatus] {
        &self.statuses
    }

    fn is_visible(&self, order: &Order) -> bool {
        (self.include_test || !order.is_test)
            && (self.statuses.is_empty() || self.statuses.contains(&order.status))
    }

    /// Replace the view's content with a fresh snapshot. Revisions of orders
    /// absent from it are forgotten.
    pub fn load(&mut self, orders: Vec<Order>) {
        self.orders.clear();
        {
            let ids: HashSet<&str> = orders.iter().map(|o| o.id.as_str()).collect();
            self.revisions.retain(|id, _| ids.contains(id.as_str()));
        }
        for order in orders {
            let seen = self.revisions.entry(order.id.clone()).or_insert(0);
            *seen = order.version.max(*seen);
            if self.is_visible(&order) {
                self.orders.insert(order.id.clone(), order);
            }
        }
    }

    /// Apply a server-confirmed record. Returns false if it was not newer
    /// than what the view has already seen.
    pub fn apply_order(&mut self, order: Order) -> bool {
        let seen = self.revisions.entry(order.id.clone()).or_insert(0);
        if order.version <= *seen {
            return false;
        }
        *seen = order.version;

        if self.is_visible(&order) {
            self.orders.insert(order.id.clone(), order);
        } else {
            self.orders.remove(&order.id);
        }
        true
    }

    pub fn apply(&mut self, event: &OrderEvent) -> bool {
        self.apply_order(event.snapshot.clone())
    }

    /// Feed a `Subscription::recv` result
    pub fn on_recv(&mut self, result: Result<std::sync::Arc<OrderEvent>, FanoutError>) -> ViewUpdate {
        match result {
            Ok(event) if self.apply(&event) => ViewUpdate::Applied,
            Ok(_) => ViewUpdate::Ignored,
            Err(FanoutError::Lagged(_)) => ViewUpdate::ResyncRequired,
            Err(FanoutError::Closed) => ViewUpdate::Closed,
            Err(FanoutError::DeliveryFailure { .. }) => ViewUpdate::Ignored,
        }
    }

    /// Move a card locally before the server confirms
    pub fn begin_move(&mut self, order_id: &str, to: OrderStatus) -> Option<PendingMove> {
        let current = self.orders.get(order_id)?.clone();
        let pending = PendingMove {
            order_id: order_id.to_string(),
            from: current.status,
            to,
            previous: current.clone(),
        };

        let mut moved = current;
        moved.status = to;
        if self.is_visible(&moved) {
            self.orders.insert(order_id.to_string(), moved);
        } else {
            self.orders.remove(order_id);
        }
        Some(pending)
    }

    /// Server confirmed: its record replaces the optimistic one
    pub fn commit(&mut self, pending: PendingMove, confirmed: Order) {
        debug_assert_eq!(pending.order_id, confirmed.id);
        if !self.apply_order(confirmed) {
            // An event already delivered a newer revision; keep that
            tracing::debug!(order_id = %pending.order_id, "Confirmed move superseded by newer event");
        }
    }

    /// Server rejected: restore the pre-move record unless a newer revision
    /// has arrived in the meantime
    pub fn rollback(&mut self, pending: PendingMove) {
        let seen = self.revisions.get(&pending.order_id).copied().unwrap_or(0);
        if seen > pending.previous.version {
            return;
        }
        if self.is_visible(&pending.previous) {
            self.orders.insert(pending.order_id.clone(), pending.previous);
        } else {
            self.orders.remove(&pending.order_id);
        }
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// Visible orders, oldest created first
    pub fn orders(&self) -> Vec<&Order> {
        let mut orders: Vec<_> = self.orders.values().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Number of orders whose revision is tracked, shown or not
    pub fn tracked(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
