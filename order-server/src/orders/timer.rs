//! Preparation timers
//!
//! Process-local, not persisted. An entry exists while an order is
//! `preparing`; [`TimerCoordinator::rederive`] rebuilds it from the stored
//! record after a restart.

use dashmap::DashMap;
use shared::order::{Order, OrderStatus};

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepTimer {
    /// Unix millis
    pub started_at: i64,
    pub estimated_minutes: u32,
}

impl PrepTimer {
    pub fn elapsed_ms(&self, now: i64) -> i64 {
        (now - self.started_at).max(0)
    }

    pub fn is_overdue(&self, now: i64) -> bool {
        self.elapsed_ms(now) > i64::from(self.estimated_minutes) * MILLIS_PER_MINUTE
    }
}

/// Overdue timer snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueOrder {
    pub order_id: String,
    pub elapsed_ms: i64,
    pub estimated_minutes: u32,
}

#[derive(Debug, Default)]
pub struct TimerCoordinator {
    timers: DashMap<String, PrepTimer>,
}

impl TimerCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, order_id: &str, estimated_minutes: u32) {
        self.start_at(order_id, estimated_minutes, shared::util::now_millis());
    }

    pub fn start_at(&self, order_id: &str, estimated_minutes: u32, started_at: i64) {
        tracing::debug!(order_id = %order_id, estimated_minutes, "Prep timer started");
        self.timers.insert(
            order_id.to_string(),
            PrepTimer {
                started_at,
                estimated_minutes,
            },
        );
    }

    /// Returns true if a timer was running
    pub fn stop(&self, order_id: &str) -> bool {
        self.timers.remove(order_id).is_some()
    }

    pub fn get(&self, order_id: &str) -> Option<PrepTimer> {
        self.timers.get(order_id).map(|t| *t)
    }

    /// Elapsed preparation time in milliseconds
    pub fn elapsed(&self, order_id: &str) -> Option<i64> {
        self.elapsed_at(order_id, shared::util::now_millis())
    }

    pub fn elapsed_at(&self, order_id: &str, now: i64) -> Option<i64> {
        self.get(order_id).map(|t| t.elapsed_ms(now))
    }

    /// Elapsed time exceeds the estimate; false when no timer runs
    pub fn is_overdue(&self, order_id: &str) -> bool {
        self.is_overdue_at(order_id, shared::util::now_millis())
    }

    pub fn is_overdue_at(&self, order_id: &str, now: i64) -> bool {
        self.get(order_id).is_some_and(|t| t.is_overdue(now))
    }

    /// Every overdue timer, most overdue first
    pub fn overdue_at(&self, now: i64) -> Vec<OverdueOrder> {
        let mut overdue: Vec<_> = self
            .timers
            .iter()
            .filter(|entry| entry.value().is_overdue(now))
            .map(|entry| OverdueOrder {
                order_id: entry.key().clone(),
                elapsed_ms: entry.value().elapsed_ms(now),
                estimated_minutes: entry.value().estimated_minutes,
            })
            .collect();
        overdue.sort_by(|a, b| b.elapsed_ms.cmp(&a.elapsed_ms));
        overdue
    }

    /// Rebuild the entry for a stored order: `preparing` orders get a timer
    /// started at `updatedAt` with the default estimate, others lose theirs
    pub fn rederive(&self, order: &Order) {
        if order.status == OrderStatus::Preparing {
            self.start_at(&order.id, order.order_type.default_prep_minutes(), order.updated_at);
        } else {
            self.stop(&order.id);
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{CreateOrderInput, DeliveryAddress, OrderAmounts};

    #[test]
    fn test_elapsed_and_overdue() {
        let timers = TimerCoordinator::new();
        timers.start_at("a", 15, 0);

        assert_eq!(timers.elapsed_at("a", 60_000), Some(60_000));
        assert!(!timers.is_overdue_at("a", 15 * 60_000));
        assert!(timers.is_overdue_at("a", 15 * 60_000 + 1));
        assert_eq!(timers.elapsed_at("missing", 10), None);
        assert!(!timers.is_overdue_at("missing", i64::MAX));
    }

    #[test]
    fn test_stop_removes_entry() {
        let timers = TimerCoordinator::new();
        timers.start("a", 30);
        assert!(timers.elapsed("a").is_some());
        assert!(timers.stop("a"));
        assert!(!timers.stop("a"));
        assert!(timers.is_empty());
    }

    #[test]
    fn test_overdue_sorted_most_late_first() {
        let timers = TimerCoordinator::new();
        timers.start_at("a", 10, 0);
        timers.start_at("b", 10, -10 * 60_000);
        timers.start_at("c", 60, 0);

        let overdue = timers.overdue_at(11 * 60_000);
        let ids: Vec<_> = overdue.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_rederive_from_stored_order() {
        let timers = TimerCoordinator::new();
        let mut order = Order::from_input(
            "a".into(),
            CreateOrderInput::delivery(Vec::new(), DeliveryAddress::default()),
            OrderAmounts::default(),
            1_000,
        );
        order.set_status(OrderStatus::Preparing, None, 5_000);

        timers.rederive(&order);
        assert_eq!(
            timers.get("a"),
            Some(PrepTimer {
                started_at: 5_000,
                estimated_minutes: 30
            })
        );

        order.set_status(OrderStatus::Ready, None, 6_000);
        timers.rederive(&order);
        assert!(timers.get("a").is_none());
    }
}
