//! Kitchen display queue
//!
//! Operational view: test orders are hidden and the queue is oldest-first.

use super::view::{LiveOrderView, ViewUpdate};
use super::{FanoutError, SubscriptionFilter};
use shared::order::{Order, OrderEvent, OrderStatus, ParseStatusError};
use std::sync::Arc;

/// Statuses shown when the caller does not choose
pub const DEFAULT_KITCHEN_STATUSES: [OrderStatus; 3] =
    [OrderStatus::Confirmed, OrderStatus::Preparing, OrderStatus::Ready];

/// Parse a comma separated `statuses` parameter, defaulting to the kitchen set
pub fn parse_statuses(param: Option<&str>) -> Result<Vec<OrderStatus>, ParseStatusError> {
    let Some(raw) = param.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_KITCHEN_STATUSES.to_vec());
    };
    let mut statuses = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let status = part.parse()?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    Ok(statuses)
}

#[derive(Debug, Clone)]
pub struct KitchenQueue {
    view: LiveOrderView,
}

impl KitchenQueue {
    pub fn new(statuses: Vec<OrderStatus>) -> Self {
        Self {
            view: LiveOrderView::new(statuses, false),
        }
    }

    /// Subscription filter matching this queue
    pub fn filter(&self) -> SubscriptionFilter {
        SubscriptionFilter::statuses(self.view.statuses().to_vec())
    }

    /// Manual refresh from a snapshot
    pub fn refresh(&mut self, orders: Vec<Order>) {
        self.view.load(orders);
    }

    pub fn apply(&mut self, event: &OrderEvent) -> bool {
        self.view.apply(event)
    }

    pub fn on_recv(&mut self, result: Result<Arc<OrderEvent>, FanoutError>) -> ViewUpdate {
        self.view.on_recv(result)
    }

    /// Orders to cook, oldest first
    pub fn queue(&self) -> Vec<&Order> {
        self.view.orders()
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }
}

impl Default for KitchenQueue {
    fn default() -> Self {
        Self::new(DEFAULT_KITCHEN_STATUSES.to_vec())
    }
}
