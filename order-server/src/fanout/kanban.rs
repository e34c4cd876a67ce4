//! Kanban board with optimistic card moves
//!
//! A move is shown immediately, sent to the server, and rolled back with
//! the error surfaced if the server rejects it.

use super::view::{LiveOrderView, ViewUpdate};
use super::{FanoutError, SubscriptionFilter};
use crate::orders::error::{OrderError, OrderResult};
use async_trait::async_trait;
use shared::order::{Order, OrderEvent, OrderStatus};
use std::sync::Arc;

/// Columns of the board
pub const KANBAN_COLUMNS: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::OutForDelivery,
];

/// Server side of a card move
#[async_trait]
pub trait StatusUpdater: Send + Sync {
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> OrderResult<Order>;
}

pub struct KanbanBoard {
    view: LiveOrderView,
    updater: Arc<dyn StatusUpdater>,
}

impl KanbanBoard {
    pub fn new(updater: Arc<dyn StatusUpdater>) -> Self {
        Self {
            view: LiveOrderView::new(KANBAN_COLUMNS.to_vec(), false),
            updater,
        }
    }

    pub fn filter(&self) -> SubscriptionFilter {
        SubscriptionFilter::statuses(KANBAN_COLUMNS.to_vec())
    }

    pub fn refresh(&mut self, orders: Vec<Order>) {
        self.view.load(orders);
    }

    pub fn apply(&mut self, event: &OrderEvent) -> bool {
        self.view.apply(event)
    }

    pub fn on_recv(&mut self, result: Result<Arc<OrderEvent>, FanoutError>) -> ViewUpdate {
        self.view.on_recv(result)
    }

    /// Cards per column, oldest first within a column
    pub fn columns(&self) -> Vec<(OrderStatus, Vec<&Order>)> {
        let orders = self.view.orders();
        KANBAN_COLUMNS
            .iter()
            .map(|status| {
                let cards = orders.iter().copied().filter(|o| o.status == *status).collect();
                (*status, cards)
            })
            .collect()
    }

    pub fn card(&self, order_id: &str) -> Option<&Order> {
        self.view.get(order_id)
    }

    /// Move a card, optimistically
    pub async fn move_card(&mut self, order_id: &str, to: OrderStatus) -> OrderResult<Order> {
        let pending = self
            .view
            .begin_move(order_id, to)
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        match self.updater.update_status(order_id, to).await {
            Ok(confirmed) => {
                self.view.commit(pending, confirmed.clone());
                Ok(confirmed)
            }
            Err(e) => {
                tracing::warn!(order_id = %order_id, to = %to, error = %e, "Card move rejected, rolling back");
                self.view.rollback(pending);
                Err(e)
            }
        }
    }
}
