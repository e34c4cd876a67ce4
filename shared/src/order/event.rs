//! Order events - fan-out unit published after a mutation is persisted

use super::snapshot::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// What happened to the order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    StatusChanged,
    Cancelled,
    NotesUpdated,
    EstimatedTimeUpdated,
    Reclassified,
}

/// Order event
///
/// `revision` equals `snapshot.version`; consumers use it to drop
/// duplicates and stale deliveries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub event_id: String,
    pub order_id: String,
    pub kind: OrderEventKind,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<OrderStatus>,
    pub revision: u64,
    pub snapshot: Order,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
}

impl OrderEvent {
    pub fn new(kind: OrderEventKind, snapshot: Order, previous_status: Option<OrderStatus>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            order_id: snapshot.id.clone(),
            kind,
            status: snapshot.status,
            previous_status,
            revision: snapshot.version,
            timestamp: crate::util::now_millis(),
            snapshot,
        }
    }
}
