//! Order record - the typed value persisted by both backends
//!
//! There is no generic patch type: every mutation goes through a named
//! method on [`Order`], so an arbitrary overwrite cannot be expressed.

use super::types::{
    ContactInfo, CreateOrderInput, DeliveryAddress, OrderItem, OrderMetadata, OrderType,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order status
///
/// Declaration order is the lifecycle order; `Cancelled` sits outside the
/// forward sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Position in the forward sequence, `None` for `Cancelled`
    pub fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::Ready => Some(3),
            OrderStatus::OutForDelivery => Some(4),
            OrderStatus::Delivered => Some(5),
            OrderStatus::Completed => Some(6),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Completed | OrderStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Which backend holds the authoritative copy of a record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreSource {
    #[default]
    Durable,
    Fallback,
}

/// Order record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Order {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub order_type: OrderType,
    pub contact_info: ContactInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<DeliveryAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<String>,
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_fee: f64,
    pub total: f64,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: OrderMetadata,
    #[serde(default)]
    pub source: StoreSource,
    /// Revision, starts at 1 and increments on every persisted mutation
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Monetary fields computed once at creation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrderAmounts {
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_fee: f64,
    pub total: f64,
}

impl Order {
    /// Build a fresh `pending` record from validated input
    pub fn from_input(id: String, input: CreateOrderInput, amounts: OrderAmounts, now: i64) -> Self {
        let metadata = OrderMetadata {
            is_test: false,
            checkout_session_id: input.checkout.as_ref().and_then(|c| c.session_id.clone()),
        };
        Self {
            id,
            user_id: input.user_id,
            items: input.items,
            order_type: input.order_type,
            contact_info: input.contact_info,
            delivery_address: input.delivery_address,
            pickup_location: input.pickup_location,
            subtotal: amounts.subtotal,
            tax: amounts.tax,
            delivery_fee: amounts.delivery_fee,
            total: amounts.total,
            status: OrderStatus::Pending,
            estimated_time: None,
            notes: input.notes,
            is_test: input.is_test,
            tags: input.tags,
            metadata,
            source: StoreSource::Durable,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Apply a validated status move
    pub fn set_status(&mut self, status: OrderStatus, estimated_time: Option<String>, now: i64) {
        self.status = status;
        if let Some(eta) = estimated_time {
            self.estimated_time = Some(eta);
        }
        self.touch(now);
    }

    pub fn set_notes(&mut self, notes: Option<String>, now: i64) {
        self.notes = notes;
        self.touch(now);
    }

    /// Bump revision and `updatedAt`
    pub fn touch(&mut self, now: i64) {
        self.version += 1;
        self.updated_at = now.max(self.updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Order {
        let input = CreateOrderInput::pickup(
            vec![OrderItem {
                id: "burger".into(),
                name: "Burger".into(),
                price: 10.0,
                quantity: 1,
                customizations: None,
            }],
            "Main St",
        );
        Order::from_input("ORD-1-abcdefgh".into(), input, OrderAmounts::default(), 1_000)
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("ready".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
        assert_eq!(
            "out_for_delivery".parse::<OrderStatus>().unwrap(),
            OrderStatus::OutForDelivery
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![
                OrderStatus::Delivered,
                OrderStatus::Completed,
                OrderStatus::Cancelled
            ]
        );
    }

    #[test]
    fn test_from_input_starts_pending_at_version_one() {
        let order = sample();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.version, 1);
        assert_eq!(order.created_at, order.updated_at);
        assert_eq!(order.source, StoreSource::Durable);
    }

    #[test]
    fn test_set_status_bumps_version_and_keeps_created_at() {
        let mut order = sample();
        order.set_status(OrderStatus::Confirmed, Some("15-20 minutes".into()), 2_000);
        assert_eq!(order.version, 2);
        assert_eq!(order.created_at, 1_000);
        assert_eq!(order.updated_at, 2_000);
        assert_eq!(order.estimated_time.as_deref(), Some("15-20 minutes"));

        // Clock going backwards never moves updatedAt back
        order.set_notes(Some("no onions".into()), 1_500);
        assert_eq!(order.updated_at, 2_000);
        assert_eq!(order.version, 3);
    }

    #[test]
    fn test_order_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("orderType").is_some());
        assert!(json.get("contactInfo").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["source"], "durable");
    }
}
