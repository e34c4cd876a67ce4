//! Shared value types for orders

use serde::{Deserialize, Serialize};

// ============================================================================
// Order Type
// ============================================================================

/// How the order reaches the customer. Immutable after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Delivery,
    Pickup,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Delivery => "delivery",
            OrderType::Pickup => "pickup",
        }
    }

    /// Default preparation estimate used by the prep timer
    pub fn default_prep_minutes(&self) -> u32 {
        match self {
            OrderType::Pickup => 15,
            OrderType::Delivery => 30,
        }
    }

    /// Customer-facing estimate set when the order is confirmed
    pub fn eta_window(&self) -> &'static str {
        match self {
            OrderType::Pickup => "15-20 minutes",
            OrderType::Delivery => "30-45 minutes",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Items & Contact
// ============================================================================

/// Line item as stored on the order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Signed so that a bad quantity reaches validation instead of failing to parse
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactInfo {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeliveryAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl DeliveryAddress {
    pub fn is_blank(&self) -> bool {
        self.street.trim().is_empty()
    }
}

// ============================================================================
// Metadata & Classification
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetadata {
    #[serde(default)]
    pub is_test: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,
}

/// Checkout session summary handed over by the checkout normalizer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckoutSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Amount in major currency units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Order creation payload. Unknown fields are rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub order_type: OrderType,
    #[serde(default)]
    pub contact_info: ContactInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<DeliveryAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout: Option<CheckoutSummary>,
}

impl CreateOrderInput {
    /// Minimal pickup input, used by tests and tooling
    pub fn pickup(items: Vec<OrderItem>, location: impl Into<String>) -> Self {
        Self {
            user_id: None,
            items,
            order_type: OrderType::Pickup,
            contact_info: ContactInfo {
                email: "guest@example.com".to_string(),
                phone: "555-0100".to_string(),
            },
            delivery_address: None,
            pickup_location: Some(location.into()),
            notes: None,
            tags: Vec::new(),
            is_test: false,
            checkout: None,
        }
    }

    /// Minimal delivery input, used by tests and tooling
    pub fn delivery(items: Vec<OrderItem>, address: DeliveryAddress) -> Self {
        Self {
            order_type: OrderType::Delivery,
            delivery_address: Some(address),
            pickup_location: None,
            ..Self::pickup(items, String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_defaults() {
        assert_eq!(OrderType::Pickup.default_prep_minutes(), 15);
        assert_eq!(OrderType::Delivery.default_prep_minutes(), 30);
        assert_eq!(OrderType::Pickup.eta_window(), "15-20 minutes");
        assert_eq!(OrderType::Delivery.eta_window(), "30-45 minutes");
    }

    #[test]
    fn test_create_input_rejects_unknown_fields() {
        let json = r#"{
            "items": [],
            "orderType": "pickup",
            "pickupLocation": "Main St",
            "discountCode": "FREE"
        }"#;
        let result: Result<CreateOrderInput, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_input_camel_case() {
        let json = r#"{
            "userId": "u-1",
            "items": [{"id": "burger", "name": "Burger", "price": 12.5, "quantity": 2}],
            "orderType": "delivery",
            "contactInfo": {"email": "a@b.c", "phone": "123"},
            "deliveryAddress": {"street": "1 Main St", "city": "Springfield", "zipCode": "12345"},
            "checkout": {"sessionId": "cs_1", "amountTotal": 25.0, "currency": "usd"}
        }"#;
        let input: CreateOrderInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.user_id.as_deref(), Some("u-1"));
        assert_eq!(input.order_type, OrderType::Delivery);
        assert_eq!(input.items[0].quantity, 2);
        let address = input.delivery_address.unwrap();
        assert_eq!(address.zip_code.as_deref(), Some("12345"));
        assert_eq!(input.checkout.unwrap().session_id.as_deref(), Some("cs_1"));
    }

    #[test]
    fn test_delivery_helper_clears_pickup_location() {
        let input = CreateOrderInput::delivery(Vec::new(), DeliveryAddress::default());
        assert!(input.pickup_location.is_none());
        assert!(input.delivery_address.is_some());
    }
}
