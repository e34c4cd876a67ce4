//! Creation-time validation
//!
//! Rules are checked in a fixed order and the first failure wins. Each
//! failure maps to a stable reason code.

use shared::error::ErrorCode;
use shared::order::{CreateOrderInput, OrderItem, OrderType};
use std::fmt;

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;

/// Why an order creation request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationReason {
    NoItems,
    InvalidItem,
    MissingContactEmail,
    MissingContactPhone,
    MissingDeliveryAddress,
    MissingPickupLocation,
    ConflictingLocation,
}

impl ValidationReason {
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationReason::NoItems => ErrorCode::NoItems,
            ValidationReason::InvalidItem => ErrorCode::InvalidItem,
            ValidationReason::MissingContactEmail => ErrorCode::MissingContactEmail,
            ValidationReason::MissingContactPhone => ErrorCode::MissingContactPhone,
            ValidationReason::MissingDeliveryAddress => ErrorCode::MissingDeliveryAddress,
            ValidationReason::MissingPickupLocation => ErrorCode::MissingPickupLocation,
            ValidationReason::ConflictingLocation => ErrorCode::ConflictingLocation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.code().reason()
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !is_blank(v))
}

/// Item sanity: non-empty id and name, quantity in range, finite non-negative price
pub fn validate_item(item: &OrderItem) -> Result<(), ValidationReason> {
    if is_blank(&item.id) || is_blank(&item.name) {
        return Err(ValidationReason::InvalidItem);
    }
    if item.quantity < 1 || item.quantity > MAX_QUANTITY {
        return Err(ValidationReason::InvalidItem);
    }
    if !item.price.is_finite() || item.price < 0.0 || item.price > MAX_PRICE {
        return Err(ValidationReason::InvalidItem);
    }
    Ok(())
}

/// Validate a creation request
pub fn validate_create(input: &CreateOrderInput) -> Result<(), ValidationReason> {
    if input.items.is_empty() {
        return Err(ValidationReason::NoItems);
    }
    input.items.iter().try_for_each(validate_item)?;

    if is_blank(&input.contact_info.email) {
        return Err(ValidationReason::MissingContactEmail);
    }
    if is_blank(&input.contact_info.phone) {
        return Err(ValidationReason::MissingContactPhone);
    }

    let has_address = input.delivery_address.as_ref().is_some_and(|a| !a.is_blank());
    let has_pickup = is_present(input.pickup_location.as_deref());

    match input.order_type {
        OrderType::Delivery if !has_address => Err(ValidationReason::MissingDeliveryAddress),
        OrderType::Pickup if !has_pickup => Err(ValidationReason::MissingPickupLocation),
        OrderType::Delivery if input.pickup_location.is_some() => {
            Err(ValidationReason::ConflictingLocation)
        }
        OrderType::Pickup if input.delivery_address.is_some() => {
            Err(ValidationReason::ConflictingLocation)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::DeliveryAddress;

    fn burger() -> OrderItem {
        OrderItem {
            id: "burger".into(),
            name: "Burger".into(),
            price: 12.5,
            quantity: 1,
            customizations: Some(vec!["no onions".into()]),
        }
    }

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            street: "1 Main St".into(),
            city: "Springfield".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_pickup_and_delivery() {
        assert!(validate_create(&CreateOrderInput::pickup(vec![burger()], "Downtown")).is_ok());
        assert!(validate_create(&CreateOrderInput::delivery(vec![burger()], address())).is_ok());
    }

    #[test]
    fn test_no_items() {
        let input = CreateOrderInput::pickup(vec![], "Downtown");
        assert_eq!(validate_create(&input), Err(ValidationReason::NoItems));
    }

    #[test]
    fn test_first_failing_rule_wins() {
        // No items and no contact: items rule comes first
        let mut input = CreateOrderInput::delivery(vec![], DeliveryAddress::default());
        input.contact_info.email.clear();
        assert_eq!(validate_create(&input), Err(ValidationReason::NoItems));

        // Missing email and missing address: email comes first
        input.items.push(burger());
        assert_eq!(validate_create(&input), Err(ValidationReason::MissingContactEmail));

        input.contact_info.email = "a@b.c".into();
        input.contact_info.phone = "  ".into();
        assert_eq!(validate_create(&input), Err(ValidationReason::MissingContactPhone));

        input.contact_info.phone = "555".into();
        assert_eq!(validate_create(&input), Err(ValidationReason::MissingDeliveryAddress));
    }

    #[test]
    fn test_invalid_items() {
        let cases = [
            OrderItem { quantity: 0, ..burger() },
            OrderItem { quantity: -2, ..burger() },
            OrderItem { price: -1.0, ..burger() },
            OrderItem { price: f64::NAN, ..burger() },
            OrderItem { id: " ".into(), ..burger() },
            OrderItem { name: String::new(), ..burger() },
        ];
        for item in cases {
            let input = CreateOrderInput::pickup(vec![burger(), item.clone()], "Downtown");
            assert_eq!(
                validate_create(&input),
                Err(ValidationReason::InvalidItem),
                "{:?}",
                item
            );
        }
    }

    #[test]
    fn test_free_item_is_valid() {
        let item = OrderItem { price: 0.0, ..burger() };
        assert!(validate_item(&item).is_ok());
    }

    #[test]
    fn test_missing_pickup_location() {
        let input = CreateOrderInput::pickup(vec![burger()], "   ");
        assert_eq!(validate_create(&input), Err(ValidationReason::MissingPickupLocation));
    }

    #[test]
    fn test_conflicting_location() {
        let mut input = CreateOrderInput::delivery(vec![burger()], address());
        input.pickup_location = Some("Downtown".into());
        assert_eq!(validate_create(&input), Err(ValidationReason::ConflictingLocation));

        let mut input = CreateOrderInput::pickup(vec![burger()], "Downtown");
        input.delivery_address = Some(address());
        assert_eq!(validate_create(&input), Err(ValidationReason::ConflictingLocation));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(ValidationReason::NoItems.as_str(), "no_items");
        assert_eq!(
            ValidationReason::MissingDeliveryAddress.to_string(),
            "missing_delivery_address"
        );
    }
}
