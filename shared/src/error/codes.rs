//! Unified error codes for the order engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors (41xx creation validation, 42xx request shape)
//! - 9xxx: System errors
//!
//! Every code also carries a stable snake_case `reason()` so clients can
//! disambiguate errors that share an HTTP status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as `u16` for cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 4xxx: Order ====================
    /// Order not found in either backend
    OrderNotFound = 4001,
    /// Order is in a terminal state and cannot be cancelled or changed
    OrderAlreadyFinalized = 4003,
    /// Requested status is not reachable from the current status
    InvalidTransition = 4010,
    /// Conditional write lost against a newer revision
    ConcurrentModification = 4011,

    // ---- 41xx: creation validation ----
    /// Order has no items
    NoItems = 4101,
    /// An item has a missing id/name, bad quantity or bad price
    InvalidItem = 4102,
    /// Contact email missing
    MissingContactEmail = 4103,
    /// Contact phone missing
    MissingContactPhone = 4104,
    /// Delivery order without a delivery address
    MissingDeliveryAddress = 4105,
    /// Pickup order without a pickup location
    MissingPickupLocation = 4106,
    /// Location field of the other order type is present
    ConflictingLocation = 4107,

    // ---- 42xx: request shape ----
    /// `orderId` missing from the request
    MissingOrderId = 4201,
    /// `status` missing from the request
    MissingStatus = 4202,
    /// Unknown status value
    InvalidStatus = 4203,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Both durable and fallback storage failed
    StorageUnavailable = 9101,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Stable machine-readable reason, independent of the HTTP status
    pub const fn reason(&self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::Unknown => "unknown",
            ErrorCode::ValidationFailed => "validation_failed",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::RequiredField => "required_field",

            ErrorCode::OrderNotFound => "order_not_found",
            ErrorCode::OrderAlreadyFinalized => "order_finalized",
            ErrorCode::InvalidTransition => "invalid_transition",
            ErrorCode::ConcurrentModification => "concurrent_modification",

            ErrorCode::NoItems => "no_items",
            ErrorCode::InvalidItem => "invalid_item",
            ErrorCode::MissingContactEmail => "missing_contact_email",
            ErrorCode::MissingContactPhone => "missing_contact_phone",
            ErrorCode::MissingDeliveryAddress => "missing_delivery_address",
            ErrorCode::MissingPickupLocation => "missing_pickup_location",
            ErrorCode::ConflictingLocation => "conflicting_location",

            ErrorCode::MissingOrderId => "missing_order_id",
            ErrorCode::MissingStatus => "missing_status",
            ErrorCode::InvalidStatus => "invalid_status",

            ErrorCode::InternalError => "internal_error",
            ErrorCode::StorageUnavailable => "storage_unavailable",
        }
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field missing",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyFinalized => "Order is already finalized",
            ErrorCode::InvalidTransition => "Status transition not allowed",
            ErrorCode::ConcurrentModification => "Order was modified concurrently",

            ErrorCode::NoItems => "Order must contain at least one item",
            ErrorCode::InvalidItem => "Order item is invalid",
            ErrorCode::MissingContactEmail => "Contact email is required",
            ErrorCode::MissingContactPhone => "Contact phone is required",
            ErrorCode::MissingDeliveryAddress => "Delivery address is required for delivery orders",
            ErrorCode::MissingPickupLocation => "Pickup location is required for pickup orders",
            ErrorCode::ConflictingLocation => "Location does not match the order type",

            ErrorCode::MissingOrderId => "orderId is required",
            ErrorCode::MissingStatus => "status is required",
            ErrorCode::InvalidStatus => "Unknown order status",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageUnavailable => "Order storage is unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),

            4001 => Ok(ErrorCode::OrderNotFound),
            4003 => Ok(ErrorCode::OrderAlreadyFinalized),
            4010 => Ok(ErrorCode::InvalidTransition),
            4011 => Ok(ErrorCode::ConcurrentModification),

            4101 => Ok(ErrorCode::NoItems),
            4102 => Ok(ErrorCode::InvalidItem),
            4103 => Ok(ErrorCode::MissingContactEmail),
            4104 => Ok(ErrorCode::MissingContactPhone),
            4105 => Ok(ErrorCode::MissingDeliveryAddress),
            4106 => Ok(ErrorCode::MissingPickupLocation),
            4107 => Ok(ErrorCode::ConflictingLocation),

            4201 => Ok(ErrorCode::MissingOrderId),
            4202 => Ok(ErrorCode::MissingStatus),
            4203 => Ok(ErrorCode::InvalidStatus),

            9001 => Ok(ErrorCode::InternalError),
            9101 => Ok(ErrorCode::StorageUnavailable),
            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::NoItems.code(), 4101);
        assert_eq!(ErrorCode::StorageUnavailable.code(), 9101);
    }

    #[test]
    fn test_reasons_are_distinct_for_same_status() {
        // Both map to 400 but must stay distinguishable
        assert_ne!(
            ErrorCode::MissingContactEmail.reason(),
            ErrorCode::MissingDeliveryAddress.reason()
        );
        assert_eq!(ErrorCode::NoItems.reason(), "no_items");
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(4010), Ok(ErrorCode::InvalidTransition));
        assert_eq!(ErrorCode::try_from(9101), Ok(ErrorCode::StorageUnavailable));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::MissingPickupLocation).unwrap();
        assert_eq!(json, "4106");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::MissingPickupLocation);
    }

    #[test]
    fn test_deserialize_invalid() {
        let result: Result<ErrorCode, _> = serde_json::from_str("12345");
        assert!(result.is_err());
    }
}
