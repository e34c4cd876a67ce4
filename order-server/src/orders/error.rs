use super::validation::ValidationReason;
use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use thiserror::Error;

/// Order engine errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(ValidationReason),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order {id} is already {status}")]
    OrderFinalized { id: String, status: OrderStatus },

    #[error("Order {id} was modified concurrently (expected version {expected})")]
    ConcurrentModification { id: String, expected: u64 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::Validation(reason) => reason.code(),
            OrderError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            OrderError::NotFound(_) => ErrorCode::OrderNotFound,
            OrderError::OrderFinalized { .. } => ErrorCode::OrderAlreadyFinalized,
            OrderError::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            OrderError::StorageUnavailable(_) => ErrorCode::StorageUnavailable,
        }
    }

    /// Stable reason string, distinct from the HTTP status
    pub fn reason(&self) -> &'static str {
        self.code().reason()
    }
}

impl From<ValidationReason> for OrderError {
    fn from(reason: ValidationReason) -> Self {
        OrderError::Validation(reason)
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let code = err.code();
        match err {
            OrderError::Validation(reason) => AppError::new(code).with_detail("reason", reason.as_str()),
            OrderError::InvalidTransition { from, to } => AppError::with_message(
                code,
                format!("Cannot move order from {} to {}", from, to),
            )
            .with_detail("current", from.as_str())
            .with_detail("requested", to.as_str()),
            OrderError::NotFound(id) => AppError::order_not_found(id),
            OrderError::OrderFinalized { id, status } => {
                AppError::with_message(code, format!("Order {} is already {}", id, status))
                    .with_detail("orderId", id)
                    .with_detail("current", status.as_str())
            }
            OrderError::ConcurrentModification { id, expected } => {
                AppError::new(code)
                    .with_detail("orderId", id)
                    .with_detail("expectedVersion", expected)
            }
            // Backend details stay in the logs
            OrderError::StorageUnavailable(_) => AppError::new(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_invalid_transition_carries_both_states() {
        let err: AppError = OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Preparing,
        }
        .into();
        assert_eq!(err.http_status(), StatusCode::CONFLICT);
        let details = err.details.unwrap();
        assert_eq!(details["current"], "delivered");
        assert_eq!(details["requested"], "preparing");
    }

    #[test]
    fn test_validation_reason_surfaced() {
        let err = OrderError::from(ValidationReason::NoItems);
        assert_eq!(err.reason(), "no_items");
        let app: AppError = err.into();
        assert_eq!(app.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_finalized_is_bad_request() {
        let err: AppError = OrderError::OrderFinalized {
            id: "ORD-1".into(),
            status: OrderStatus::Cancelled,
        }
        .into();
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.reason(), "order_finalized");
    }

    #[test]
    fn test_storage_unavailable_hides_backend_detail() {
        let err: AppError = OrderError::StorageUnavailable("disk on fire".into()).into();
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.message.contains("disk"));
    }
}
