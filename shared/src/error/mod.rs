//! Unified error system for the order engine
//!
//! - [`ErrorCode`]: standardized error codes, each with a stable `reason()`
//! - [`ErrorCategory`]: classification of errors by code range
//! - [`AppError`]: rich error type with code, message and details
//! - [`ApiResponse`]: unified API response envelope
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::MissingContactPhone)
//!     .with_detail("field", "contactInfo.phone");
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.reason.as_deref(), Some("missing_contact_phone"));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
