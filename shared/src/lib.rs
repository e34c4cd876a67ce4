//! Shared types for the order lifecycle engine
//!
//! Common types used by the server and its clients: order records,
//! events, error codes and response structures.

pub mod error;
pub mod order;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
