//! Order domain types
//!
//! - Types: input and value types shared by the engine and its clients
//! - Snapshot: the persisted order record and its status
//! - Events: facts published to real-time consumers

pub mod event;
pub mod snapshot;
pub mod types;

// Re-exports
pub use event::{OrderEvent, OrderEventKind};
pub use snapshot::{Order, OrderAmounts, OrderStatus, ParseStatusError, StoreSource};
pub use types::*;
