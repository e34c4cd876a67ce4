//! Dual-backend order persistence
//!
//! ```text
//!              ┌──────────────┐   Unavailable   ┌───────────────┐
//!  OrderStore ─┤ durable      ├────────────────►│ fallback      │
//!              │ (redb)       │                 │ (in-process)  │
//!              └──────────────┘                 └───────────────┘
//! ```
//!
//! Both backends implement [`OrderBackend`]. [`OrderStore`] writes to the
//! durable backend first and only falls back when it is unreachable;
//! records held by the fallback carry `source: fallback`. Reads consult
//! both and keep the higher `version` of each record.

mod durable;
mod fallback;
mod store;

pub use durable::{OfflineBackend, RedbBackend, RedbError};
pub use fallback::FallbackStore;
pub use store::{OrderPatch, OrderStore};

use async_trait::async_trait;
use shared::order::{Order, StoreSource};
use thiserror::Error;

/// Backend errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// Backend cannot be reached; the caller may retry on another backend
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict { id: String, expected: u64, actual: u64 },

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order already exists: {0}")]
    AlreadyExists(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Query for list operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub user_id: Option<String>,
    /// `createdAt` lower bound, inclusive
    pub created_from: Option<i64>,
    /// `createdAt` upper bound, exclusive
    pub created_to: Option<i64>,
}

impl ListFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn created_between(from: i64, to: i64) -> Self {
        Self {
            created_from: Some(from),
            created_to: Some(to),
            ..Default::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.user_id
            .as_deref()
            .is_none_or(|uid| order.user_id.as_deref() == Some(uid))
            && self.created_from.is_none_or(|from| order.created_at >= from)
            && self.created_to.is_none_or(|to| order.created_at < to)
    }
}

/// Storage backend contract shared by the durable store and the fallback
#[async_trait]
pub trait OrderBackend: Send + Sync {
    /// Which `source` tag records served by this backend carry
    fn source(&self) -> StoreSource;

    /// Insert a new record; fails with `AlreadyExists` on id collision
    async fn insert(&self, order: &Order) -> BackendResult<()>;

    async fn get(&self, id: &str) -> BackendResult<Option<Order>>;

    /// Matching records, unordered
    async fn list(&self, filter: &ListFilter) -> BackendResult<Vec<Order>>;

    /// Conditional write: succeeds only if the stored record is at
    /// `expected_version`
    async fn replace(&self, order: &Order, expected_version: u64) -> BackendResult<()>;
}

/// Newest-first by `createdAt`, id as tie breaker
pub(crate) fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}
