//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查 |
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "uptime_seconds": 42,
//!   "storage": "durable",
//!   "pending_reconciliation": 0,
//!   "subscribers": 1
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// ok | degraded
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    /// durable | fallback
    storage: &'static str,
    /// 仅存在于 fallback 的订单数
    pending_reconciliation: usize,
    subscribers: usize,
    scheduled_tasks: usize,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let store = state.service.store();
    let durable_ok = store.durable_reachable().await;

    Json(HealthResponse {
        status: if durable_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        storage: if durable_ok { "durable" } else { "fallback" },
        pending_reconciliation: store.pending_reconciliation().len(),
        subscribers: state.fanout.subscriber_count(),
        scheduled_tasks: state.service.scheduler().pending(),
    })
}
