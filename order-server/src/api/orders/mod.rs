//! Order API Module
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/orders | GET | by `orderId`, by `userId`, or all (newest first) |
//! | /api/orders | POST | create |
//! | /api/orders | PUT | status update |
//! | /api/orders | DELETE | cancel (`orderId` query) |
//! | /api/orders/bulk-status | POST | status update for many ids |
//! | /api/orders/notes | PUT | replace notes |
//! | /api/orders/estimated-time | PUT | replace the estimated ready time |
//! | /api/orders/kitchen | GET | kitchen snapshot (oldest first) |
//! | /api/orders/stream | GET | server-sent order events |

mod handler;
mod stream;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/orders",
            get(handler::fetch)
                .post(handler::create)
                .put(handler::update_status)
                .delete(handler::cancel),
        )
        .route("/api/orders/bulk-status", post(handler::bulk_status))
        .route("/api/orders/notes", put(handler::update_notes))
        .route("/api/orders/estimated-time", put(handler::update_estimated_time))
        .route("/api/orders/kitchen", get(handler::kitchen))
        .route("/api/orders/stream", get(stream::subscribe))
}
