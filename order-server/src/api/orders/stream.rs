//! Server-sent order events
//!
//! Each change arrives as an `order` event carrying
//! `{orderId, status, previousStatus, kind, revision, snapshot}`. A subscriber
//! that falls behind gets a `resync` event and should reload
//! `/api/orders/kitchen` before applying further events.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use shared::ErrorCode;
use shared::order::{Order, OrderEvent, OrderEventKind, OrderStatus};

use crate::core::ServerState;
use crate::fanout::{FanoutError, SubscriptionFilter, kitchen};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub statuses: Option<String>,
    #[serde(default)]
    pub include_test: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamPayload<'a> {
    order_id: &'a str,
    status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_status: Option<OrderStatus>,
    kind: OrderEventKind,
    revision: u64,
    snapshot: &'a Order,
}

fn to_sse(next: Result<Arc<OrderEvent>, FanoutError>) -> Event {
    match next {
        Ok(event) => {
            let payload = StreamPayload {
                order_id: &event.order_id,
                status: event.status,
                previous_status: event.previous_status,
                kind: event.kind,
                revision: event.revision,
                snapshot: &event.snapshot,
            };
            match serde_json::to_string(&payload) {
                Ok(data) => Event::default()
                    .event("order")
                    .id(format!("{}:{}", event.order_id, event.revision))
                    .data(data),
                Err(e) => {
                    tracing::warn!(order_id = %event.order_id, error = %e, "Failed to encode order event");
                    Event::default().event("resync").data("encode_failed")
                }
            }
        }
        Err(FanoutError::Lagged(skipped)) => {
            tracing::debug!(skipped, "SSE subscriber lagged");
            Event::default().event("resync").data(skipped.to_string())
        }
        Err(e) => Event::default().event("resync").data(e.to_string()),
    }
}

pub async fn subscribe(
    State(state): State<ServerState>,
    Query(query): Query<StreamQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let statuses = kitchen::parse_statuses(query.statuses.as_deref())
        .map_err(|e| AppError::new(ErrorCode::InvalidStatus).with_detail("status", e.0))?;

    let filter = SubscriptionFilter {
        statuses,
        include_test: query.include_test,
    };
    tracing::debug!(filter = ?filter, "SSE subscriber connected");

    let stream = state
        .fanout
        .subscribe(filter)
        .into_stream()
        .take_until(state.shutdown.clone().cancelled_owned())
        .map(|next| Ok(to_sse(next)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
