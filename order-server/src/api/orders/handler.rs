//! Order API Handlers

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use shared::order::{CreateOrderInput, Order, OrderStatus};
use shared::{ApiResponse, ErrorCode};

use crate::core::ServerState;
use crate::fanout::kitchen;
use crate::orders::BulkUpdateReport;
use crate::utils::{AppError, AppResult};

/// Query params for `GET /api/orders`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuery {
    pub order_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdQuery {
    pub order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusesQuery {
    pub statuses: Option<String>,
}

/// Body of `PUT /api/orders`; fields are optional so that a missing one
/// maps to its own reason code
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub order_id: Option<String>,
    pub status: Option<String>,
    pub estimated_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusRequest {
    #[serde(default)]
    pub order_ids: Vec<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesRequest {
    pub order_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedTimeRequest {
    pub order_id: Option<String>,
    pub estimated_time: Option<String>,
}

fn bad_body(rejection: JsonRejection) -> AppError {
    AppError::invalid_request(rejection.body_text())
}

fn require_order_id(order_id: Option<String>) -> AppResult<String> {
    order_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::MissingOrderId))
}

fn parse_status(status: Option<String>) -> AppResult<OrderStatus> {
    let raw = status
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::MissingStatus))?;
    raw.parse()
        .map_err(|_| AppError::new(ErrorCode::InvalidStatus).with_detail("status", raw))
}

/// Single order by `orderId`, else the user's or all orders
pub async fn fetch(
    State(state): State<ServerState>,
    Query(query): Query<FetchQuery>,
) -> AppResult<Response> {
    if let Some(id) = query.order_id {
        let order = state.service.get_order(&id).await?;
        return Ok(Json(ApiResponse::success(order)).into_response());
    }
    let orders = state.service.list_orders(query.user_id.as_deref()).await?;
    Ok(Json(ApiResponse::success(orders)).into_response())
}

pub async fn create(
    State(state): State<ServerState>,
    body: Result<Json<CreateOrderInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let Json(input) = body.map_err(bad_body)?;
    let order = state.service.create_order(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

pub async fn update_status(
    State(state): State<ServerState>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let Json(req) = body.map_err(bad_body)?;
    let order_id = require_order_id(req.order_id)?;
    let status = parse_status(req.status)?;
    let estimated_time = req.estimated_time.filter(|s| !s.trim().is_empty());

    let order = state
        .service
        .update_status(&order_id, status, estimated_time)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn cancel(
    State(state): State<ServerState>,
    Query(query): Query<OrderIdQuery>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order_id = require_order_id(query.order_id)?;
    let order = state.service.cancel_order(&order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn bulk_status(
    State(state): State<ServerState>,
    body: Result<Json<BulkStatusRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<BulkUpdateReport>>> {
    let Json(req) = body.map_err(bad_body)?;
    if req.order_ids.is_empty() {
        return Err(AppError::new(ErrorCode::MissingOrderId));
    }
    let status = parse_status(req.status)?;
    let report = state.service.bulk_update_status(&req.order_ids, status).await;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn update_notes(
    State(state): State<ServerState>,
    body: Result<Json<NotesRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let Json(req) = body.map_err(bad_body)?;
    let order_id = require_order_id(req.order_id)?;
    let order = state.service.update_notes(&order_id, req.notes).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_estimated_time(
    State(state): State<ServerState>,
    body: Result<Json<EstimatedTimeRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let Json(req) = body.map_err(bad_body)?;
    let order_id = require_order_id(req.order_id)?;
    let estimated_time = req
        .estimated_time
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::RequiredField).with_detail("field", "estimatedTime"))?;

    let order = state
        .service
        .update_estimated_time(&order_id, estimated_time)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Manual refresh for kitchen / kanban views
pub async fn kitchen(
    State(state): State<ServerState>,
    Query(query): Query<StatusesQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let statuses = kitchen::parse_statuses(query.statuses.as_deref())
        .map_err(|e| AppError::new(ErrorCode::InvalidStatus).with_detail("status", e.0))?;
    let orders = state.service.kitchen_snapshot(&statuses).await?;
    Ok(Json(ApiResponse::success(orders)))
}
