//! HTTP 接口测试：通过 tower oneshot 驱动完整路由

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use order_server::api::build_router;
use order_server::{Config, ServerState};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn app() -> (Router, ServerState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(dir.path().to_string_lossy(), 0);
    let state = ServerState::initialize(&config).unwrap();
    (build_router(state.clone()), state, dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn pickup_body() -> Value {
    json!({
        "items": [{"id": "bagel", "name": "Bagel", "price": 4.5, "quantity": 2}],
        "orderType": "pickup",
        "contactInfo": {"email": "sam@example.com", "phone": "555-0101"},
        "pickupLocation": "Market St",
        "userId": "user-1"
    })
}

async fn create(app: &Router) -> Value {
    let (status, body) = send(app, "POST", "/api/orders", Some(pickup_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

#[tokio::test]
async fn test_create_and_fetch() {
    let (app, _state, _dir) = app();
    let order = create(&app).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], 9.0);
    assert_eq!(order["deliveryFee"], 0.0);
    assert_eq!(order["version"], 1);

    let id = order["id"].as_str().unwrap();
    let (status, body) = send(&app, "GET", &format!("/api/orders?orderId={id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["id"], id);

    let (_, body) = send(&app, "GET", "/api/orders?userId=user-1", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = send(&app, "GET", "/api/orders?userId=someone-else", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_validation_errors() {
    let (app, _state, _dir) = app();

    let mut empty = pickup_body();
    empty["items"] = json!([]);
    let (status, body) = send(&app, "POST", "/api/orders", Some(empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "no_items");
    assert_eq!(body["details"]["reason"], "no_items");

    let mut unknown = pickup_body();
    unknown["discountCode"] = json!("FREE");
    let (status, body) = send(&app, "POST", "/api/orders", Some(unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid_request");

    let mut no_location = pickup_body();
    no_location.as_object_mut().unwrap().remove("pickupLocation");
    let (_, body) = send(&app, "POST", "/api/orders", Some(no_location)).await;
    assert_eq!(body["reason"], "missing_pickup_location");

    let (_, body) = send(&app, "GET", "/api/orders", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_update_errors() {
    let (app, _state, _dir) = app();
    let order = create(&app).await;
    let id = order["id"].as_str().unwrap();

    let (status, body) = send(&app, "PUT", "/api/orders", Some(json!({"status": "ready"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "missing_order_id");

    let (status, body) = send(&app, "PUT", "/api/orders", Some(json!({"orderId": id}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "missing_status");

    let (status, body) =
        send(&app, "PUT", "/api/orders", Some(json!({"orderId": id, "status": "baking"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid_status");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/orders",
        Some(json!({"orderId": "ORD-0-missing", "status": "ready"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "order_not_found");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/orders",
        Some(json!({"orderId": id, "status": "ready", "estimatedTime": "now"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ready");
    assert_eq!(body["data"]["estimatedTime"], "now");

    let (status, body) =
        send(&app, "PUT", "/api/orders", Some(json!({"orderId": id, "status": "preparing"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "invalid_transition");
    assert_eq!(body["details"]["current"], "ready");
    assert_eq!(body["details"]["requested"], "preparing");
}

#[tokio::test]
async fn test_cancel_then_cancel_again() {
    let (app, _state, _dir) = app();
    let order = create(&app).await;
    let id = order["id"].as_str().unwrap();

    let (status, _) = send(&app, "DELETE", "/api/orders", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "DELETE", &format!("/api/orders?orderId={id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) = send(&app, "DELETE", &format!("/api/orders?orderId={id}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "order_finalized");
}

#[tokio::test]
async fn test_bulk_status_and_kitchen_snapshot() {
    let (app, _state, _dir) = app();
    let a = create(&app).await["id"].as_str().unwrap().to_string();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let b = create(&app).await["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders/bulk-status",
        Some(json!({"orderIds": [a, b, "ORD-0-missing"], "status": "confirmed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["requested"], 3);
    assert_eq!(body["data"]["updated"], 2);
    assert_eq!(body["data"]["failed"][0]["orderId"], "ORD-0-missing");
    assert_eq!(body["data"]["failed"][0]["reason"], "order_not_found");

    let (_, body) = send(&app, "GET", "/api/orders/kitchen", None).await;
    let queue = body["data"].as_array().unwrap();
    assert_eq!(queue.len(), 2);
    // Oldest created first
    assert_eq!(queue[0]["id"], a.as_str());

    let (_, body) = send(&app, "GET", "/api/orders/kitchen?statuses=ready", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, "GET", "/api/orders/kitchen?statuses=cooking", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid_status");
}

#[tokio::test]
async fn test_notes_update() {
    let (app, _state, _dir) = app();
    let id = create(&app).await["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        "/api/orders/notes",
        Some(json!({"orderId": id, "notes": "no onions"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notes"], "no onions");
    assert_eq!(body["data"]["version"], 2);
}

#[tokio::test]
async fn test_estimated_time_update() {
    let (app, _state, _dir) = app();
    let id = create(&app).await["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        "/api/orders/estimated-time",
        Some(json!({"orderId": id, "estimatedTime": "25-30 minutes"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["estimatedTime"], "25-30 minutes");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["version"], 2);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/orders/estimated-time",
        Some(json!({"orderId": id, "estimatedTime": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "required_field");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/orders/estimated-time",
        Some(json!({"estimatedTime": "5 minutes"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "missing_order_id");

    send(&app, "DELETE", &format!("/api/orders?orderId={id}"), None).await;
    let (status, body) = send(
        &app,
        "PUT",
        "/api/orders/estimated-time",
        Some(json!({"orderId": id, "estimatedTime": "5 minutes"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "order_finalized");
}

#[tokio::test]
async fn test_health() {
    let (app, _state, _dir) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "durable");
}

#[tokio::test]
async fn test_stream_delivers_order_events() {
    let (app, state, _dir) = app();
    let request = Request::builder()
        .uri("/api/orders/stream?statuses=pending")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");

    let order = state
        .service
        .create_order(serde_json::from_value(pickup_body()).unwrap())
        .await
        .unwrap();

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.starts_with("event: order"));
    assert!(text.contains(&format!("\"orderId\":\"{}\"", order.id)));
    assert!(text.contains("\"kind\":\"created\""));
}
