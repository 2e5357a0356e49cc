#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use payment_api::cache::InMemoryPaymentCache;
use payment_api::http::router::build_router;
use payment_api::metrics::PaymentMetrics;
use payment_api::repo::in_memory::InMemoryPaymentStore;
use payment_api::service::lifecycle::LifecycleSettings;
use payment_api::settlement::{FixedSettlement, SettlementOutcome};
use payment_api::AppState;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const SHORT_DELAY: Duration = Duration::from_millis(50);
pub const LONG_DELAY: Duration = Duration::from_secs(600);

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: InMemoryPaymentStore,
    pub cache: InMemoryPaymentCache,
}

pub fn settings(resolution_delay: Duration) -> LifecycleSettings {
    LifecycleSettings {
        resolution_delay,
        default_currency: "RUB".to_string(),
    }
}

pub fn app_with(
    store: InMemoryPaymentStore,
    outcome: SettlementOutcome,
    resolution_delay: Duration,
) -> TestApp {
    let cache = InMemoryPaymentCache::new(3600);
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(cache.clone()),
        Arc::new(FixedSettlement(outcome)),
        PaymentMetrics::new().expect("metrics registry"),
        settings(resolution_delay),
    );
    TestApp {
        router: build_router(state.clone()),
        state,
        store,
        cache,
    }
}

pub fn app(outcome: SettlementOutcome, resolution_delay: Duration) -> TestApp {
    app_with(InMemoryPaymentStore::new(), outcome, resolution_delay)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub async fn send_raw(router: &Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = router.clone().oneshot(req).await.expect("router is infallible");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send_raw(router, req).await;
    let json = serde_json::from_str(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Creates a payment over HTTP and returns its `data` object.
pub async fn create(router: &Router, body: Value) -> Value {
    let (status, json) = send(router, post_json("/payments", body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected create response: {json}");
    json["data"].clone()
}
