use crate::http::handlers::{health, metrics, payments};
use crate::http::middleware::request_metrics;
use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    let payment_routes = Router::new()
        .route(
            "/payments",
            post(payments::create_payment).get(payments::list_payments),
        )
        .route("/payments/:transaction_id", get(payments::get_payment));

    Router::new()
        .merge(payment_routes.clone())
        .nest("/api", payment_routes)
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route("/metrics", get(metrics::export))
        .layer(from_fn_with_state(
            state.metrics.clone(),
            request_metrics::track,
        ))
        .with_state(state)
}
