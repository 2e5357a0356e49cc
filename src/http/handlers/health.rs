use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

fn label(ok: bool) -> &'static str {
    if ok {
        "healthy"
    } else {
        "unhealthy"
    }
}

async fn probe_store(state: &AppState) -> bool {
    match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "database health check failed");
            false
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Response {
    let db_ok = probe_store(&state).await;
    let cache_ok = state.cache.ping().await;
    let ok = db_ok && cache_ok;

    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": label(ok),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
            "checks": {
                "database": label(db_ok),
                "cache": label(cache_ok),
                "cache_backend": state.cache.backend(),
            }
        })),
    )
        .into_response()
}

pub async fn readiness(State(state): State<AppState>) -> Response {
    if !probe_store(&state).await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "not ready", "error": "database unavailable"})),
        )
            .into_response();
    }
    if !state.cache.ping().await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "not ready", "error": "cache unavailable"})),
        )
            .into_response();
    }

    (StatusCode::OK, Json(serde_json::json!({"status": "ready"}))).into_response()
}

pub async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "alive"})))
}
