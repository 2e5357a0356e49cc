use crate::error::PaymentError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub fn status_for(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::InvalidAmount
        | PaymentError::InvalidCurrency
        | PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
        PaymentError::NotFound => StatusCode::NOT_FOUND,
        PaymentError::Conflict(_) | PaymentError::InvalidTransition { .. } => StatusCode::CONFLICT,
        PaymentError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// `{"error": "<message>"}` with the status of the error class. Store failure
/// details are logged, never returned.
pub fn error_response(err: &PaymentError) -> Response {
    let status = status_for(err);
    let message = if err.is_client_error() {
        err.to_string()
    } else {
        tracing::error!(error = %err, "request failed on store");
        "Service unavailable".to_string()
    };

    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
