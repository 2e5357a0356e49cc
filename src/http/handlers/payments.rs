use crate::domain::payment::{CreatePaymentRequest, ListFilter, ListPaymentsQuery};
use crate::error::PaymentError;
use crate::http::error::error_response;
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub async fn create_payment(
    State(state): State<AppState>,
    body: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected payment body");
            return error_response(&PaymentError::Validation(
                "Invalid request body".to_string(),
            ));
        }
    };

    match state.lifecycle.create(req).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "data": created.payment })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Response {
    match state.query.get_payment(&transaction_id).await {
        Ok(found) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": found.payment,
                "cached": found.served_from_cache,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn list_payments(
    State(state): State<AppState>,
    query: Result<Query<ListPaymentsQuery>, QueryRejection>,
) -> Response {
    let filter = match query
        .map_err(|_| PaymentError::Validation("Invalid query parameters".to_string()))
        .and_then(|Query(q)| ListFilter::try_from(q))
    {
        Ok(filter) => filter,
        Err(e) => return error_response(&e),
    };

    match state.query.list_payments(&filter).await {
        Ok(payments) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "count": payments.len(),
                "data": payments,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
