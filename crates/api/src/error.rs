//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backoffice::BackofficeError;
use checkout::CheckoutError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request the handlers could not interpret.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Backoffice(#[from] BackofficeError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Checkout(err) => checkout_status(err),
            ApiError::Backoffice(err) => backoffice_status(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
        }
        metrics::counter!("http_errors_total", "status" => status.as_str().to_string()).increment(1);

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::InsufficientStock { .. } | CheckoutError::ProductNotFound { .. } => {
            StatusCode::CONFLICT
        }
        CheckoutError::Store(store) if store.is_aborted() => StatusCode::CONFLICT,
        CheckoutError::Store(store) if store.is_permission_denied() => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn backoffice_status(err: &BackofficeError) -> StatusCode {
    match err {
        BackofficeError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        BackofficeError::InvalidStatus(_) | BackofficeError::InvalidPeriod(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BackofficeError::Store(store) if store.is_aborted() => StatusCode::CONFLICT,
        err if err.is_permission_denied() => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
