//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use orders_core::ValidationError;
use orders_data::OrderStoreError;
use serde::Serialize;

/// Message for unreadable or incomplete order payloads.
pub const INVALID_BODY: &str = "Invalid request body, order_id / total fields cannot be empty.";

/// Message for every 500; the cause is only logged.
pub const INTERNAL_ERROR: &str = "Internal error.";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

/// An error answered with `{"status": .., "message": ..}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
    }

    /// Maps a store failure, logging anything that becomes a 500.
    #[must_use]
    pub fn from_store(err: OrderStoreError, context: &str) -> Self {
        match err {
            OrderStoreError::DuplicateKey { order_id, .. } => Self::new(
                StatusCode::CONFLICT,
                format!("Order {order_id} already exists."),
            ),
            other => {
                tracing::error!("{}: {}", context, other);
                Self::internal()
            }
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyOrderId | ValidationError::ZeroTotal => {
                Self::bad_request(INVALID_BODY)
            }
            other => Self::bad_request(format!("Invalid request body, {other}.")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self.status.as_u16(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
