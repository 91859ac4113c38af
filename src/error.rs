//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::CheckoutError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    // Domain errors
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Store(#[from] StoreError),

    // Server errors (5xx)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn store_error_parts(err: &StoreError) -> (StatusCode, &'static str, Option<String>) {
    match err {
        // 409 Conflict
        StoreError::Referenced { .. } => {
            (StatusCode::CONFLICT, "still_referenced", Some(err.to_string()))
        }

        // 422 Unprocessable Entity
        StoreError::MissingReference { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "missing_reference",
            Some(err.to_string()),
        ),

        // 500 Internal Server Error
        StoreError::LockTimeout(product_id) => {
            tracing::error!(product_id = *product_id, "Lock timeout: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "lock_timeout", None)
        }
        StoreError::Database(e) => {
            tracing::error!("Database error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
        }
        StoreError::NotLocked(_) | StoreError::StockUnderflow { .. } => {
            tracing::error!("Storage error: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, "not_found", Some(what.clone())),

            // Checkout errors - map to appropriate HTTP status
            AppError::Checkout(ref checkout_err) => match checkout_err {
                CheckoutError::EmptyOrder => (StatusCode::BAD_REQUEST, "empty_order", None),
                CheckoutError::InvalidQuantity { .. } => (
                    StatusCode::BAD_REQUEST,
                    "invalid_quantity",
                    Some(checkout_err.to_string()),
                ),
                CheckoutError::ProductNotFound { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "product_not_found",
                    Some(checkout_err.to_string()),
                ),
                CheckoutError::InsufficientStock { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "insufficient_stock",
                    Some(checkout_err.to_string()),
                ),
                CheckoutError::AmountOverflow { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "amount_overflow",
                    Some(checkout_err.to_string()),
                ),
                CheckoutError::Storage(store_err) => store_error_parts(store_err),
            },

            AppError::Store(store_err) => store_error_parts(store_err),

            // 500 Internal Server Error
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
