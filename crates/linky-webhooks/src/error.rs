//! Error types for the webhook system.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linky_db::DbError;
use linky_secrets::SecretError;
use serde::Serialize;
use utoipa::ToSchema;

/// Webhook system error variants.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Secret vault error: {0}")]
    Vault(#[from] SecretError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("SSRF protection: {0}")]
    SsrfDetected(String),

    /// Missing, or owned by someone else. The two are indistinguishable.
    #[error("Webhook endpoint not found")]
    EndpointNotFound,

    #[error("Delivery not found")]
    DeliveryNotFound,

    #[error("Delivery queue is full, try again later")]
    QueueFull,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for WebhookError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

/// JSON error response returned by webhook API endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl WebhookError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            WebhookError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            WebhookError::Vault(SecretError::ProviderUnavailable { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "vault_unavailable")
            }
            WebhookError::Vault(_) => (StatusCode::BAD_GATEWAY, "vault_error"),
            WebhookError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
            WebhookError::SsrfDetected(_) => (StatusCode::BAD_REQUEST, "ssrf_detected"),
            WebhookError::EndpointNotFound => (StatusCode::NOT_FOUND, "endpoint_not_found"),
            WebhookError::DeliveryNotFound => (StatusCode::NOT_FOUND, "delivery_not_found"),
            WebhookError::QueueFull => (StatusCode::SERVICE_UNAVAILABLE, "queue_full"),
            WebhookError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            WebhookError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            WebhookError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Client-facing message. Server-side failures keep their detail in logs.
    fn public_message(&self) -> String {
        match self {
            WebhookError::Database(_) => "A database error occurred".to_string(),
            WebhookError::Vault(_) => "The secret vault is unavailable".to_string(),
            WebhookError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Webhook API request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.public_message(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, WebhookError>;

/// Why a single delivery attempt produced no HTTP response.
///
/// Recorded as text in the delivery's `response` column; never returned to
/// the code that emitted the event.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryFailure {
    #[error("vault_unavailable: {0}")]
    VaultUnavailable(String),

    #[error("Request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Failed to serialize payload: {0}")]
    Serialization(String),
}
