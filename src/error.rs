//! Gateway-wide error type and its HTTP representation.
//!
//! Every fallible path in the gateway converges on [`GatewayError`] before it
//! reaches the client, so there is exactly one place that decides the status
//! code and the JSON envelope described in the router's error contract.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors that can surface at the HTTP boundary.
///
/// Each variant maps to a single HTTP status. Variants that carry an upstream
/// status/snippet (`Upstream`) preserve enough of the original failure for
/// debugging without leaking the full provider response body.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing Authorization header")]
    AuthMissing,
    #[error("invalid credential: {0}")]
    AuthInvalid(&'static str),
    #[error("credential expired")]
    AuthExpired,
    #[error("insufficient credits: {0}")]
    InsufficientCredits(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream error ({status}): {snippet}")]
    Upstream { status: u16, snippet: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthMissing | GatewayError::AuthInvalid(_) | GatewayError::AuthExpired => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::InsufficientCredits(_) => StatusCode::PAYMENT_REQUIRED,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape for every non-streaming error response: `{error, message, status}`.
#[derive(Serialize)]
struct ErrorEnvelope {
    error: bool,
    message: String,
    status: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            log::error!("gateway error: {}", self);
        } else if log::log_enabled!(log::Level::Warn) {
            log::warn!("gateway error: {}", self);
        }

        let body = ErrorEnvelope {
            error: true,
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
