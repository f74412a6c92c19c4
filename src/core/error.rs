//! Error types and handling for the relay server.
//!
//! This module provides a unified error type [`AppError`] for failures that are
//! surfaced to the caller as server errors, and its HTTP response conversion.
//! Recoverable upstream failures on the retried route never reach this type;
//! they are turned into regular JSON bodies by the route itself.

use crate::core::error_types::{ERROR_TYPE_API, ERROR_TYPE_INVALID_REQUEST, ERROR_TYPE_TIMEOUT};
use crate::core::logging::get_request_id;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream did not answer within the attempt's time budget
    #[error("Upstream request timed out")]
    UpstreamTimeout,

    /// Connection to the upstream could not be established or was reset
    #[error("Upstream transport failure: {0}")]
    UpstreamTransport(String),

    /// Upstream answered with a body that is not valid JSON
    #[error("Invalid JSON from upstream: {0}")]
    UpstreamBodyDecode(String),

    /// Client provided invalid data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamTransport(_) | AppError::UpstreamBodyDecode(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the caller. Upstream details (URLs, keys,
    /// socket errors) stay in the logs.
    fn client_message(&self) -> String {
        match self {
            AppError::UpstreamTimeout => "Upstream request timed out".to_string(),
            AppError::UpstreamTransport(_) => "Failed to reach upstream provider".to_string(),
            AppError::UpstreamBodyDecode(_) => {
                "Invalid JSON response from upstream provider".to_string()
            }
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::UpstreamTimeout => ERROR_TYPE_TIMEOUT,
            AppError::BadRequest(_) => ERROR_TYPE_INVALID_REQUEST,
            _ => ERROR_TYPE_API,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                request_id = %get_request_id(),
                error = %self,
                status = %status,
                "Request failed"
            );
        } else {
            tracing::debug!(
                request_id = %get_request_id(),
                error = %self,
                status = %status,
                "Request rejected"
            );
        }

        let body = Json(json!({
            "error": {
                "message": self.client_message(),
                "type": self.error_type(),
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
