//! Error types for shiftrelay
//!
//! Every handler failure becomes a JSON body of the form
//! `{"error": {"code", "message", "upstream_status"?, "details"?}}` where
//! `details` carries the raw upstream payload when there is one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::clients::UpstreamError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload over the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Upload is not an image (415)
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Workforce or model API failure; status mirrors the upstream's
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// shiftrelay-common error; invalid input is 400, anything else 500
    #[error("Common error: {0}")]
    Common(#[from] shiftrelay_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut upstream_status: Option<u16> = None;
        let mut details: Option<Value> = None;

        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA_TYPE",
                msg,
            ),
            ApiError::Upstream(ref err) => {
                upstream_status = err.status();
                details = err.payload().cloned();
                let status = upstream_status
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (status, "UPSTREAM_ERROR", err.to_string())
            }
            ApiError::Common(shiftrelay_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, message = %message, "Request failed");
        }

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(upstream_status) = upstream_status {
            error["upstream_status"] = json!(upstream_status);
        }
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
