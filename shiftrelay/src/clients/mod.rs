//! Upstream API clients
//!
//! Two collaborators sit behind traits so the pipeline and HTTP handlers
//! can run against in-memory fakes:
//! - [`WorkforceApi`]: employees, locations and shift creation
//! - [`ScheduleVision`]: image + prompt inference returning free-form text

pub mod gemini;
pub mod workforce;

pub use gemini::GeminiClient;
pub use workforce::WorkforceClient;

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shiftrelay_common::models::{CreateEmployeeRequest, CreateShiftRequest, EmployeeRecord, Location};
use thiserror::Error;

/// Failure talking to an upstream service
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Request never produced a response (DNS, connect, timeout)
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// Upstream answered with a non-2xx status
    #[error("{service} returned {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
        /// Raw error payload (JSON if it parsed, otherwise the text as a string)
        body: Value,
    },

    /// 2xx response whose body did not have the expected shape
    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    /// Upstream HTTP status, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw upstream error payload, when one was received
    pub fn payload(&self) -> Option<&Value> {
        match self {
            UpstreamError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Human-readable message without the service prefix
    pub fn message(&self) -> &str {
        match self {
            UpstreamError::Transport { message, .. }
            | UpstreamError::Status { message, .. }
            | UpstreamError::Decode { message, .. } => message,
        }
    }
}

/// Workforce-management API
#[async_trait]
pub trait WorkforceApi: Send + Sync {
    /// Current roster, in the order the API returns it
    async fn list_employees(&self) -> Result<Vec<EmployeeRecord>, UpstreamError>;

    async fn list_locations(&self) -> Result<Vec<Location>, UpstreamError>;

    /// Create one shift; returns the created record as sent by the API
    async fn create_shift(&self, shift: &CreateShiftRequest) -> Result<Value, UpstreamError>;

    async fn create_employee(
        &self,
        employee: &CreateEmployeeRequest,
    ) -> Result<Value, UpstreamError>;
}

/// Multimodal model that reads a schedule image
#[async_trait]
pub trait ScheduleVision: Send + Sync {
    /// Run the fixed extraction prompt over an image; returns the raw model text
    async fn extract_schedule(&self, image: &[u8], mime_type: &str)
        -> Result<String, UpstreamError>;
}

/// Decode a successful JSON response or convert the failure
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, UpstreamError> {
    let status = response.status();
    let text = response.text().await.map_err(|e| UpstreamError::Transport {
        service,
        message: format!("failed to read response body: {}", e.without_url()),
    })?;

    if !status.is_success() {
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
        return Err(UpstreamError::Status {
            service,
            status: status.as_u16(),
            message,
            body,
        });
    }

    serde_json::from_str(&text).map_err(|e| UpstreamError::Decode {
        service,
        message: e.to_string(),
    })
}

/// Transport failure without the request URL in its message
pub(crate) fn transport_error(service: &'static str, err: reqwest::Error) -> UpstreamError {
    let err = err.without_url();
    let message = if err.is_timeout() {
        format!("timed out: {}", err)
    } else {
        err.to_string()
    };
    UpstreamError::Transport { service, message }
}

/// Best human-readable message from a provider error payload
///
/// Handles `{"error": {"message": ..}}`, `{"error": ".."}`, `{"message": ..}`
/// and bare strings.
fn error_message(body: &Value) -> Option<String> {
    let candidate = body
        .pointer("/error/message")
        .or_else(|| body.get("error").filter(|e| e.is_string()))
        .or_else(|| body.get("message"))
        .or_else(|| Some(body).filter(|b| b.is_string()))?;

    candidate
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
