//! API error handling for the relay

use crate::bridges::ChainError;
use crate::relay::RelayError;
use crate::telemetry::ValidationError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub timestamp: u64,
}

impl ApiError {
    pub fn new(code: u16, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }

    pub fn with_details(code: u16, message: String, details: serde_json::Value) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(400, message.to_string())
    }

    pub fn internal_server_error(message: &str) -> Self {
        Self::new(500, message.to_string())
    }

    pub fn validation_error(err: &ValidationError) -> Self {
        Self::with_details(
            422,
            "Validation error".to_string(),
            serde_json::json!({
                "field": err.field,
                "reason": err.message,
                "value": err.value,
            }),
        )
    }

    /// Chain failure after the reading was stored and possibly pinned.
    pub fn submission_failed(err: &ChainError, cid: &str, pinned: bool) -> Self {
        let code = match err {
            ChainError::NetworkUnavailable(_)
            | ChainError::GasEstimationFailed(_)
            | ChainError::BroadcastUnacknowledged { .. } => 503,
            ChainError::SigningFailed(_) => 500,
            ChainError::SubmissionRejected(_) => 502,
            ChainError::ConfirmationTimeout { .. } => 504,
        };

        Self::with_details(
            code,
            "Chain submission failed".to_string(),
            serde_json::json!({
                "kind": err.kind(),
                "reason": err.to_string(),
                "retryable": err.is_retryable(),
                "tx_hash": err.tx_hash(),
                "cid": cid,
                "pinned": pinned,
                "stored_locally": true,
                "confirmed": false,
            }),
        )
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::validation_error(&err)
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(e) => Self::validation_error(&e),
            RelayError::Encoding(e) => Self::internal_server_error(&e.to_string()),
            RelayError::Submission {
                source,
                cid,
                pinned,
            } => Self::submission_failed(&source, &cid, pinned),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status().as_u16(), format!("Invalid JSON body: {}", rejection.body_text()))
    }
}
