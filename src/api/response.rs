use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::engine::EngineError;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub policy_path: String,
    pub uptime_secs: u64,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,

    /// Decision that led to a denial, when enforcement is on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        ErrorResponse {
            error: error.into(),
            code: code.into(),
            decision: None,
        }
    }

    pub fn denied(decision: Value) -> Self {
        ErrorResponse {
            decision: Some(decision),
            ..ErrorResponse::new("request denied by policy", "DENIED")
        }
    }

    /// Status and body reported to the caller for a failed decision query.
    ///
    /// The message is fixed per status; engine URLs and engine error bodies
    /// only go to the log.
    pub fn from_engine_error(err: &EngineError) -> (StatusCode, Self) {
        let (status, message) = match err {
            EngineError::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "policy engine did not answer in time",
            ),
            EngineError::Closed => (
                StatusCode::SERVICE_UNAVAILABLE,
                "policy engine is unavailable",
            ),
            EngineError::Transport(_) | EngineError::Status { .. } | EngineError::Query(_) => (
                StatusCode::BAD_GATEWAY,
                "policy engine request failed",
            ),
            EngineError::Undefined(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "policy decision is undefined",
            ),
            EngineError::Config(_) | EngineError::Session(_) | EngineError::Encode(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            ),
        };

        (status, ErrorResponse::new(message, err.code()))
    }
}
