use std::time::Duration;

use thiserror::Error;

/// Errors from opening or querying the policy engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("failed to open engine session: {0}")]
    Session(String),

    #[error("decision request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decision request failed: {0}")]
    Query(String),

    #[error("decision for {0} is undefined")]
    Undefined(String),

    #[error("decision timed out after {0:?}")]
    Timeout(Duration),

    #[error("engine session is closed")]
    Closed,

    #[error("failed to encode decision input: {0}")]
    Encode(#[from] serde_json::Error),
}

impl EngineError {
    /// Short machine-readable code for logs and error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "ENGINE_CONFIG",
            EngineError::Session(_) => "ENGINE_SESSION",
            EngineError::Transport(_) | EngineError::Status { .. } | EngineError::Query(_) => {
                "ENGINE_ERROR"
            }
            EngineError::Undefined(_) => "UNDEFINED_DECISION",
            EngineError::Timeout(_) => "ENGINE_TIMEOUT",
            EngineError::Closed => "ENGINE_UNAVAILABLE",
            EngineError::Encode(_) => "INPUT_ENCODING",
        }
    }
}
