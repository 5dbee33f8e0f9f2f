use async_trait::async_trait;
use serde_json::Value;

use super::error::EngineError;

/// An open session with an external policy decision engine.
///
/// Implementations are shared across concurrent requests after opening and
/// must tolerate parallel `decision` calls.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    /// Evaluate the policy at `path` against `input` and return the raw
    /// decision document.
    async fn decision(&self, path: &str, input: &Value) -> Result<Value, EngineError>;

    /// Release the session. Later decisions fail with [`EngineError::Closed`].
    async fn close(&self) -> Result<(), EngineError>;
}
