// src/engine/mock.rs
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::error::EngineError;
use super::traits::DecisionEngine;

/// Substitute decision engine for testing.
#[derive(Debug, Default)]
pub struct MockEngine {
    response: Mutex<Option<Value>>,
    errors: Mutex<VecDeque<EngineError>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<(String, Value)>>,
    echo: AtomicBool,
    closed: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that answers every query with `response`.
    pub fn responding(response: Value) -> Self {
        let engine = Self::default();
        engine.set_response(response);
        engine
    }

    /// Engine that answers with `{"result": <input>}`.
    pub fn echoing() -> Self {
        let engine = Self::default();
        engine.echo.store(true, Ordering::Release);
        engine
    }

    /// Set the decision returned to every successful query.
    pub fn set_response(&self, response: Value) {
        *self.response.lock() = Some(response);
    }

    /// Queue an error; queued errors are returned before any response.
    pub fn push_error(&self, error: EngineError) {
        self.errors.lock().push_back(error);
    }

    /// Delay every query by `delay` (for timeout tests).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Queries received so far, as (policy path, input).
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl DecisionEngine for MockEngine {
    async fn decision(&self, path: &str, input: &Value) -> Result<Value, EngineError> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }

        self.calls.lock().push((path.to_string(), input.clone()));

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.errors.lock().pop_front() {
            return Err(err);
        }

        if self.echo.load(Ordering::Acquire) {
            return Ok(serde_json::json!({ "result": input }));
        }

        self.response
            .lock()
            .clone()
            .ok_or_else(|| EngineError::Undefined(path.to_string()))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queued_errors_come_first() {
        let engine = MockEngine::responding(json!({"result": true}));
        engine.push_error(EngineError::Query("boom".to_string()));

        let first = engine.decision("rules/main", &json!({})).await;
        assert!(matches!(first, Err(EngineError::Query(_))));

        let second = engine.decision("rules/main", &json!({})).await.unwrap();
        assert_eq!(second, json!({"result": true}));
        assert_eq!(engine.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_echoing_returns_input() {
        let engine = MockEngine::echoing();
        let result = engine.decision("rules/main", &json!({"path": "/a"})).await.unwrap();

        assert_eq!(result, json!({"result": {"path": "/a"}}));
    }

    #[tokio::test]
    async fn test_no_response_is_undefined() {
        let engine = MockEngine::new();
        let result = engine.decision("rules/main", &json!({})).await;

        assert!(matches!(result, Err(EngineError::Undefined(p)) if p == "rules/main"));
    }
}
