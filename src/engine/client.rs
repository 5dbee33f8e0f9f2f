use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::EngineConfig;

use super::error::EngineError;
use super::http::HttpEngine;
use super::traits::DecisionEngine;

/// Owns the engine session for the lifetime of the process and bounds every
/// query with a timeout.
pub struct DecisionClient {
    engine: Arc<dyn DecisionEngine>,
    timeout: Duration,
}

impl DecisionClient {
    /// Wrap an already opened engine session.
    pub fn new(engine: Arc<dyn DecisionEngine>, timeout: Duration) -> Self {
        DecisionClient { engine, timeout }
    }

    /// Render the discovery configuration for one system and open a session
    /// with the engine serving decisions at `decision_url`.
    pub fn initialize(
        base_url: &str,
        token: &str,
        system_id: &str,
        decision_url: &str,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let raw = EngineConfig::from_parameters(base_url, token, system_id).render();
        Self::open(&raw, decision_url, timeout)
    }

    /// Open a session from a raw configuration blob.
    pub fn open(
        raw_config: &[u8],
        decision_url: &str,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let engine = HttpEngine::open(raw_config, decision_url)?;
        Ok(Self::new(Arc::new(engine), timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one decision query.
    ///
    /// Dropping the returned future (e.g. the caller disconnected) abandons
    /// the in-flight request.
    pub async fn query<T>(&self, policy_path: &str, input: &T) -> Result<Value, EngineError>
    where
        T: Serialize + ?Sized,
    {
        let input = serde_json::to_value(input)?;
        debug!(policy_path, "Querying policy engine");

        match tokio::time::timeout(self.timeout, self.engine.decision(policy_path, &input)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(self.timeout)),
        }
    }

    /// Close the engine session.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.engine.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DecisionInput;
    use crate::engine::MockEngine;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tokio_test::{assert_err, assert_ok};

    fn client_with(engine: Arc<MockEngine>, timeout: Duration) -> DecisionClient {
        DecisionClient::new(engine, timeout)
    }

    #[tokio::test]
    async fn test_query_forwards_path_and_input() {
        let engine = Arc::new(MockEngine::responding(json!({"result": true})));
        let client = client_with(engine.clone(), Duration::from_secs(1));

        let mut headers = BTreeMap::new();
        headers.insert("X-Test".to_string(), "1".to_string());
        let input = DecisionInput {
            path: "/something/anything".to_string(),
            headers,
            host: "localhost:9099".to_string(),
        };

        let decision = assert_ok!(client.query("rules/main", &input).await);
        assert_eq!(decision, json!({"result": true}));

        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "rules/main");
        assert_eq!(
            calls[0].1,
            json!({
                "path": "/something/anything",
                "headers": {"X-Test": "1"},
                "host": "localhost:9099"
            })
        );
    }

    #[tokio::test]
    async fn test_query_times_out() {
        let engine = Arc::new(MockEngine::responding(json!({"result": true})));
        engine.set_delay(Duration::from_millis(200));
        let client = client_with(engine, Duration::from_millis(20));

        let err = assert_err!(client.query("rules/main", &json!({})).await);
        assert!(matches!(err, EngineError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_shutdown_closes_session() {
        let engine = Arc::new(MockEngine::responding(json!({"result": true})));
        let client = client_with(engine.clone(), Duration::from_secs(1));

        assert_ok!(client.shutdown().await);
        assert!(engine.is_closed());

        let err = assert_err!(client.query("rules/main", &json!({})).await);
        assert!(matches!(err, EngineError::Closed));
    }

    #[test]
    fn test_initialize_validates_config() {
        assert!(DecisionClient::initialize(
            "https://tenant.styra.com/v1",
            "tok",
            "sys",
            "http://127.0.0.1:8181/v1",
            Duration::from_secs(1)
        )
        .is_ok());

        let err = DecisionClient::initialize(
            "::",
            "tok",
            "sys",
            "http://127.0.0.1:8181/v1",
            Duration::from_secs(1),
        )
        .err()
        .unwrap();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
