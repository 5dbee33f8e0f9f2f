use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::domain::engine_config::Service;
use crate::domain::EngineConfig;

use super::error::EngineError;
use super::traits::DecisionEngine;

/// Policy engine session over the engine's REST data API.
///
/// The engine runs next to this process (typically a sidecar started with
/// the rendered discovery configuration) and pulls its bundles from the
/// discovery service itself. Decisions are requested from that local engine
/// with `POST {decision url}/data/{policy path}` and a body of
/// `{"input": ...}`.
#[derive(Debug)]
pub struct HttpEngine {
    client: reqwest::Client,
    base: Url,
    service: String,
    system_id: Option<String>,
    closed: AtomicBool,
}

impl HttpEngine {
    /// Open a session from a raw configuration blob (JSON or YAML), sending
    /// decisions to the engine at `decision_url`.
    pub fn open(raw: &[u8], decision_url: &str) -> Result<Self, EngineError> {
        let config = EngineConfig::parse(raw).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_config(&config, decision_url)
    }

    /// Open a session from an already parsed configuration.
    pub fn from_config(config: &EngineConfig, decision_url: &str) -> Result<Self, EngineError> {
        let service = validate_discovery(config)?;
        let base = base_url(decision_url).map_err(|e| {
            EngineError::Config(format!("decision url {}: {}", decision_url, e))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(format!("policy-front/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::Session(e.to_string()))?;

        let system_id = config.labels.as_ref().map(|l| l.system_id.clone());
        info!(
            decision_url = %base,
            discovery_service = %service.name,
            discovery_resource = config.discovery.as_ref().map(|d| d.resource.as_str()).unwrap_or("-"),
            system_id = system_id.as_deref().unwrap_or("-"),
            "Policy engine session opened"
        );

        Ok(HttpEngine {
            client,
            base,
            service: service.name.clone(),
            system_id,
            closed: AtomicBool::new(false),
        })
    }

    /// Name of the service the engine discovers its bundles from.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// System identifier from the configuration labels.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    fn data_url(&self, policy_path: &str) -> Result<Url, EngineError> {
        let path = policy_path.trim_matches('/');
        self.base
            .join(&format!("data/{}", path))
            .map_err(|e| EngineError::Query(format!("policy path {}: {}", policy_path, e)))
    }
}

/// Check the discovery side of the configuration the engine will use.
fn validate_discovery(config: &EngineConfig) -> Result<&Service, EngineError> {
    if let Some(ref discovery) = config.discovery {
        if !config.services.iter().any(|s| s.name == discovery.service) {
            return Err(EngineError::Config(format!(
                "discovery service {} is not configured",
                discovery.service
            )));
        }
        if !discovery.resource.starts_with('/') {
            return Err(EngineError::Config(format!(
                "discovery resource must be absolute: {}",
                discovery.resource
            )));
        }
    }

    let service = config
        .decision_service()
        .ok_or_else(|| EngineError::Config("no services configured".to_string()))?;

    base_url(&service.url)
        .map_err(|e| EngineError::Config(format!("service {} url: {}", service.name, e)))?;

    if let Some(token) = service.bearer_token() {
        HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| EngineError::Config(format!("service {} bearer token: {}", service.name, e)))?;
    }

    Ok(service)
}

fn base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("not a base url".to_string());
    }
    // Url::join drops the last segment unless the path ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl DecisionEngine for HttpEngine {
    async fn decision(&self, path: &str, input: &Value) -> Result<Value, EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }

        let url = self.data_url(path)?;
        debug!(url = %url, "Requesting decision");

        let response = self
            .client
            .post(url)
            .json(&json!({ "input": input }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let document: Value = response.json().await?;
        if document.get("result").is_none() {
            return Err(EngineError::Undefined(path.to_string()));
        }

        Ok(document)
    }

    async fn close(&self) -> Result<(), EngineError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(service = %self.service, "Policy engine session closed");
        }
        Ok(())
    }
}
