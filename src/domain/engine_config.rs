use serde::{Deserialize, Serialize};

/// Name of the service entry the discovery section points at.
pub const DEFAULT_SERVICE: &str = "styra";

/// Configuration handed to the policy engine when a session is opened.
///
/// Field order is fixed by the struct layout, so rendering the same
/// parameters always yields the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery: Option<Discovery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,

    #[serde(default)]
    pub services: Vec<Service>,
}

/// Where the engine fetches its discovery bundle from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub name: String,
    pub resource: String,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    #[serde(rename = "system-id")]
    pub system_id: String,
    #[serde(rename = "system-type")]
    pub system_type: String,
}

/// A remote service the engine talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<Bearer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bearer {
    pub token: String,
}

impl EngineConfig {
    /// Build the discovery configuration for a single system.
    pub fn from_parameters(base_url: &str, token: &str, system_id: &str) -> Self {
        EngineConfig {
            discovery: Some(Discovery {
                name: "discovery".to_string(),
                resource: format!("/systems/{}/discovery", system_id),
                service: DEFAULT_SERVICE.to_string(),
            }),
            labels: Some(Labels {
                system_id: system_id.to_string(),
                system_type: "custom".to_string(),
            }),
            services: vec![Service {
                name: DEFAULT_SERVICE.to_string(),
                url: base_url.to_string(),
                credentials: Some(Credentials {
                    bearer: Some(Bearer {
                        token: token.to_string(),
                    }),
                }),
            }],
        }
    }

    /// Parse a configuration blob. YAML is accepted, JSON being a subset of it.
    pub fn parse(raw: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(raw)
    }

    /// Render to the JSON payload handed to the engine.
    pub fn render(&self) -> Vec<u8> {
        // Plain strings and vectors only; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// The service decisions are sent to: the discovery service when named,
    /// otherwise the first listed one.
    pub fn decision_service(&self) -> Option<&Service> {
        let named = self
            .discovery
            .as_ref()
            .and_then(|d| self.services.iter().find(|s| s.name == d.service));

        named.or_else(|| self.services.first())
    }
}

impl Service {
    pub fn bearer_token(&self) -> Option<&str> {
        self.credentials
            .as_ref()
            .and_then(|c| c.bearer.as_ref())
            .map(|b| b.token.as_str())
    }
}
