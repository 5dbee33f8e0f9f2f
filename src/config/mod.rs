use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::domain::EngineConfig;

/// Local policy engine (sidecar) REST API root.
pub const DEFAULT_DECISION_URL: &str = "http://127.0.0.1:8181/v1";

/// Errors raised while assembling startup configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid listen address {addr:?}: {source}")]
    ListenAddr {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("engine config IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Front door configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "policy-front")]
#[command(about = "Forward request metadata to a policy decision engine")]
pub struct Config {
    /// HTTP server listen address
    #[arg(long, default_value = "0.0.0.0:9099", env = "POLICY_FRONT_LISTEN_ADDR")]
    pub listen_addr: String,

    /// Base URL of the policy discovery service (e.g. https://tenant.styra.com/v1)
    #[arg(long, env = "POLICY_FRONT_ENGINE_URL")]
    pub engine_url: Option<String>,

    /// Bearer token presented to the policy service
    #[arg(long, env = "POLICY_FRONT_ENGINE_TOKEN", hide_env_values = true)]
    pub engine_token: Option<String>,

    /// System identifier registered with the policy service
    #[arg(long, env = "POLICY_FRONT_SYSTEM_ID")]
    pub system_id: Option<String>,

    /// Engine configuration file (JSON or YAML); overrides url/token/system id
    #[arg(long, env = "POLICY_FRONT_ENGINE_CONFIG_FILE")]
    pub engine_config_file: Option<PathBuf>,

    /// REST API root of the policy engine that evaluates decisions
    #[arg(long, default_value = DEFAULT_DECISION_URL, env = "POLICY_FRONT_DECISION_URL")]
    pub decision_url: String,

    /// Write the rendered engine configuration here for the engine to load
    #[arg(long, env = "POLICY_FRONT_ENGINE_CONFIG_OUT")]
    pub engine_config_out: Option<PathBuf>,

    /// Policy path queried for every request
    #[arg(long, default_value = "rules/main", env = "POLICY_FRONT_POLICY_PATH")]
    pub policy_path: String,

    /// Upper bound on a single decision query in milliseconds
    #[arg(long, default_value = "5000", env = "POLICY_FRONT_DECISION_TIMEOUT_MS")]
    pub decision_timeout_ms: u64,

    /// Latency budget in milliseconds for the decision endpoint
    #[arg(long, default_value = "100", env = "POLICY_FRONT_LATENCY_BUDGET_MS")]
    pub latency_budget_ms: u64,

    /// Turn decisions into 403 responses on deny (off: pass-through)
    #[arg(long, default_value = "false", env = "POLICY_FRONT_ENFORCE")]
    pub enforce: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Enable graceful shutdown
    #[arg(long, default_value = "true", env = "POLICY_FRONT_GRACEFUL_SHUTDOWN")]
    pub graceful_shutdown: bool,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value = "30", env = "POLICY_FRONT_SHUTDOWN_TIMEOUT_SECS")]
    pub shutdown_timeout_secs: u64,
}

impl Config {
    /// Get decision timeout as Duration.
    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    /// Get shutdown timeout as Duration.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Parse the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|source| ConfigError::ListenAddr {
                addr: self.listen_addr.clone(),
                source,
            })
    }

    /// Check the settings that must hold before anything is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.decision_url.trim().is_empty() {
            return Err(ConfigError::Missing("decision_url"));
        }
        if self.policy_path.trim().is_empty() {
            return Err(ConfigError::Missing("policy_path"));
        }
        if self.decision_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "decision_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.engine_config_file.is_none() {
            non_empty(&self.engine_url, "engine_url")?;
            non_empty(&self.engine_token, "engine_token")?;
            non_empty(&self.system_id, "system_id")?;
        }

        Ok(())
    }

    /// Produce the raw engine configuration blob.
    ///
    /// A configuration file wins over the url/token/system id triple.
    pub fn engine_config_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        if let Some(ref path) = self.engine_config_file {
            return Ok(std::fs::read(path)?);
        }

        let url = non_empty(&self.engine_url, "engine_url")?;
        let token = non_empty(&self.engine_token, "engine_token")?;
        let system_id = non_empty(&self.system_id, "system_id")?;

        Ok(EngineConfig::from_parameters(url, token, system_id).render())
    }

    /// Hand the engine configuration to the engine when an output path is
    /// set. Returns whether anything was written.
    pub fn write_engine_config(&self, raw: &[u8]) -> Result<bool, ConfigError> {
        match self.engine_config_out {
            Some(ref path) => {
                std::fs::write(path, raw)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn non_empty<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:9099".to_string(),
            engine_url: None,
            engine_token: None,
            system_id: None,
            engine_config_file: None,
            decision_url: DEFAULT_DECISION_URL.to_string(),
            engine_config_out: None,
            policy_path: "rules/main".to_string(),
            decision_timeout_ms: 5000,
            latency_budget_ms: 100,
            enforce: false,
            log_level: "info".to_string(),
            graceful_shutdown: true,
            shutdown_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parameterized() -> Config {
        Config {
            engine_url: Some("https://tenant.styra.com/v1".to_string()),
            engine_token: Some("secret".to_string()),
            system_id: Some("sys-1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.listen_addr, "0.0.0.0:9099");
        assert_eq!(config.policy_path, "rules/main");
        assert_eq!(config.decision_url, "http://127.0.0.1:8181/v1");
        assert!(!config.enforce);
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config {
            decision_timeout_ms: 250,
            shutdown_timeout_secs: 15,
            ..Default::default()
        };

        assert_eq!(config.decision_timeout(), Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_validate_requires_engine_settings() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("engine_url")));

        let config = Config {
            engine_token: Some("   ".to_string()),
            ..parameterized()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Missing("engine_token")
        ));

        assert!(parameterized().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            listen_addr: "not-an-addr".to_string(),
            ..parameterized()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::ListenAddr { .. }
        ));

        let config = Config {
            decision_timeout_ms: 0,
            ..parameterized()
        };
        assert!(matches!(config.validate().unwrap_err(), ConfigError::Invalid(_)));

        let config = Config {
            policy_path: "".to_string(),
            ..parameterized()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Missing("policy_path")
        ));
    }

    #[test]
    fn test_engine_config_from_parameters() {
        let bytes = parameterized().engine_config_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["labels"]["system-id"], "sys-1");
        assert_eq!(value["services"][0]["url"], "https://tenant.styra.com/v1");
    }

    #[test]
    fn test_engine_config_file_wins() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "services:\n  - name: local\n    url: http://127.0.0.1:8181/v1").unwrap();

        let config = Config {
            engine_config_file: Some(file.path().to_path_buf()),
            ..parameterized()
        };

        assert!(config.validate().is_ok());
        let bytes = config.engine_config_bytes().unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("http://127.0.0.1:8181/v1"));
    }

    #[test]
    fn test_write_engine_config() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("opa-conf.json");
        let config = Config {
            engine_config_out: Some(out.clone()),
            ..parameterized()
        };

        let raw = config.engine_config_bytes().unwrap();
        assert!(config.write_engine_config(&raw).unwrap());
        assert_eq!(std::fs::read(&out).unwrap(), raw);

        assert!(!parameterized().write_engine_config(&raw).unwrap());
    }

    #[test]
    fn test_engine_config_file_missing() {
        let config = Config {
            engine_config_file: Some(PathBuf::from("/nonexistent/opa-conf.yaml")),
            ..Default::default()
        };

        assert!(config.validate().is_ok());
        assert!(matches!(
            config.engine_config_bytes().unwrap_err(),
            ConfigError::Io(_)
        ));
    }
}
