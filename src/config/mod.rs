pub mod env;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// Re-export existing config types
pub use crate::poller::PollerConfig;
pub use crate::upstream::HomeAssistantConfig;
pub use env::parse_entity_list;

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub home_assistant: HomeAssistantConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// State store composition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Records kept per entity; 0 keeps only the latest record
    #[serde(default)]
    pub ring_size: usize,
    /// Only persist records with valid coordinates
    #[serde(default)]
    pub filter: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Records buffered per live subscriber before it starts lagging
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    /// Graceful shutdown deadline (seconds)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_listen() -> String {
    "0.0.0.0:9922".to_string()
}

fn default_broadcast_capacity() -> usize {
    1000
}

fn default_shutdown_timeout() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            broadcast_capacity: default_broadcast_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            home_assistant: HomeAssistantConfig::default(),
            poller: PollerConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<()> {
        self.poller.validate()
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.home_assistant.url, "http://localhost:8123");
        assert_eq!(config.home_assistant.timeout_secs, 30);
        assert_eq!(config.poller.poll_interval_ms, 5000);
        assert_eq!(config.poller.concurrency, 2);
        assert_eq!(config.poller.bootstrap_secs, 0);
        assert_eq!(config.store.ring_size, 0);
        assert!(!config.store.filter);
        assert_eq!(config.server.listen, "0.0.0.0:9922");
        assert_eq!(config.server.shutdown_timeout_secs, 60);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            log_level = "debug"

            [home_assistant]
            url = "http://ha.local:8123"
            token = "abc"

            [poller]
            entities = ["person.alice", "device_tracker.phone"]
            poll_interval_ms = 2000
            concurrency = 4
            bootstrap_secs = 600

            [store]
            ring_size = 20
            filter = true

            [server]
            listen = "127.0.0.1:8080"
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.home_assistant.url, "http://ha.local:8123");
        assert_eq!(config.home_assistant.token, "abc");
        assert_eq!(config.poller.entities.len(), 2);
        assert_eq!(config.poller.poll_interval_ms, 2000);
        assert_eq!(config.poller.concurrency, 4);
        assert_eq!(config.poller.bootstrap_secs, 600);
        assert_eq!(config.store.ring_size, 20);
        assert!(config.store.filter);
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.server.broadcast_capacity, 1000); // Default
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [poller]
            concurrency = 3
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.poller.concurrency, 3);
        assert_eq!(config.poller.poll_interval_ms, 5000);
        assert_eq!(config.store.ring_size, 0);
        assert_eq!(config.home_assistant.timeout_secs, 30);
    }

    #[test]
    fn test_validate_requires_entities() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.poller.entities = vec!["person.alice".to_string()];
        assert!(config.validate().is_ok());

        config.poller.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[poller]\nentities = [\"person.alice\"]").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.poller.entities, vec!["person.alice"]);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/whereabouts.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
