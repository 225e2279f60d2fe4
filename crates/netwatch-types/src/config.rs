//! Agent configuration types.
//!
//! `AgentConfig` mirrors the `netwatch.toml` file. Every field has a default
//! so an empty or missing file yields a usable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::DEFAULT_INDEX_PREFIX;

/// Default interval between directory refreshes, in seconds.
pub const DEFAULT_REFRESH_SECS: u64 = 10;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSettings,

    #[serde(default)]
    pub store: StoreSettings,

    /// Geolocation service; country enrichment is disabled when absent.
    #[serde(default)]
    pub geo: Option<GeoSettings>,
}

/// What to do with transactions whose destination belongs to no agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalDestinationPolicy {
    /// Publish only when this agent owns the destination.
    #[default]
    Drop,
    /// Also publish when the destination is owned by no known agent.
    Publish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Agent name; the hostname is used when unset or empty.
    #[serde(default)]
    pub name: Option<String>,

    /// Seconds between directory refreshes. `0` means the default.
    #[serde(default = "default_refresh_secs")]
    pub refresh_topology_freq: u64,

    /// Addresses to register for this agent; discovered when empty.
    #[serde(default)]
    pub addresses: Vec<String>,

    #[serde(default)]
    pub external_destinations: ExternalDestinationPolicy,
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

impl AgentSettings {
    /// The configured name, ignoring blank values.
    pub fn configured_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn refresh_interval(&self) -> Duration {
        match self.refresh_topology_freq {
            0 => Duration::from_secs(DEFAULT_REFRESH_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: None,
            refresh_topology_freq: default_refresh_secs(),
            addresses: Vec::new(),
            external_destinations: ExternalDestinationPolicy::default(),
        }
    }
}

/// Connection settings for the document store holding both the directory
/// and the event partitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_host")]
    pub host: String,

    #[serde(default = "default_store_port")]
    pub port: u16,

    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_store_host() -> String {
    "localhost".to_string()
}

fn default_store_port() -> u16 {
    9200
}

fn default_index_prefix() -> String {
    DEFAULT_INDEX_PREFIX.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl StoreSettings {
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            host: default_store_host(),
            port: default_store_port(),
            index_prefix: default_index_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoSettings {
    /// Base URL; the address is appended as the last path segment.
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_default_values() {
        let config = AgentConfig::default();
        assert!(config.agent.name.is_none());
        assert_eq!(config.agent.refresh_interval(), Duration::from_secs(10));
        assert_eq!(
            config.agent.external_destinations,
            ExternalDestinationPolicy::Drop
        );
        assert_eq!(config.store.base_url(), "http://localhost:9200");
        assert_eq!(config.store.index_prefix, "packetbeat");
        assert!(config.geo.is_none());
    }

    #[test]
    fn test_agent_config_deserialize_empty() {
        let config: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.agent.refresh_topology_freq, 10);
        assert_eq!(config.store.port, 9200);
    }

    #[test]
    fn test_agent_config_deserialize_with_values() {
        let toml_str = r#"
[agent]
name = "web1"
refresh_topology_freq = 30
addresses = ["10.0.0.5", "fd00::5"]
external_destinations = "publish"

[store]
host = "es.internal"
port = 9201
index_prefix = "netwatch"

[geo]
endpoint = "http://geo.internal/country"
"#;
        let config: AgentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.configured_name(), Some("web1"));
        assert_eq!(config.agent.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.agent.addresses.len(), 2);
        assert_eq!(
            config.agent.external_destinations,
            ExternalDestinationPolicy::Publish
        );
        assert_eq!(config.store.base_url(), "http://es.internal:9201");
        assert_eq!(config.store.index_prefix, "netwatch");
        assert_eq!(config.geo.unwrap().timeout_secs, 10);
    }

    #[test]
    fn test_zero_refresh_frequency_uses_default() {
        let settings = AgentSettings {
            refresh_topology_freq: 0,
            ..AgentSettings::default()
        };
        assert_eq!(settings.refresh_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_blank_name_is_not_configured() {
        let settings = AgentSettings {
            name: Some("   ".to_string()),
            ..AgentSettings::default()
        };
        assert_eq!(settings.configured_name(), None);
    }

    #[test]
    fn test_base_url_keeps_explicit_scheme() {
        let store = StoreSettings {
            host: "https://es.example.com".to_string(),
            port: 443,
            ..StoreSettings::default()
        };
        assert_eq!(store.base_url(), "https://es.example.com:443");
    }
}
