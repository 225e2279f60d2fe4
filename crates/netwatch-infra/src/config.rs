//! Agent configuration loader.
//!
//! Reads `netwatch.toml` and deserializes it into [`AgentConfig`]. Falls back
//! to defaults when the file is missing or malformed.

use std::path::Path;

use netwatch_types::config::AgentConfig;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "netwatch.toml";

/// Load the agent configuration from `path`.
///
/// - If the file does not exist, returns [`AgentConfig::default()`].
/// - If the file exists but cannot be read or parsed, logs a warning and
///   returns the default.
pub async fn load_agent_config(path: &Path) -> AgentConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return AgentConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return AgentConfig::default();
        }
    };

    match toml::from_str::<AgentConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            AgentConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_agent_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_agent_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).await;
        assert!(config.agent.name.is_none());
        assert_eq!(config.store.port, 9200);
    }

    #[tokio::test]
    async fn load_agent_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(
            &path,
            r#"
[agent]
name = "db1"
refresh_topology_freq = 3

[store]
host = "10.1.0.2"
port = 9300
"#,
        )
        .await
        .unwrap();

        let config = load_agent_config(&path).await;
        assert_eq!(config.agent.configured_name(), Some("db1"));
        assert_eq!(config.agent.refresh_interval(), Duration::from_secs(3));
        assert_eq!(config.store.base_url(), "http://10.1.0.2:9300");
    }

    #[tokio::test]
    async fn load_agent_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(&path, "[agent\nname = ").await.unwrap();

        let config = load_agent_config(&path).await;
        assert!(config.agent.name.is_none());
        assert_eq!(config.agent.refresh_topology_freq, 10);
    }
}
