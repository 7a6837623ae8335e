pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// How reasoning content is carried between the client and the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningMode {
    /// Reasoning is exposed inline between thought markers and restored from them
    /// on the next request.
    #[default]
    RoundTrip,
    /// Reasoning is blanked on the way out and only the mandatory empty field is
    /// supplied on the way in.
    Clear,
}

impl fmt::Display for ReasoningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasoningMode::RoundTrip => write!(f, "round_trip"),
            ReasoningMode::Clear => write!(f, "clear"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default = "default_max_request_body_bytes")]
    pub max_request_body_bytes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_worker_threads: Option<usize>,
    #[serde(default)]
    pub http_use_env_proxy: bool,
}

fn default_port() -> u16 {
    12000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_timeout() -> u64 {
    300
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}
fn default_max_request_body_bytes() -> usize {
    32 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout: default_timeout(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            max_request_body_bytes: default_max_request_body_bytes(),
            runtime_worker_threads: None,
            http_use_env_proxy: false,
        }
    }
}

/// Upstream completion API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    /// Overrides the `Host` header sent upstream; derived from `base_url` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub reasoning_mode: ReasoningMode,
    #[serde(default = "default_thought_tag")]
    pub thought_tag: String,
    #[serde(default)]
    pub debug_exchanges: bool,
}

fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_thought_tag() -> String {
    "think".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            reasoning_mode: ReasoningMode::default(),
            thought_tag: default_thought_tag(),
            debug_exchanges: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML (or JSON) file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] when parsing fails or [`ConfigError::Validation`]
/// when semantic validation fails.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.server.port, 12000);
        assert_eq!(config.upstream.base_url, "https://api.deepseek.com");
        assert_eq!(config.features.reasoning_mode, ReasoningMode::RoundTrip);
        assert_eq!(config.features.thought_tag, "think");
        assert!(!config.features.debug_exchanges);
    }

    #[test]
    fn test_legacy_json_shape_parses_with_defaults() {
        let config = parse_config(r#"{"upstream": {"api_key": "sk-test"}}"#).unwrap();
        assert_eq!(config.server.port, 12000);
        assert_eq!(config.server.timeout, 300);
        assert_eq!(config.upstream.base_url, "https://api.deepseek.com");
        assert!(config.upstream.host_header.is_none());
    }

    #[test]
    fn test_missing_api_key_is_parse_error() {
        let err = parse_config("upstream:\n  base_url: https://example.com\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_reasoning_mode_serde() {
        let json = serde_json::to_string(&ReasoningMode::Clear).unwrap();
        assert_eq!(json, "\"clear\"");
        let mode: ReasoningMode = serde_json::from_str("\"round_trip\"").unwrap();
        assert_eq!(mode, ReasoningMode::RoundTrip);
        assert_eq!(ReasoningMode::default().to_string(), "round_trip");
    }

    #[test]
    fn test_server_config_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.runtime_worker_threads, None);
        assert_eq!(server.max_request_body_bytes, 32 * 1024 * 1024);
        assert!(!server.http_use_env_proxy);
    }
}
