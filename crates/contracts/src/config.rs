//! BridgeConfig - Config Loader output
//!
//! Describes the whole bridge: HTTP endpoint, filter rules, dispatch policy, sink routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BridgeConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// HTTP endpoint settings
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Series filter settings
    #[serde(default)]
    pub filter: FilterConfig,

    /// Fan-out settings
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchConfig,

    /// Output routing
    #[serde(default)]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

/// HTTP endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Listen address; `:port` means all interfaces
    #[serde(default = "default_listen_address")]
    #[validate(length(min = 1))]
    pub listen_address: String,

    /// Remote-write endpoint path
    #[serde(default = "default_write_path")]
    #[validate(length(min = 1))]
    pub write_path: String,

    /// Prometheus exposition path
    #[serde(default = "default_telemetry_path")]
    #[validate(length(min = 1))]
    pub telemetry_path: String,

    /// Largest accepted (compressed) request body
    #[serde(default = "default_max_body_bytes")]
    #[validate(range(min = 1))]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            write_path: default_write_path(),
            telemetry_path: default_telemetry_path(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:24282".to_string()
}

fn default_write_path() -> String {
    "/write".to_string()
}

fn default_telemetry_path() -> String {
    "/metrics".to_string()
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

/// Series filter settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Rule file; `None` keeps every series
    #[serde(default)]
    pub rule_file: Option<PathBuf>,
}

/// Fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Default per-sink delivery timeout (milliseconds)
    #[serde(default = "default_send_timeout_ms")]
    #[validate(range(min = 1))]
    pub send_timeout_ms: u64,

    /// Replace every sink with a log sink of the same name
    #[serde(default)]
    pub log_only: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
            log_only: false,
        }
    }
}

impl DispatchConfig {
    /// Default per-sink timeout as a `Duration`
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

fn default_send_timeout_ms() -> u64 {
    30_000
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink name, used as the `remote` metrics label
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Per-sink timeout override (milliseconds)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub send_timeout_ms: Option<u64>,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    /// Effective timeout for this sink
    pub fn send_timeout(&self, dispatch: &DispatchConfig) -> Duration {
        self.send_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| dispatch.send_timeout())
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// AMQP 1.0 queue
    Amqp,
    /// Log output only
    Log,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen_address, "0.0.0.0:24282");
        assert_eq!(config.server.telemetry_path, "/metrics");
        assert_eq!(config.dispatch.send_timeout(), Duration::from_secs(30));
        assert!(config.filter.rule_file.is_none());
        assert!(config.sinks.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sink_timeout_override() {
        let dispatch = DispatchConfig::default();
        let mut sink = SinkConfig {
            name: "amqp".into(),
            sink_type: SinkType::Amqp,
            send_timeout_ms: None,
            params: HashMap::new(),
        };
        assert_eq!(sink.send_timeout(&dispatch), Duration::from_secs(30));

        sink.send_timeout_ms = Some(250);
        assert_eq!(sink.send_timeout(&dispatch), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_empty_sink_name() {
        let config = BridgeConfig {
            sinks: vec![SinkConfig {
                name: String::new(),
                sink_type: SinkType::Log,
                send_timeout_ms: None,
                params: HashMap::new(),
            }],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sink_type_snake_case() {
        let json = r#"{"name":"q","sink_type":"amqp","params":{"queue":"metrics"}}"#;
        let sink: SinkConfig = serde_json::from_str(json).unwrap();
        assert_eq!(sink.sink_type, SinkType::Amqp);
        assert_eq!(sink.params.get("queue").map(String::as_str), Some("metrics"));
    }
}
