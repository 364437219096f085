//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (`validator` derive)：名称非空、超时 > 0
//! - sink name 唯一
//! - HTTP 路径以 `/` 开头，写入路径与 telemetry 路径不同
//! - amqp sink 必填参数齐全

use std::collections::HashSet;

use contracts::{BridgeConfig, ContractError, SinkType};
use validator::{Validate, ValidationErrors};

/// 校验 BridgeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    config.validate().map_err(field_error)?;
    validate_paths(config)?;
    validate_sink_names(config)?;
    validate_sink_params(config)?;
    Ok(())
}

/// 将 derive 校验结果转为第一个出错字段
fn field_error(errors: ValidationErrors) -> ContractError {
    let message = errors.to_string();
    let field = message
        .split(':')
        .next()
        .filter(|f| !f.is_empty())
        .unwrap_or("config")
        .trim()
        .to_string();
    ContractError::config_validation(field, message)
}

/// 校验 HTTP 路径
fn validate_paths(config: &BridgeConfig) -> Result<(), ContractError> {
    let server = &config.server;
    for (field, path) in [
        ("server.write_path", &server.write_path),
        ("server.telemetry_path", &server.telemetry_path),
    ] {
        if !path.starts_with('/') {
            return Err(ContractError::config_validation(
                field,
                format!("path must start with '/', got '{path}'"),
            ));
        }
    }

    if server.write_path == server.telemetry_path {
        return Err(ContractError::config_validation(
            "server.telemetry_path",
            format!(
                "telemetry path '{}' collides with the write path",
                server.telemetry_path
            ),
        ));
    }
    Ok(())
}

/// 校验 sink name 唯一性
fn validate_sink_names(config: &BridgeConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sink in &config.sinks {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

/// 校验 sink 参数
fn validate_sink_params(config: &BridgeConfig) -> Result<(), ContractError> {
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.sink_type != SinkType::Amqp {
            continue;
        }
        for key in ["address", "queue"] {
            let present = sink.params.get(key).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(ContractError::config_validation(
                    format!("sinks[{idx}].params.{key}"),
                    format!("amqp sink '{}' requires '{key}'", sink.name),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DispatchConfig, SinkConfig};
    use std::collections::HashMap;

    fn amqp_sink(name: &str) -> SinkConfig {
        SinkConfig {
            name: name.into(),
            sink_type: SinkType::Amqp,
            send_timeout_ms: None,
            params: HashMap::from([
                ("address".to_string(), "amqp://localhost:5672".to_string()),
                ("queue".to_string(), "metrics".to_string()),
            ]),
        }
    }

    fn minimal_config() -> BridgeConfig {
        BridgeConfig {
            sinks: vec![amqp_sink("amqp")],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut config = minimal_config();
        config.sinks.push(amqp_sink("amqp"));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_missing_queue() {
        let mut config = minimal_config();
        config.sinks[0].params.remove("queue");
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("sinks[0].params.queue"));
    }

    #[test]
    fn test_log_sink_needs_no_params() {
        let mut config = minimal_config();
        config.sinks[0].sink_type = SinkType::Log;
        config.sinks[0].params.clear();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_path_without_slash() {
        let mut config = minimal_config();
        config.server.write_path = "write".into();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("server.write_path"));
    }

    #[test]
    fn test_path_collision() {
        let mut config = minimal_config();
        config.server.telemetry_path = "/write".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = minimal_config();
        config.dispatch = DispatchConfig {
            send_timeout_ms: 0,
            log_only: false,
        };
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }
}
