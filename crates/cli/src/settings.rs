//! Resolve the effective `BridgeConfig`: file (or defaults), then flags.

use std::collections::HashMap;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{BridgeConfig, SinkConfig, SinkType};
use tracing::info;

use crate::cli::BridgeArgs;

/// Name of the sink created by `--amqp-address`
pub const CLI_AMQP_SINK: &str = "amqp";

/// Load the configuration file if given and apply command-line overrides
pub fn resolve_config(args: &BridgeArgs) -> Result<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => BridgeConfig::default(),
    };

    apply_overrides(&mut config, args);

    ConfigLoader::validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Apply command-line overrides in place
pub fn apply_overrides(config: &mut BridgeConfig, args: &BridgeArgs) {
    if let Some(address) = &args.listen_address {
        config.server.listen_address = address.clone();
    }
    if let Some(path) = &args.telemetry_path {
        config.server.telemetry_path = path.clone();
    }
    if let Some(file) = &args.filter_file {
        config.filter.rule_file = Some(file.clone());
    }
    if let Some(timeout) = args.send_timeout {
        config.dispatch.send_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }
    if args.log_only {
        config.dispatch.log_only = true;
    }
    if let Some(address) = &args.amqp_address {
        apply_amqp_sink(config, address, args);
    }
}

/// Add the `amqp` sink, or update it in place when the file already has one
fn apply_amqp_sink(config: &mut BridgeConfig, address: &str, args: &BridgeArgs) {
    let mut params = HashMap::from([("address".to_string(), address.to_string())]);
    let optional = [
        ("queue", &args.amqp_queue),
        ("access_key_name", &args.amqp_access_key_name),
        ("access_key", &args.amqp_access_key),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            params.insert(key.to_string(), value.clone());
        }
    }

    match config.sinks.iter_mut().find(|s| s.name == CLI_AMQP_SINK) {
        Some(sink) => {
            sink.sink_type = SinkType::Amqp;
            sink.params.extend(params);
        }
        None => config.sinks.push(SinkConfig {
            name: CLI_AMQP_SINK.to_string(),
            sink_type: SinkType::Amqp,
            send_timeout_ms: None,
            params,
        }),
    }
}
