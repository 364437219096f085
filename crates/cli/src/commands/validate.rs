//! `validate` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::BridgeConfig;
use dispatcher::DispatcherBuilder;
use filter::RuleSet;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::settings::resolve_config;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    listen_address: String,
    write_path: String,
    telemetry_path: String,
    log_only: bool,
    rule_count: usize,
    sinks: Vec<SinkSummary>,
}

#[derive(Serialize)]
struct SinkSummary {
    name: String,
    sink_type: String,
    timeout_ms: u128,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = ?args.bridge.config, "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.bridge.config.as_ref().map(|p| p.display().to_string());

    match check(args) {
        Ok((config, rules, summary)) => {
            let warnings = collect_warnings(&config, &rules);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summary),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("{e:#}")),
            warnings: None,
            summary: None,
        },
    }
}

/// Load everything `run` would load, short of binding the listener
fn check(args: &ValidateArgs) -> Result<(BridgeConfig, RuleSet, ConfigSummary)> {
    let config = resolve_config(&args.bridge)?;
    let rule_file = config.filter.rule_file.as_deref();
    let rules = RuleSet::load(rule_file).context("Failed reading metric filter")?;

    let dispatcher = DispatcherBuilder::new(
        config.dispatch.clone(),
        config.sinks.clone(),
        Arc::new(RuleSet::empty()),
    )
    .build()
    .context("Failed to build sinks")?;

    let sinks = config
        .sinks
        .iter()
        .zip(dispatcher.handles())
        .map(|(sink, handle)| SinkSummary {
            name: sink.name.clone(),
            sink_type: if config.dispatch.log_only {
                "log".to_string()
            } else {
                format!("{:?}", sink.sink_type).to_lowercase()
            },
            timeout_ms: handle.timeout().as_millis(),
        })
        .collect();

    let summary = ConfigSummary {
        version: format!("{:?}", config.version),
        listen_address: config.server.listen_address.clone(),
        write_path: config.server.write_path.clone(),
        telemetry_path: config.server.telemetry_path.clone(),
        log_only: config.dispatch.log_only,
        rule_count: rules.len(),
        sinks,
    };
    Ok((config, rules, summary))
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig, rules: &RuleSet) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sinks.is_empty() {
        warnings.push("No sinks configured - received samples will be dropped".to_string());
    }

    if config.filter.rule_file.is_some() && rules.is_empty() {
        warnings.push("Filter file has no rules - every series is kept".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    let path = result.config_path.as_deref().unwrap_or("<flags only>");
    if result.valid {
        println!("✓ Configuration is valid: {}", path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Listen: {}", summary.listen_address);
            println!("  Write path: {}", summary.write_path);
            println!("  Telemetry path: {}", summary.telemetry_path);
            println!("  Filter rules: {}", summary.rule_count);
            println!("  Log only: {}", summary.log_only);
            println!("  Sinks: {}", summary.sinks.len());
            for sink in &summary.sinks {
                println!(
                    "    - {} ({}, timeout {}ms)",
                    sink.name, sink.sink_type, sink.timeout_ms
                );
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::BridgeArgs;
    use std::io::Write;

    fn args(bridge: BridgeArgs) -> ValidateArgs {
        ValidateArgs {
            bridge,
            json: true,
        }
    }

    #[test]
    fn test_valid_with_rules() {
        let mut rules = tempfile::NamedTempFile::new().unwrap();
        writeln!(rules, "# keep test apps\napp SI test\njob EC node").unwrap();

        let result = validate_config(&args(BridgeArgs {
            filter_file: Some(rules.path().to_path_buf()),
            log_only: true,
            amqp_address: Some("amqp://localhost:5672".into()),
            amqp_queue: Some("metrics".into()),
            ..Default::default()
        }));

        assert!(result.valid, "{:?}", result.error);
        let summary = result.summary.unwrap();
        assert_eq!(summary.rule_count, 2);
        assert_eq!(summary.sinks[0].sink_type, "log");
        assert_eq!(summary.sinks[0].timeout_ms, 30_000);
    }

    #[test]
    fn test_invalid_rule_file() {
        let mut rules = tempfile::NamedTempFile::new().unwrap();
        writeln!(rules, "app XX test").unwrap();

        let result = validate_config(&args(BridgeArgs {
            filter_file: Some(rules.path().to_path_buf()),
            ..Default::default()
        }));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("filter"));
    }

    #[test]
    fn test_bad_amqp_scheme() {
        let result = validate_config(&args(BridgeArgs {
            amqp_address: Some("http://localhost".into()),
            amqp_queue: Some("metrics".into()),
            ..Default::default()
        }));
        assert!(!result.valid);
    }

    #[test]
    fn test_no_sinks_warns() {
        let result = validate_config(&args(BridgeArgs::default()));
        assert!(result.valid);
        assert_eq!(result.warnings.map(|w| w.len()), Some(1));
    }
}
