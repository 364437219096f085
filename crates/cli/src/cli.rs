//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Prometheus AMQP - forward remote-write samples to AMQP 1.0 queues
#[derive(Parser, Debug)]
#[command(
    name = "prometheus-amqp",
    author,
    version,
    about = "Prometheus remote-write to AMQP bridge",
    long_about = "Receives Prometheus remote-write requests, filters the series against an\n\
                  allow-list rule file and fans the surviving samples out to every\n\
                  configured sink (AMQP 1.0 queues or the log)."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PROM_AMQP_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PROM_AMQP_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge
    Run(RunArgs),

    /// Validate configuration and filter file without running
    Validate(ValidateArgs),
}

/// Settings shared by every command; flags override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct BridgeArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "PROM_AMQP_CONFIG")]
    pub config: Option<PathBuf>,

    /// URL of the AMQP broker; adds a sink named `amqp`
    #[arg(long = "amqp-address", env = "PROM_AMQP_ADDRESS")]
    pub amqp_address: Option<String>,

    /// AMQP queue name
    #[arg(long = "amqp-queue", env = "PROM_AMQP_QUEUE")]
    pub amqp_queue: Option<String>,

    /// The plain SASL access key
    #[arg(long = "amqp-accesskey", env = "PROM_AMQP_ACCESS_KEY", hide_env_values = true)]
    pub amqp_access_key: Option<String>,

    /// The plain SASL access key name
    #[arg(long = "amqp-accesskeyname", env = "PROM_AMQP_ACCESS_KEY_NAME")]
    pub amqp_access_key_name: Option<String>,

    /// Only write samples to the log
    #[arg(long = "log-only", env = "PROM_AMQP_LOG_ONLY")]
    pub log_only: bool,

    /// Filter file to use; every series is kept without one
    #[arg(long = "filter-file", env = "PROM_AMQP_FILTER_FILE")]
    pub filter_file: Option<PathBuf>,

    /// Timeout for sending one batch to a sink (e.g. `30s`, `500ms`)
    #[arg(
        long = "send-timeout",
        value_parser = humantime::parse_duration,
        env = "PROM_AMQP_SEND_TIMEOUT"
    )]
    pub send_timeout: Option<Duration>,

    /// Address to listen on for web endpoints
    #[arg(long = "web.listen-address", env = "PROM_AMQP_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", env = "PROM_AMQP_TELEMETRY_PATH")]
    pub telemetry_path: Option<String>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub bridge: BridgeArgs,

    /// Interval between Prometheus histogram upkeep runs
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    pub upkeep_interval: Duration,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub bridge: BridgeArgs,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
