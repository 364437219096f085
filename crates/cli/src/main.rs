//! # Prometheus AMQP CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证（配置文件 + 命令行覆盖）
//! - 启动 remote-write HTTP 服务并分发到各 sink
//! - 优雅关闭处理

mod cli;
mod commands;
mod settings;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_bridge, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_tracing(&observability_config(&cli))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Prometheus AMQP bridge starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_bridge(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Map CLI verbosity flags to the subscriber settings
fn observability_config(cli: &Cli) -> ObservabilityConfig {
    let level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    ObservabilityConfig {
        log_format: cli.log_format.into(),
        default_log_level: level.to_string(),
    }
}
