//! # Observability
//!
//! Tracing + Prometheus metrics for the bridge.
//!
//! ## Features
//!
//! - Tracing initialization (JSON/Pretty/Compact)
//! - Prometheus recorder whose handle renders the exposition page
//! - Metric names and recording helpers for the ingest/fan-out path
//!
//! ## Example
//!
//! ```ignore
//! use observability::{init_tracing, install_prometheus_recorder, ObservabilityConfig};
//!
//! init_tracing(&ObservabilityConfig::default())?;
//! let handle = install_prometheus_recorder()?;
//! // serve `handle.render()` on the telemetry path
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_batch_outcome, record_samples_dropped, record_samples_received, DropReason,
};
pub use metrics_exporter_prometheus::PrometheusHandle as MetricsHandle;

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log format
    pub log_format: LogFormat,
    /// Default log level when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs
    #[default]
    Json,
    /// Human readable
    Pretty,
    /// Compact single-line
    Compact,
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `default_log_level`.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        "Tracing initialized"
    );
    Ok(())
}

/// Prometheus builder with the bridge's histogram buckets
pub fn prometheus_builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(crate::metrics::SENT_BATCH_DURATION_SECONDS.to_string()),
            crate::metrics::DURATION_BUCKETS,
        )
        .context("Failed to configure histogram buckets")
}

/// Install the global Prometheus recorder
///
/// No listener is started; the returned handle renders the exposition text
/// and is served by the HTTP endpoint on its telemetry path.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    let handle = prometheus_builder()?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    crate::metrics::describe();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}
