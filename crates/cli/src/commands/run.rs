//! `run` command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dispatcher::DispatcherBuilder;
use filter::RuleSet;
use ingestion::AppState;
use observability::MetricsHandle;
use tracing::{debug, info, warn};

use crate::cli::RunArgs;
use crate::settings::resolve_config;

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    let config = resolve_config(&args.bridge)?;

    let rule_file = config.filter.rule_file.as_deref();
    let rules = RuleSet::load(rule_file).with_context(|| match rule_file {
        Some(path) => format!("Failed reading metric filter {}", path.display()),
        None => "Failed reading metric filter".to_string(),
    })?;

    let metrics = observability::install_prometheus_recorder()?;
    spawn_upkeep(metrics.clone(), args.upkeep_interval);

    let dispatcher = DispatcherBuilder::new(
        config.dispatch.clone(),
        config.sinks.clone(),
        Arc::new(rules),
    )
    .build()
    .context("Failed to build sinks")?;

    if dispatcher.handles().is_empty() {
        warn!("No sinks configured - received samples will be dropped");
    }
    info!(
        listen_address = %config.server.listen_address,
        write_path = %config.server.write_path,
        telemetry_path = %config.server.telemetry_path,
        sinks = dispatcher.handles().len(),
        log_only = config.dispatch.log_only,
        "Starting up..."
    );

    let dispatcher = Arc::new(dispatcher);
    let listener = ingestion::bind(&config.server)
        .await
        .with_context(|| format!("Failed to listen on {}", config.server.listen_address))?;
    let app = ingestion::router(
        AppState::new(Arc::clone(&dispatcher), Some(metrics)),
        &config.server,
    );

    ingestion::serve(listener, app, ingestion::shutdown_signal())
        .await
        .context("HTTP server failed")?;

    let stats = dispatcher.stats();
    info!(
        received = stats.received,
        non_finite = stats.non_finite,
        filtered_out = stats.filtered_out,
        "Prometheus AMQP bridge finished"
    );
    for (sink, snapshot) in dispatcher.metrics() {
        info!(
            sink = %sink,
            sent = snapshot.sent_samples,
            failed = snapshot.failed_samples,
            batches = snapshot.duration_count,
            "Sink totals"
        );
    }
    Ok(())
}

/// Run recorder upkeep every `period`; zero disables it
fn spawn_upkeep(handle: MetricsHandle, period: Duration) {
    if period.is_zero() {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            handle.run_upkeep();
            debug!("Metrics upkeep done");
        }
    });
}
