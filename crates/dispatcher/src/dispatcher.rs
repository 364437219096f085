//! Dispatcher - filter a decoded batch and fan it out to every sink

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument};

use contracts::{DispatchConfig, Sample, SinkConfig, SinkType};
use filter::RuleSet;
use observability::DropReason;

use crate::error::DispatcherError;
use crate::handle::{SinkHandle, SinkOutcome};
use crate::metrics::MetricsSnapshot;
use crate::sinks::{AmqpSink, LogSink};

/// Builder for creating a Dispatcher from configuration
pub struct DispatcherBuilder {
    config: DispatchConfig,
    sinks: Vec<SinkConfig>,
    rules: Arc<RuleSet>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatchConfig, sinks: Vec<SinkConfig>, rules: Arc<RuleSet>) -> Self {
        Self {
            config,
            sinks,
            rules,
        }
    }

    /// Build the dispatcher and every configured sink
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(sink_count = self.sinks.len(), log_only = self.config.log_only)
    )]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = self
            .sinks
            .iter()
            .map(|sink_config| create_sink_handle(sink_config, &self.config))
            .collect::<Result<Vec<_>, _>>()?;

        if self.config.log_only {
            info!("Logging only, not sending anything to queue");
        }

        Ok(Dispatcher::new(self.rules, handles))
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config, dispatch),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(
    config: &SinkConfig,
    dispatch: &DispatchConfig,
) -> Result<SinkHandle, DispatcherError> {
    let timeout = config.send_timeout(dispatch);

    if dispatch.log_only {
        return Ok(SinkHandle::new(LogSink::new(&config.name), timeout));
    }

    match config.sink_type {
        SinkType::Log => Ok(SinkHandle::new(LogSink::new(&config.name), timeout)),
        SinkType::Amqp => {
            let sink = AmqpSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::new(sink, timeout))
        }
    }
}

/// Per-dispatch report
#[derive(Debug, Default)]
pub struct DispatchSummary {
    /// Samples handed to `dispatch`
    pub received: usize,
    /// Dropped for a NaN/Inf value
    pub non_finite: usize,
    /// Dropped by the filter rules
    pub filtered_out: usize,
    /// Samples fanned out to every sink
    pub delivered: usize,
    /// One entry per invoked sink, in configuration order
    pub outcomes: Vec<SinkOutcome>,
}

impl DispatchSummary {
    /// Number of sinks that failed this batch
    pub fn failed_sinks(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Cumulative dispatcher counters
#[derive(Debug, Default)]
struct DispatchCounters {
    received: AtomicU64,
    non_finite: AtomicU64,
    filtered_out: AtomicU64,
}

/// Snapshot of dispatcher counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub non_finite: u64,
    pub filtered_out: u64,
}

/// The Dispatcher that fans batches out to sinks
pub struct Dispatcher {
    rules: Arc<RuleSet>,
    handles: Vec<SinkHandle>,
    counters: DispatchCounters,
}

impl Dispatcher {
    /// Create a dispatcher over already built sink handles
    pub fn new(rules: Arc<RuleSet>, handles: Vec<SinkHandle>) -> Self {
        Self {
            rules,
            handles,
            counters: DispatchCounters::default(),
        }
    }

    /// Loaded filter rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Configured sinks
    pub fn handles(&self) -> &[SinkHandle] {
        &self.handles
    }

    /// Longest per-sink timeout, i.e. the bound on one `dispatch` call
    pub fn max_timeout(&self) -> Duration {
        self.handles
            .iter()
            .map(SinkHandle::timeout)
            .max()
            .unwrap_or_default()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Get cumulative counters
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            received: self.counters.received.load(Ordering::Relaxed),
            non_finite: self.counters.non_finite.load(Ordering::Relaxed),
            filtered_out: self.counters.filtered_out.load(Ordering::Relaxed),
        }
    }

    /// Filter `samples` and deliver the survivors to every sink concurrently.
    ///
    /// Waits until every sink finished or hit its timeout. Delivery failures
    /// are reported through metrics, logs and the returned summary; they never
    /// abort the call or affect other sinks. Each sink task records its own
    /// outcome, so dropping this future does not lose the accounting.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, samples),
        fields(received = samples.len())
    )]
    pub async fn dispatch(&self, samples: Vec<Sample>) -> DispatchSummary {
        let received = samples.len();
        self.counters
            .received
            .fetch_add(received as u64, Ordering::Relaxed);
        observability::record_samples_received(received);

        let (batch, non_finite, filtered_out) = self.filter_batch(samples);
        self.record_drops(non_finite, filtered_out);

        let mut summary = DispatchSummary {
            received,
            non_finite,
            filtered_out,
            delivered: batch.len(),
            outcomes: Vec::new(),
        };

        if batch.is_empty() || self.handles.is_empty() {
            debug!(
                received,
                non_finite,
                filtered_out,
                sinks = self.handles.len(),
                "Nothing to deliver"
            );
            return summary;
        }

        let batch: Arc<[Sample]> = batch.into();
        let pending: Vec<_> = self
            .handles
            .iter()
            .map(|handle| handle.spawn_delivery(Arc::clone(&batch)))
            .collect();
        summary.outcomes = join_all(pending.into_iter().map(|p| p.join())).await;
        summary
    }

    /// Drop non-finite values and series rejected by the rules.
    ///
    /// Consecutive samples sharing one series reuse the previous decision.
    fn filter_batch(&self, samples: Vec<Sample>) -> (Vec<Sample>, usize, usize) {
        let mut kept = Vec::with_capacity(samples.len());
        let mut non_finite = 0;
        let mut filtered_out = 0;
        let mut last: Option<(Arc<contracts::Series>, bool)> = None;

        for sample in samples {
            if !sample.is_deliverable() {
                non_finite += 1;
                continue;
            }

            let keep = match &last {
                Some((series, keep)) if Arc::ptr_eq(series, &sample.series) => *keep,
                _ => {
                    let keep = self.rules.matches(&sample.series);
                    last = Some((Arc::clone(&sample.series), keep));
                    keep
                }
            };

            if keep {
                kept.push(sample);
            } else {
                filtered_out += 1;
            }
        }

        (kept, non_finite, filtered_out)
    }

    fn record_drops(&self, non_finite: usize, filtered_out: usize) {
        self.counters
            .non_finite
            .fetch_add(non_finite as u64, Ordering::Relaxed);
        self.counters
            .filtered_out
            .fetch_add(filtered_out as u64, Ordering::Relaxed);
        observability::record_samples_dropped(DropReason::NonFinite, non_finite);
        observability::record_samples_dropped(DropReason::Filtered, filtered_out);
    }
}
