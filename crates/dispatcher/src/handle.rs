//! SinkHandle - owns a sink, its timeout and its metrics
//!
//! Each delivery runs in its own task so a slow, failing or panicking sink
//! stays confined to that task.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use contracts::{ContractError, Sample, SampleSink};

use crate::error::DispatcherError;
use crate::metrics::SinkMetrics;

/// Object-safe view of a `SampleSink`
trait ErasedSink: Send + Sync {
    fn name(&self) -> &str;

    fn deliver<'a>(
        &'a self,
        samples: &'a [Sample],
        deadline: std::time::Instant,
    ) -> BoxFuture<'a, Result<(), ContractError>>;
}

impl<S> ErasedSink for S
where
    S: SampleSink + Sync,
{
    fn name(&self) -> &str {
        SampleSink::name(self)
    }

    fn deliver<'a>(
        &'a self,
        samples: &'a [Sample],
        deadline: std::time::Instant,
    ) -> BoxFuture<'a, Result<(), ContractError>> {
        Box::pin(SampleSink::deliver(self, samples, deadline))
    }
}

/// Result of one delivery attempt to one sink
#[derive(Debug)]
pub struct SinkOutcome {
    /// Sink name
    pub sink: String,
    /// Samples attempted
    pub samples: usize,
    /// Wall-clock time spent in the delivery
    pub elapsed: Duration,
    /// Delivery result
    pub result: Result<(), DispatcherError>,
}

impl SinkOutcome {
    /// True if the sink accepted the whole batch
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Handle to a configured sink
#[derive(Clone)]
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Per-delivery budget
    timeout: Duration,
    /// Type-erased sink
    sink: Arc<dyn ErasedSink>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
}

impl SinkHandle {
    /// Wrap a sink with its delivery timeout
    pub fn new<S>(sink: S, timeout: Duration) -> Self
    where
        S: SampleSink + Sync + 'static,
    {
        Self {
            name: SampleSink::name(&sink).to_string(),
            timeout,
            sink: Arc::new(sink),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get delivery timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Start delivering `batch` in a dedicated task
    ///
    /// The deadline is `now + timeout`; past it the sink future is dropped.
    /// The outcome is recorded by the task itself, so it is counted even if
    /// the returned [`PendingDelivery`] is never awaited.
    #[instrument(
        name = "sink_handle_spawn_delivery",
        skip(self, batch),
        fields(sink = %self.name, samples = batch.len())
    )]
    pub fn spawn_delivery(&self, batch: Arc<[Sample]>) -> PendingDelivery {
        let sink = Arc::clone(&self.sink);
        let metrics = Arc::clone(&self.metrics);
        let sink_name = self.name.clone();
        let timeout = self.timeout;
        let samples = batch.len();
        let started = Instant::now();

        let task = tokio::spawn(async move {
            let deadline = started + timeout;
            let delivery = tokio::spawn({
                let sink_name = sink_name.clone();
                async move {
                    let deliver = sink.deliver(&batch, deadline.into_std());
                    match tokio::time::timeout_at(deadline, deliver).await {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(DispatcherError::Contract(e)),
                        Err(_) => Err(DispatcherError::Timeout { sink_name, timeout }),
                    }
                }
            });

            let result = match delivery.await {
                Ok(result) => result,
                Err(e) => Err(DispatcherError::SinkPanicked {
                    sink_name: sink_name.clone(),
                    message: join_error_message(e),
                }),
            };

            let outcome = SinkOutcome {
                sink: sink_name,
                samples,
                elapsed: started.elapsed(),
                result,
            };
            record_outcome(&metrics, &outcome);
            outcome
        });

        PendingDelivery {
            name: self.name.clone(),
            samples,
            started,
            task,
        }
    }
}

impl std::fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkHandle")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// In-flight delivery started by [`SinkHandle::spawn_delivery`]
///
/// Dropping it detaches the task; the delivery still runs to completion or
/// timeout and is still recorded.
pub struct PendingDelivery {
    name: String,
    samples: usize,
    started: Instant,
    task: JoinHandle<SinkOutcome>,
}

impl PendingDelivery {
    /// Wait for the delivery task
    pub async fn join(self) -> SinkOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            // Only reachable if recording itself panicked or the runtime is
            // shutting down.
            Err(e) => SinkOutcome {
                result: Err(DispatcherError::SinkPanicked {
                    sink_name: self.name.clone(),
                    message: join_error_message(e),
                }),
                sink: self.name,
                samples: self.samples,
                elapsed: self.started.elapsed(),
            },
        }
    }
}

fn record_outcome(metrics: &SinkMetrics, outcome: &SinkOutcome) {
    let success = outcome.is_success();
    metrics.record(outcome.samples, success, outcome.elapsed);
    observability::record_batch_outcome(&outcome.sink, outcome.samples, success, outcome.elapsed);

    match &outcome.result {
        Ok(()) => debug!(sink = %outcome.sink, elapsed = ?outcome.elapsed, "Delivery finished"),
        Err(e) => warn!(
            storage = %outcome.sink,
            num_samples = outcome.samples,
            error = %e,
            "Error sending samples to remote storage"
        ),
    }
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    panic_message(err.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
