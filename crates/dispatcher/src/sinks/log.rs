//! LogSink - writes samples to the log instead of a broker

use std::time::Instant;

use contracts::{ContractError, Sample, SampleSink, Series, METRIC_NAME_LABEL};
use tracing::{debug, info, instrument};

/// Sink that logs every sample for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_batch(&self, samples: &[Sample]) {
        for sample in samples {
            debug!(
                sink = %self.name,
                path = %metric_path(&sample.series),
                value = sample.value,
                timestamp_ms = sample.timestamp_ms,
                "sample-metric"
            );
        }

        info!(sink = %self.name, samples = samples.len(), "Batch logged");
    }
}

/// Flatten a series into `name.label1.value1.label2.value2` (labels sorted)
pub fn metric_path(series: &Series) -> String {
    let mut path = series.metric_name().unwrap_or_default().to_string();
    for (label, value) in series.iter() {
        if label == METRIC_NAME_LABEL || label.is_empty() {
            continue;
        }
        path.push('.');
        path.push_str(label);
        path.push('.');
        path.push_str(value);
    }
    path
}

impl SampleSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_deliver",
        skip(self, samples, _deadline),
        fields(sink = %self.name, samples = samples.len())
    )]
    async fn deliver(&self, samples: &[Sample], _deadline: Instant) -> Result<(), ContractError> {
        self.log_batch(samples);
        Ok(())
    }
}
