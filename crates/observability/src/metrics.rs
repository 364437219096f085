//! Bridge metrics
//!
//! Metric names are kept compatible with existing remote-write adapter dashboards.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Samples accepted by the write endpoint, before any filtering
pub const RECEIVED_SAMPLES_TOTAL: &str = "received_samples_total";
/// Samples a sink delivered successfully
pub const SENT_SAMPLES_TOTAL: &str = "sent_samples_total";
/// Samples in batches a sink failed to deliver
pub const FAILED_SAMPLES_TOTAL: &str = "failed_samples_total";
/// Per-sink batch delivery duration
pub const SENT_BATCH_DURATION_SECONDS: &str = "sent_batch_duration_seconds";
/// Samples discarded before fan-out
pub const DROPPED_SAMPLES_TOTAL: &str = "dropped_samples_total";

/// Label carrying the sink name
pub const SINK_LABEL: &str = "remote";

/// Prometheus client default buckets
pub const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Why a sample never reached the sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// NaN or infinite value
    NonFinite,
    /// Series rejected by the filter rules
    Filtered,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NonFinite => "non_finite",
            Self::Filtered => "filtered",
        }
    }
}

/// Register help texts with the installed recorder
pub fn describe() {
    describe_counter!(
        RECEIVED_SAMPLES_TOTAL,
        Unit::Count,
        "Total number of received samples."
    );
    describe_counter!(
        SENT_SAMPLES_TOTAL,
        Unit::Count,
        "Total number of processed samples sent to remote storage."
    );
    describe_counter!(
        FAILED_SAMPLES_TOTAL,
        Unit::Count,
        "Total number of processed samples which failed on send to remote storage."
    );
    describe_histogram!(
        SENT_BATCH_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of sample batch send calls to the remote storage."
    );
    describe_counter!(
        DROPPED_SAMPLES_TOTAL,
        Unit::Count,
        "Total number of received samples discarded before fan-out."
    );
}

/// Record samples received by the write endpoint
pub fn record_samples_received(count: usize) {
    counter!(RECEIVED_SAMPLES_TOTAL).increment(count as u64);
}

/// Record samples discarded before fan-out
pub fn record_samples_dropped(reason: DropReason, count: usize) {
    if count == 0 {
        return;
    }
    counter!(DROPPED_SAMPLES_TOTAL, "reason" => reason.as_str()).increment(count as u64);
}

/// Record one sink delivery attempt
pub fn record_batch_outcome(sink_name: &str, samples: usize, success: bool, elapsed: Duration) {
    let name = if success {
        SENT_SAMPLES_TOTAL
    } else {
        FAILED_SAMPLES_TOTAL
    };
    counter!(name, SINK_LABEL => sink_name.to_string()).increment(samples as u64);
    histogram!(SENT_BATCH_DURATION_SECONDS, SINK_LABEL => sink_name.to_string())
        .record(elapsed.as_secs_f64());
}
