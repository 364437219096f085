//! Sink metrics for observability
//!
//! In-process counters mirrored next to the Prometheus series, so callers
//! and tests can read per-sink totals without a global recorder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Samples handed to the sink
    attempted_samples: AtomicU64,
    /// Samples in batches that succeeded
    sent_samples: AtomicU64,
    /// Samples in batches that failed
    failed_samples: AtomicU64,
    /// Successful deliveries
    sent_batches: AtomicU64,
    /// Failed deliveries (error, timeout or panic)
    failed_batches: AtomicU64,
    /// Sum of delivery durations
    duration_micros: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished delivery attempt
    pub fn record(&self, samples: usize, success: bool, elapsed: Duration) {
        let samples = samples as u64;
        self.attempted_samples.fetch_add(samples, Ordering::Relaxed);
        if success {
            self.sent_samples.fetch_add(samples, Ordering::Relaxed);
            self.sent_batches.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_samples.fetch_add(samples, Ordering::Relaxed);
            self.failed_batches.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.duration_micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Get attempted sample count
    pub fn attempted_samples(&self) -> u64 {
        self.attempted_samples.load(Ordering::Relaxed)
    }

    /// Get sent sample count
    pub fn sent_samples(&self) -> u64 {
        self.sent_samples.load(Ordering::Relaxed)
    }

    /// Get failed sample count
    pub fn failed_samples(&self) -> u64 {
        self.failed_samples.load(Ordering::Relaxed)
    }

    /// Get failed delivery count
    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let sent_batches = self.sent_batches.load(Ordering::Relaxed);
        let failed_batches = self.failed_batches();
        MetricsSnapshot {
            attempted_samples: self.attempted_samples(),
            sent_samples: self.sent_samples(),
            failed_samples: self.failed_samples(),
            sent_batches,
            failed_batches,
            duration_count: sent_batches + failed_batches,
            duration_total: Duration::from_micros(self.duration_micros.load(Ordering::Relaxed)),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub attempted_samples: u64,
    pub sent_samples: u64,
    pub failed_samples: u64,
    pub sent_batches: u64,
    pub failed_batches: u64,
    /// Observations in the duration histogram
    pub duration_count: u64,
    pub duration_total: Duration,
}
