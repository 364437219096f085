//! MemorySink - keeps delivered samples in memory
//!
//! Test double for the fan-out path. Clones share the same storage, so a
//! test can keep one clone and hand the other to the dispatcher.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use contracts::{ContractError, Sample, SampleSink};

#[derive(Debug, Default)]
struct Recorded {
    samples: Vec<Sample>,
    deliveries: usize,
}

/// In-memory sink with optional injected failure, panic and latency
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    fail_with: Option<String>,
    panic_with: Option<String>,
    delay: Duration,
    recorded: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    /// Create an always-succeeding sink
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_with: None,
            panic_with: None,
            delay: Duration::ZERO,
            recorded: Arc::default(),
        }
    }

    /// Reject every batch with the given message (nothing is recorded)
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Panic inside every `deliver` call (nothing is recorded)
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.panic_with = Some(message.into());
        self
    }

    /// Sleep before handling each batch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// All samples accepted so far
    pub fn samples(&self) -> Vec<Sample> {
        self.lock().samples.clone()
    }

    /// Number of samples accepted so far
    pub fn sample_count(&self) -> usize {
        self.lock().samples.len()
    }

    /// Number of `deliver` calls, failed ones included
    pub fn deliveries(&self) -> usize {
        self.lock().deliveries
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SampleSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, samples: &[Sample], _deadline: Instant) -> Result<(), ContractError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(message) = &self.panic_with {
            panic!("{message}");
        }

        let mut recorded = self.lock();
        recorded.deliveries += 1;
        if let Some(message) = &self.fail_with {
            return Err(ContractError::sink_write(&self.name, message.clone()));
        }
        recorded.samples.extend_from_slice(samples);
        Ok(())
    }
}
