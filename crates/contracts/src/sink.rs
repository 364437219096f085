//! SampleSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use std::time::Instant;

use crate::{ContractError, Sample};

/// Delivery target for filtered samples
///
/// All sink implementations must implement this trait. Sinks are shared
/// across concurrent dispatch calls, hence `&self`.
#[trait_variant::make(SampleSink: Send)]
pub trait LocalSampleSink {
    /// Sink name (used for logging/metrics), stable for the sink's lifetime
    fn name(&self) -> &str;

    /// Deliver a batch before `deadline`
    ///
    /// Samples may be delivered individually; if any of them fails the whole
    /// call reports an error even though a subset may already be on the wire.
    ///
    /// # Errors
    /// Returns delivery error (should include context). Implementations must
    /// give up once `deadline` has passed.
    async fn deliver(&self, samples: &[Sample], deadline: Instant) -> Result<(), ContractError>;
}
