//! Dispatcher error types

use std::time::Duration;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Delivery ran past the sink's timeout and was abandoned
    #[error("sink '{sink_name}' timed out after {timeout:?}")]
    Timeout { sink_name: String, timeout: Duration },

    /// Delivery task panicked
    #[error("sink '{sink_name}' panicked: {message}")]
    SinkPanicked { sink_name: String, message: String },

    /// Sink delivery error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
