//! Sink implementations
//!
//! Contains AmqpSink, LogSink, and MemorySink.

mod amqp;
mod log;
mod memory;

pub use self::amqp::{AmqpSink, AmqpSinkConfig, SampleMessage};
pub use self::log::{metric_path, LogSink};
pub use self::memory::MemorySink;
