//! # Dispatcher
//!
//! 样本分发模块。
//!
//! 负责：
//! - 按过滤规则筛选样本
//! - 并发 fan-out 到多个 sinks
//! - 隔离慢 sink 与失败 sink，每个 sink 独立超时

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{Sample, SampleSink};
pub use dispatcher::{DispatchStats, DispatchSummary, Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use handle::{PendingDelivery, SinkHandle, SinkOutcome};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{AmqpSink, AmqpSinkConfig, LogSink, MemorySink, SampleMessage};
