//! # Ingestion
//!
//! Prometheus remote-write 接入层。
//!
//! 负责：
//! - 解码 snappy + protobuf 格式的 `WriteRequest`
//! - 将时间序列展开为 `Sample`
//! - 提供 HTTP 端点（写入与自身 telemetry），交给 `Dispatcher` 分发
//!
//! ## 使用示例
//!
//! ```ignore
//! use ingestion::{bind, router, serve, shutdown_signal, AppState};
//!
//! let state = AppState::new(Arc::new(dispatcher), Some(metrics_handle));
//! let listener = bind(&config.server).await?;
//! serve(listener, router(state, &config.server), shutdown_signal()).await?;
//! ```

mod decode;
mod error;
pub mod proto;
mod server;

pub use decode::{decode_write_request, encode_write_request};
pub use error::{IngestionError, Result};
pub use server::{bind, normalize_listen_address, router, serve, shutdown_signal, AppState};
