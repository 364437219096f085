//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 请求体不是合法的 snappy block
    #[error("snappy decode error: {0}")]
    Decompress(#[from] snap::Error),

    /// 解压后的内容不是合法的 WriteRequest
    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// 监听地址无法解析
    #[error("invalid listen address '{address}'")]
    InvalidAddress {
        /// 原始地址
        address: String,
    },

    /// 绑定或服务失败
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
