//! Error types / 错误类型
//!
//! Provider errors are passed through as-is; nothing here retries.

use thiserror::Error;

/// Blob storage error / 存储错误
#[derive(Debug, Error)]
pub enum BlobError {
    /// Invalid or missing configuration / 配置错误
    #[error("configuration error: {0}")]
    Config(String),

    /// Service answered with a non-success status / 服务返回错误状态
    #[error("{provider} returned status {status}: {message}")]
    Provider {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Azure SDK failure other than an error status / Azure客户端错误
    #[error("azure error: {0}")]
    Azure(#[from] azure_core::Error),

    /// S3 client failure / S3客户端错误
    #[error("s3 error: {0}")]
    S3(#[from] s3::error::S3Error),

    /// Driver cannot perform this operation / 驱动不支持该操作
    #[error("{operation} is not supported by the {driver} driver")]
    Unsupported {
        driver: &'static str,
        operation: &'static str,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// Bounded wait gave up / 等待超时
    #[error("gave up waiting for {0}")]
    WaitTimeout(String),

    /// Server-side copy ended in a terminal non-success state / 服务端复制失败
    #[error("copy to {key} ended with status {status}")]
    CopyFailed { key: String, status: String },
}

impl BlobError {
    pub fn unsupported(driver: &'static str, operation: &'static str) -> Self {
        BlobError::Unsupported { driver, operation }
    }

    /// Whether the driver reported the operation as unsupported / 是否为不支持的操作
    pub fn is_unsupported(&self) -> bool {
        matches!(self, BlobError::Unsupported { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::Provider { status: 404, .. })
    }
}

pub type Result<T, E = BlobError> = std::result::Result<T, E>;
