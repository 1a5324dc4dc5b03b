//! Blob storage facade over Azure Blob Storage and S3.
//!
//! 统一的对象存储接口：上传、删除、列表、下载、复制，
//! 以及对象URL和SAS签名的生成。

pub mod config;
pub mod error;
pub mod storage;
pub mod utils;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use drivers::azblob::{AzureBlobConfig, AzureBlobDriver};
pub use drivers::s3::{S3Config, S3Driver};
pub use error::{BlobError, Result};
pub use storage::{Capability, OpContext, StorageDriver, StorageManager};

/// Route `tracing` output through the test harness / 测试日志
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
