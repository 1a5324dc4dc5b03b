//! S3驱动工厂

use anyhow::{anyhow, Result};
use serde_json::Value;

use super::config::S3Config;
use super::driver::S3Driver;
use crate::storage::{DriverFactory, StorageDriver};

/// S3驱动工厂
pub struct S3DriverFactory;

impl DriverFactory for S3DriverFactory {
    fn driver_type(&self) -> &'static str {
        "s3"
    }

    fn create_driver(&self, config: Value) -> Result<Box<dyn StorageDriver>> {
        let config: S3Config = serde_json::from_value(config)
            .map_err(|e| anyhow!("配置解析失败: {}", e))?;
        Ok(Box::new(S3Driver::new(config)?))
    }
}
