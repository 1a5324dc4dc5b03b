//! Azure Blob驱动工厂

use anyhow::{anyhow, Result};
use serde_json::Value;

use super::config::AzureBlobConfig;
use super::driver::AzureBlobDriver;
use crate::storage::{DriverFactory, StorageDriver};

/// Azure Blob驱动工厂
pub struct AzureBlobDriverFactory;

impl DriverFactory for AzureBlobDriverFactory {
    fn driver_type(&self) -> &'static str {
        "azblob"
    }

    fn create_driver(&self, config: Value) -> Result<Box<dyn StorageDriver>> {
        let config: AzureBlobConfig = serde_json::from_value(config)
            .map_err(|e| anyhow!("配置解析失败: {}", e))?;
        Ok(Box::new(AzureBlobDriver::new(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_from_json() {
        let driver = AzureBlobDriverFactory
            .create_driver(json!({
                "account": "acct",
                "secret_key": "MDA=",
                "container": "pics",
            }))
            .unwrap();
        assert_eq!(driver.name(), "AzureBlob");
        assert_eq!(driver.base_url(), "https://acct.blob.core.windows.net/pics");
    }

    #[test]
    fn test_missing_field() {
        let err = AzureBlobDriverFactory
            .create_driver(json!({ "account": "acct" }))
            .err()
            .unwrap();
        assert!(err.to_string().contains("配置解析失败"));
    }
}
