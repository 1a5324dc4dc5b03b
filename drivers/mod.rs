// Driver package / 驱动包
pub mod azblob;
pub mod s3;

use crate::storage::StorageManager;

/// Register all drivers to StorageManager / 注册所有驱动
pub async fn register_all(manager: &StorageManager) {
    // Register Azure Blob Storage driver / 注册Azure Blob驱动
    manager.register_factory(Box::new(azblob::AzureBlobDriverFactory)).await;
    // Register S3 driver / 注册S3对象存储驱动
    manager.register_factory(Box::new(s3::S3DriverFactory)).await;
}
