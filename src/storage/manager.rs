use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use anyhow::{anyhow, Result};
use serde_json::Value;

use super::StorageDriver;
use crate::config::StorageConfig;

pub type DriverBox = Arc<dyn StorageDriver>;

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// 创建驱动实例
    fn create_driver(&self, config: Value) -> Result<Box<dyn StorageDriver>>;
}

/// Storage manager (manages named driver instances) / 存储管理器
///
/// Each instance owns its own configuration, so several accounts or
/// containers can be used side by side.
#[derive(Clone)]
pub struct StorageManager {
    drivers: Arc<RwLock<HashMap<String, DriverBox>>>,
    factories: Arc<RwLock<HashMap<String, Arc<dyn DriverFactory>>>>,
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            drivers: Arc::new(RwLock::new(HashMap::new())),
            factories: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Manager with every built-in driver factory registered / 注册全部内置驱动
    pub async fn with_builtin_drivers() -> Self {
        let manager = Self::new();
        crate::drivers::register_all(&manager).await;
        manager
    }

    /// Build a manager and all drivers listed in `config` / 根据配置创建驱动
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        let manager = Self::with_builtin_drivers().await;
        for entry in &config.drivers {
            manager
                .create_driver(entry.name.clone(), &entry.driver_type, entry.config.clone())
                .await?;
        }
        Ok(manager)
    }

    /// Register driver factory / 注册驱动工厂
    pub async fn register_factory(&self, factory: Box<dyn DriverFactory>) {
        let driver_type = factory.driver_type().to_string();

        let mut factories = self.factories.write().await;
        factories.insert(driver_type.clone(), Arc::from(factory));

        tracing::info!("Driver factory registered: {}", driver_type);
    }

    /// Create driver instance under `id` / 创建驱动实例
    pub async fn create_driver(&self, id: String, driver_type: &str, config: Value) -> Result<String> {
        let factory = {
            let factories = self.factories.read().await;
            factories
                .get(driver_type)
                .cloned()
                .ok_or_else(|| anyhow!("Driver type not found: {}", driver_type))?
        };

        match factory.create_driver(config) {
            Ok(driver) => {
                let mut drivers = self.drivers.write().await;
                if drivers.insert(id.clone(), Arc::from(driver)).is_some() {
                    tracing::warn!("Driver replaced: {} ({})", id, driver_type);
                } else {
                    tracing::info!("Driver created: {} ({})", id, driver_type);
                }
                Ok(id)
            }
            Err(e) => {
                tracing::error!("Driver creation failed: {} ({}) - {}", id, driver_type, e);
                Err(e)
            }
        }
    }

    /// Insert an already built driver / 添加已构建的驱动
    pub async fn insert_driver(&self, id: impl Into<String>, driver: DriverBox) {
        let mut drivers = self.drivers.write().await;
        drivers.insert(id.into(), driver);
    }

    /// Get driver instance / 获取驱动实例
    pub async fn get_driver(&self, id: &str) -> Option<DriverBox> {
        let drivers = self.drivers.read().await;
        drivers.get(id).cloned()
    }

    /// Remove driver instance / 移除驱动实例
    pub async fn remove_driver(&self, id: &str) -> Result<()> {
        let mut drivers = self.drivers.write().await;
        drivers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Driver not found: {}", id))
    }

    /// List driver ids (sorted) / 列出驱动ID
    pub async fn list_drivers(&self) -> Vec<String> {
        let drivers = self.drivers.read().await;
        let mut ids: Vec<String> = drivers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// List registered driver types (sorted) / 列出已注册的驱动类型
    pub async fn list_driver_types(&self) -> Vec<String> {
        let factories = self.factories.read().await;
        let mut types: Vec<String> = factories.keys().cloned().collect();
        types.sort();
        types
    }
}
