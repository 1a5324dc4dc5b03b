//! Storage configuration module / 存储配置模块
//!
//! Loads named driver definitions from a JSON file. The loaded value is
//! handed back to the caller; nothing is kept in global state.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage configuration / 存储配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Driver instances to create / 要创建的驱动实例
    #[serde(default)]
    pub drivers: Vec<DriverEntry>,
}

/// One named driver instance / 单个驱动实例配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverEntry {
    /// Instance name, unique within the manager / 实例名称
    pub name: String,
    /// Factory type, e.g. `azblob` or `s3` / 驱动类型
    pub driver_type: String,
    /// Driver specific settings / 驱动配置
    #[serde(default)]
    pub config: Value,
}

impl StorageConfig {
    /// Find a driver entry by name / 按名称查找驱动配置
    pub fn driver(&self, name: &str) -> Option<&DriverEntry> {
        self.drivers.iter().find(|d| d.name == name)
    }
}

/// Load configuration from file / 加载配置文件
pub fn load_config(path: impl AsRef<Path>) -> Result<StorageConfig> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;

    let config: StorageConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;

    tracing::info!("Loaded storage configuration from {:?} ({} drivers)", path, config.drivers.len());
    Ok(config)
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(path: impl AsRef<Path>, config: &StorageConfig) -> Result<()> {
    let path = path.as_ref();

    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    std::fs::write(path, content).with_context(|| format!("Failed to write config file {:?}", path))?;

    Ok(())
}

/// Read an environment variable, treating empty values as missing / 读取环境变量
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
