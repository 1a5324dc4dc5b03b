//! Azure Blob驱动配置

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::config::env_var;
use crate::error::{BlobError, Result};

/// SAS version used when none is configured
pub const DEFAULT_API_VERSION: &str = "2014-02-14";
pub const DEFAULT_ROOT_URL: &str = "https://{account}.blob.core.windows.net/{container}";

/// Azure Blob配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureBlobConfig {
    /// 存储账户名称
    pub account: String,
    /// 账户密钥（base64编码）
    #[serde(alias = "access_key")]
    pub secret_key: String,
    /// 根URL模板
    /// `{account}` / `{container}` 占位符，或两个 `%s`（先账户后容器）
    /// Azurite: http://127.0.0.1:10000/{account}/{container}
    #[serde(default = "default_root_url")]
    pub root_url: String,
    /// 容器名称
    pub container: String,
    /// SAS签名版本
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// 异步复制轮询间隔（毫秒）
    #[serde(default = "default_copy_poll_interval")]
    pub copy_poll_interval_ms: u64,
    /// 异步复制最多轮询次数
    #[serde(default = "default_copy_max_polls")]
    pub copy_max_polls: u32,
    /// 单个请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_root_url() -> String {
    DEFAULT_ROOT_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_copy_poll_interval() -> u64 {
    1000
}

fn default_copy_max_polls() -> u32 {
    60
}

fn default_request_timeout() -> u64 {
    300
}

impl AzureBlobConfig {
    pub fn new(
        account: impl Into<String>,
        secret_key: impl Into<String>,
        root_url: impl Into<String>,
        container: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            secret_key: secret_key.into(),
            root_url: root_url.into(),
            container: container.into(),
            api_version: api_version.into(),
            copy_poll_interval_ms: default_copy_poll_interval(),
            copy_max_polls: default_copy_max_polls(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    /// Read from `AZURE_STORAGE_*` environment variables / 从环境变量读取
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            env_var(name).ok_or_else(|| BlobError::Config(format!("{} not set", name)))
        };

        Ok(Self::new(
            required("AZURE_STORAGE_ACCOUNT")?,
            required("AZURE_STORAGE_KEY")?,
            env_var("AZURE_STORAGE_ROOT_URL").unwrap_or_else(default_root_url),
            required("AZURE_STORAGE_CONTAINER")?,
            env_var("AZURE_STORAGE_API_VERSION").unwrap_or_else(default_api_version),
        ))
    }

    /// Substitute account and container into the root URL template / 生成根URL
    pub fn base_url(&self) -> Result<String> {
        let template = self.root_url.trim();

        let url = if template.contains("{account}") && template.contains("{container}") {
            template
                .replace("{account}", &self.account)
                .replace("{container}", &self.container)
        } else if template.matches("%s").count() == 2 {
            template
                .replacen("%s", &self.account, 1)
                .replacen("%s", &self.container, 1)
        } else {
            return Err(BlobError::Config(format!(
                "root_url must contain {{account}} and {{container}} (or two %s): {}",
                template
            )));
        };

        let parsed = url::Url::parse(&url)
            .map_err(|e| BlobError::Config(format!("invalid root_url {}: {}", url, e)))?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(BlobError::Config(format!("root_url is not an http(s) URL: {}", url)));
        }

        Ok(url.trim_end_matches('/').to_string())
    }

    /// Blob service endpoint, i.e. the base URL without its container segment
    /// 服务端点（去掉容器段的根URL）
    pub fn service_url(&self) -> Result<String> {
        let base_url = self.base_url()?;
        base_url
            .strip_suffix(&format!("/{}", self.container))
            .filter(|endpoint| endpoint.contains("://") && !endpoint.ends_with('/'))
            .map(str::to_string)
            .ok_or_else(|| {
                BlobError::Config(format!("root_url must end with the container: {}", self.root_url))
            })
    }

    /// Decode the base64 account key / 解码账户密钥
    pub fn decode_key(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.secret_key.trim())
            .map_err(|e| BlobError::Config(format!("secret_key is not valid base64: {}", e)))
    }

    /// Check required fields / 校验必填项
    pub fn validate(&self) -> Result<()> {
        if self.account.is_empty() {
            return Err(BlobError::Config("account is required".to_string()));
        }
        if self.container.is_empty() {
            return Err(BlobError::Config("container is required".to_string()));
        }
        if self.api_version.is_empty() {
            return Err(BlobError::Config("api_version is required".to_string()));
        }
        Ok(())
    }
}
