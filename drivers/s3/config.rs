//! S3驱动配置

use serde::{Deserialize, Serialize};

use crate::config::env_var;
use crate::error::{BlobError, Result};

/// S3配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// 存储桶名称
    pub bucket: String,
    /// 区域
    #[serde(default = "default_region")]
    pub region: String,
    /// S3端点地址，留空使用AWS
    /// MinIO: http://localhost:9000
    #[serde(default)]
    pub endpoint: String,
    /// Access Key ID
    pub access_key_id: String,
    /// Secret Access Key
    pub secret_access_key: String,
    /// Session Token（用于临时凭证）
    #[serde(default)]
    pub session_token: String,
    /// 存储桶内的键前缀
    #[serde(default, alias = "root_path")]
    pub base_path: String,
    /// 上传时的canned ACL，留空不设置
    #[serde(default)]
    pub acl: String,
    /// 公开访问域名（CDN），用于生成对象URL
    #[serde(default, alias = "custom_host")]
    pub public_host: String,
    /// 强制使用路径风格（而非虚拟主机风格）
    /// MinIO等需要设置为true
    #[serde(default)]
    pub force_path_style: bool,
    #[serde(default = "default_content_disposition")]
    pub content_disposition: String,
    #[serde(default = "default_sse")]
    pub server_side_encryption: String,
    /// HeadObject轮询间隔（毫秒）
    #[serde(default = "default_wait_interval")]
    pub wait_interval_ms: u64,
    /// HeadObject最多轮询次数
    #[serde(default = "default_wait_attempts")]
    pub wait_max_attempts: u32,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_content_disposition() -> String {
    "attachment".to_string()
}

fn default_sse() -> String {
    "AES256".to_string()
}

fn default_wait_interval() -> u64 {
    5000
}

fn default_wait_attempts() -> u32 {
    20
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            endpoint: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: String::new(),
            base_path: String::new(),
            acl: String::new(),
            public_host: String::new(),
            force_path_style: false,
            content_disposition: default_content_disposition(),
            server_side_encryption: default_sse(),
            wait_interval_ms: default_wait_interval(),
            wait_max_attempts: default_wait_attempts(),
        }
    }
}

impl S3Config {
    /// Read from `S3_*` / `AWS_*` environment variables / 从环境变量读取
    pub fn from_env() -> Result<Self> {
        let bucket = env_var("S3_BUCKET")
            .ok_or_else(|| BlobError::Config("S3_BUCKET not set".to_string()))?;

        Ok(Self {
            bucket,
            region: env_var("S3_REGION").unwrap_or_else(default_region),
            endpoint: env_var("S3_ENDPOINT").unwrap_or_default(),
            access_key_id: env_var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: env_var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            session_token: env_var("AWS_SESSION_TOKEN").unwrap_or_default(),
            base_path: env_var("S3_BASE_PATH").unwrap_or_default(),
            acl: env_var("S3_ACL").unwrap_or_default(),
            ..Self::default()
        })
    }

    /// Public root URL of the bucket (base path included) / 存储桶根URL
    pub fn base_url(&self) -> String {
        let root = if !self.public_host.is_empty() {
            self.public_host.trim_end_matches('/').to_string()
        } else if !self.endpoint.is_empty() {
            format!("{}/{}", self.endpoint.trim_end_matches('/'), self.bucket)
        } else {
            format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region)
        };

        let base_path = self.base_path.trim_matches('/');
        if base_path.is_empty() {
            root
        } else {
            format!("{}/{}", root, base_path)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(BlobError::Config("bucket is required".to_string()));
        }
        if self.region.is_empty() {
            return Err(BlobError::Config("region is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            bucket: "media".to_string(),
            region: "eu-west-1".to_string(),
            ..S3Config::default()
        }
    }

    #[test]
    fn test_aws_base_url() {
        let mut cfg = config();
        assert_eq!(cfg.base_url(), "https://media.s3.eu-west-1.amazonaws.com");

        cfg.base_path = "/uploads/".to_string();
        assert_eq!(cfg.base_url(), "https://media.s3.eu-west-1.amazonaws.com/uploads");
    }

    #[test]
    fn test_endpoint_and_public_host() {
        let mut cfg = config();
        cfg.endpoint = "http://localhost:9000/".to_string();
        assert_eq!(cfg.base_url(), "http://localhost:9000/media");

        cfg.public_host = "https://cdn.example.com/".to_string();
        assert_eq!(cfg.base_url(), "https://cdn.example.com");
    }

    #[test]
    fn test_serde_defaults() {
        let cfg: S3Config = serde_json::from_value(serde_json::json!({
            "bucket": "media",
            "access_key_id": "AKIDEXAMPLE",
            "secret_access_key": "secret",
            "root_path": "uploads",
        }))
        .unwrap();
        assert_eq!(cfg.region, "us-east-1");
        assert_eq!(cfg.base_path, "uploads");
        assert_eq!(cfg.content_disposition, "attachment");
        assert_eq!(cfg.server_side_encryption, "AES256");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(S3Config::default().validate().is_err());
    }
}
