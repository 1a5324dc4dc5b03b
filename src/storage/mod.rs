use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{BlobError, Result};

/// Driver capability declaration / 驱动能力声明
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capability {
    /// Can produce shared access signatures / 支持签名URL
    pub can_sign_urls: bool,
    /// Copy runs on the provider side (no download needed) / 支持服务端复制
    pub can_server_side_copy: bool,
    /// Delete waits until the object is gone / 删除后确认对象不存在
    pub confirms_delete: bool,
}

/// Storage driver interface / 存储驱动接口
///
/// One implementation per provider. Remote operations take an [`OpContext`];
/// URL helpers are pure and never touch the network.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &'static str;

    /// Driver capabilities / 驱动能力
    fn capabilities(&self) -> Capability;

    /// Write `data` at `key`, returning the canonical URL / 上传对象
    ///
    /// When `content_type` is `None` it is sniffed from the data.
    async fn upload(
        &self,
        ctx: &OpContext,
        key: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<String>;

    /// Remove `key`, returning its canonical URL / 删除对象
    async fn delete(&self, ctx: &OpContext, key: &str) -> Result<String>;

    /// All keys under `prefix`, following pagination to the end / 列出对象
    async fn list_objects(&self, ctx: &OpContext, prefix: &str) -> Result<Vec<String>>;

    /// Whole object content / 下载对象
    async fn download(&self, ctx: &OpContext, key: &str) -> Result<Bytes>;

    /// Server-side copy / 复制对象
    async fn copy(&self, ctx: &OpContext, source_key: &str, dest_key: &str) -> Result<()>;

    /// Container/bucket root URL / 根URL
    fn base_url(&self) -> String;

    /// Canonical URL of `key` (no signature) / 对象规范URL
    fn blob_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url(), key)
    }

    /// Signed read URL of `key` / 签名URL
    fn signed_url(&self, _key: &str) -> Result<String> {
        Err(BlobError::unsupported(self.name(), "signed_url"))
    }

    /// Object URL, optionally signed. Empty keys pass through untouched.
    fn object_url(&self, key: &str, with_signature: bool) -> Result<String> {
        if key.is_empty() {
            return Ok(String::new());
        }
        if with_signature {
            self.signed_url(key)
        } else {
            Ok(self.blob_url(key))
        }
    }

    /// Extract the object key from a URL; returns the input on parse failure.
    fn key_from_url(&self, url: &str) -> String;

    /// Shared access signature for `key` expiring at `expiry` / 生成访问签名
    fn sign(&self, _expiry: &str, _key: &str) -> Result<String> {
        Err(BlobError::unsupported(self.name(), "sign"))
    }
}

pub mod context;
pub mod manager;
pub mod sniff;

pub use context::OpContext;
pub use manager::{DriverBox, DriverFactory, StorageManager};
pub use sniff::{resolve_content_type, sniff_content_type};
