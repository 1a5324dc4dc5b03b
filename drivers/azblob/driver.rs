//! Azure Blob驱动核心实现
//!
//! - 请求通过azure_storage_blobs发送（Shared Key认证，不自动重试）
//! - 上传/删除返回对象的规范URL（不带签名）
//! - 列表按NextMarker翻页直到末页
//! - 异步复制轮询到完成或失败
//! - 支持SAS只读签名URL

use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_core::RetryOptions;
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::blob::CopyStatus;
use azure_storage_blobs::prelude::{BlobClient, ClientBuilder, ContainerClient, DeleteSnapshotsMethod};
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;

use super::config::AzureBlobConfig;
use super::signer;
use crate::error::{BlobError, Result};
use crate::storage::{resolve_content_type, Capability, OpContext, StorageDriver};
use crate::utils;

const PROVIDER: &str = "azblob";

/// Azure Blob驱动
pub struct AzureBlobDriver {
    config: AzureBlobConfig,
    base_url: String,
    /// Path of `base_url`, stripped by `key_from_url`
    base_path: String,
    key: Vec<u8>,
    container: ContainerClient,
    request_timeout: Duration,
}

impl AzureBlobDriver {
    /// 创建新的Azure Blob驱动实例
    ///
    /// Validates the template and decodes the account key up front, so a bad
    /// configuration never reaches the first request.
    pub fn new(config: AzureBlobConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url()?;
        let key = config.decode_key()?;
        signer::check_key(&key)?;

        let base_path = url::Url::parse(&base_url)
            .map(|u| u.path().trim_matches('/').to_string())
            .map_err(|e| BlobError::Config(format!("invalid base url {}: {}", base_url, e)))?;

        let location = CloudLocation::Custom {
            account: config.account.clone(),
            uri: config.service_url()?,
        };
        let credentials =
            StorageCredentials::access_key(config.account.clone(), config.secret_key.trim().to_string());
        let container = ClientBuilder::with_location(location, credentials)
            .retry(RetryOptions::none())
            .container_client(config.container.clone());

        tracing::debug!("Azure Blob driver ready: {}", base_url);

        Ok(Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            config,
            base_url,
            base_path,
            key,
            container,
        })
    }

    pub fn config(&self) -> &AzureBlobConfig {
        &self.config
    }

    /// Signed URL with an explicit expiry / 指定过期时间的签名URL
    pub fn signed_url_with_expiry(&self, key: &str, expiry: &str) -> Result<String> {
        let sig = self.sign(expiry, key)?;
        Ok(format!(
            "{}?{}",
            self.blob_url(key),
            signer::signed_query(expiry, &sig, &self.config.api_version)
        ))
    }

    /// Client for one blob. `.` and `..` segments are refused: the request
    /// path would be normalized to a different blob than the one named.
    fn blob_client(&self, key: &str) -> Result<BlobClient> {
        if key.split('/').any(|seg| seg == "." || seg == "..") {
            return Err(BlobError::Config(format!("blob key has a dot segment: {}", key)));
        }
        Ok(self.container.blob_client(key))
    }

    /// Send one SDK request under `ctx` and the per-request timeout
    async fn call<T, F>(&self, ctx: &OpContext, request: F) -> Result<T>
    where
        F: IntoFuture<Output = azure_core::Result<T>>,
    {
        let timeout = self.request_timeout;
        ctx.run(async move {
            match tokio::time::timeout(timeout, request.into_future()).await {
                Ok(res) => res.map_err(map_azure_error),
                Err(_) => Err(BlobError::DeadlineExceeded),
            }
        })
        .await
    }

    async fn wait_for_copy(
        &self,
        ctx: &OpContext,
        dest: &BlobClient,
        dest_key: &str,
        mut status: CopyStatus,
        mut description: Option<String>,
    ) -> Result<()> {
        let interval = Duration::from_millis(self.config.copy_poll_interval_ms);
        let mut polls = 0;

        loop {
            match status {
                CopyStatus::Success => return Ok(()),
                CopyStatus::Pending => {
                    if polls >= self.config.copy_max_polls {
                        return Err(BlobError::WaitTimeout(format!("copy to {}", dest_key)));
                    }
                    polls += 1;
                    ctx.sleep(interval).await?;

                    let props = self.call(ctx, dest.get_properties()).await?.blob.properties;
                    // 没有复制记录视为已完成
                    status = props.copy_status.unwrap_or(CopyStatus::Success);
                    description = props.copy_status_description;
                    tracing::debug!("Azure copy poll {}: {} -> {:?}", polls, dest_key, status);
                }
                ended => {
                    let status = format!(
                        "{} {}",
                        format!("{:?}", ended).to_lowercase(),
                        description.unwrap_or_default()
                    );
                    return Err(BlobError::CopyFailed {
                        key: dest_key.to_string(),
                        status: status.trim_end().to_string(),
                    });
                }
            }
        }
    }
}

/// Error statuses become [`BlobError::Provider`] carrying the service error code.
fn map_azure_error(err: azure_core::Error) -> BlobError {
    match err.kind() {
        ErrorKind::HttpResponse { status, error_code } => BlobError::Provider {
            provider: PROVIDER,
            status: u16::from(*status),
            message: error_code.clone().unwrap_or_else(|| err.to_string()),
        },
        _ => BlobError::Azure(err),
    }
}

#[async_trait]
impl StorageDriver for AzureBlobDriver {
    fn name(&self) -> &'static str {
        "AzureBlob"
    }

    fn capabilities(&self) -> Capability {
        Capability {
            can_sign_urls: true,
            can_server_side_copy: true,
            confirms_delete: false,
        }
    }

    async fn upload(
        &self,
        ctx: &OpContext,
        key: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<String> {
        let blob = self.blob_client(key)?;
        let content_type = resolve_content_type(content_type, key, &data);
        tracing::debug!("Azure上传: key={}, size={}, type={}", key, data.len(), content_type);

        self.call(ctx, blob.put_block_blob(data).content_type(content_type))
            .await?;
        Ok(self.blob_url(key))
    }

    async fn delete(&self, ctx: &OpContext, key: &str) -> Result<String> {
        let blob = self.blob_client(key)?;
        tracing::debug!("Azure删除: key={}", key);
        self.call(
            ctx,
            blob.delete().delete_snapshots_method(DeleteSnapshotsMethod::Include),
        )
        .await?;
        Ok(self.blob_url(key))
    }

    async fn list_objects(&self, ctx: &OpContext, prefix: &str) -> Result<Vec<String>> {
        let mut request = self.container.list_blobs();
        if !prefix.is_empty() {
            request = request.prefix(prefix.to_string());
        }
        let mut pages = request.into_stream();

        let mut keys = Vec::new();
        loop {
            let next = ctx
                .run(async {
                    tokio::time::timeout(self.request_timeout, pages.next())
                        .await
                        .map_err(|_| BlobError::DeadlineExceeded)
                })
                .await?;
            match next {
                Some(page) => {
                    let page = page.map_err(map_azure_error)?;
                    keys.extend(page.blobs.blobs().map(|blob| blob.name.clone()));
                }
                None => break,
            }
        }

        tracing::debug!("Azure列表: prefix={}, count={}", prefix, keys.len());
        Ok(keys)
    }

    async fn download(&self, ctx: &OpContext, key: &str) -> Result<Bytes> {
        let blob = self.blob_client(key)?;
        let content = self.call(ctx, blob.get_content()).await?;
        Ok(Bytes::from(content))
    }

    async fn copy(&self, ctx: &OpContext, source_key: &str, dest_key: &str) -> Result<()> {
        let source_url = self.blob_client(source_key)?.url().map_err(map_azure_error)?;
        let dest = self.blob_client(dest_key)?;
        tracing::debug!("Azure复制: src={}, dst={}", source_key, dest_key);

        let started = self.call(ctx, dest.copy(source_url)).await?;
        self.wait_for_copy(ctx, &dest, dest_key, started.copy_status, None)
            .await
    }

    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    fn signed_url(&self, key: &str) -> Result<String> {
        let expiry = signer::expiry_after(Utc::now(), signer::EXPIRE_SECS);
        self.signed_url_with_expiry(key, &expiry)
    }

    fn key_from_url(&self, url: &str) -> String {
        utils::key_from_url(url, &self.base_path)
    }

    fn sign(&self, expiry: &str, key: &str) -> Result<String> {
        let to_sign = signer::string_to_sign(
            &self.config.account,
            &self.config.container,
            key,
            expiry,
            &self.config.api_version,
        );
        signer::hmac_base64(&self.key, &to_sign)
    }
}
