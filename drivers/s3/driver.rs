//! S3驱动核心实现
//!
//! - 对象键统一加上base_path前缀，列表结果去掉前缀
//! - 删除/复制后轮询HeadObject确认结果
//! - 不支持SAS签名（S3使用预签名URL，不在此接口内）

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::request::ResponseData;
use s3::Region;

use super::config::S3Config;
use crate::error::{BlobError, Result};
use crate::storage::{resolve_content_type, Capability, OpContext, StorageDriver};
use crate::utils;

const PROVIDER: &str = "s3";

/// S3驱动
pub struct S3Driver {
    config: S3Config,
    bucket: Box<Bucket>,
    /// Same bucket with the upload headers (ACL, SSE, disposition) attached
    upload_bucket: Box<Bucket>,
    base_url: String,
    base_path: String,
}

impl S3Driver {
    /// 创建新的S3驱动实例
    pub fn new(config: S3Config) -> Result<Self> {
        config.validate()?;
        let bucket = Self::create_bucket(&config)?;

        let mut upload_bucket = bucket.clone();
        if !config.acl.is_empty() {
            upload_bucket.add_header("x-amz-acl", &config.acl);
        }
        if !config.server_side_encryption.is_empty() {
            upload_bucket.add_header("x-amz-server-side-encryption", &config.server_side_encryption);
        }
        if !config.content_disposition.is_empty() {
            upload_bucket.add_header("content-disposition", &config.content_disposition);
        }

        let base_url = config.base_url();
        let base_path = url::Url::parse(&base_url)
            .map(|u| u.path().trim_matches('/').to_string())
            .map_err(|e| BlobError::Config(format!("invalid base url {}: {}", base_url, e)))?;

        tracing::debug!("S3 driver ready: bucket={}, base_url={}", config.bucket, base_url);

        Ok(Self {
            config,
            bucket,
            upload_bucket,
            base_url,
            base_path,
        })
    }

    /// 创建S3 Bucket客户端
    fn create_bucket(config: &S3Config) -> Result<Box<Bucket>> {
        let optional = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        let access_key = optional(&config.access_key_id);
        let secret_key = optional(&config.secret_access_key);
        let session_token = optional(&config.session_token);

        let credentials = Credentials::new(
            access_key.as_deref(),
            secret_key.as_deref(),
            None,
            session_token.as_deref(),
            None,
        )
        .map_err(|e| BlobError::Config(format!("创建S3凭证失败: {}", e)))?;

        let region = if config.endpoint.is_empty() {
            Region::Custom {
                region: config.region.clone(),
                endpoint: format!("https://s3.{}.amazonaws.com", config.region),
            }
        } else {
            Region::Custom {
                region: config.region.clone(),
                endpoint: config.endpoint.trim_end_matches('/').to_string(),
            }
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| BlobError::Config(format!("创建S3 Bucket失败: {}", e)))?;

        Ok(if config.force_path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// 获取完整的对象键
    fn object_key(&self, key: &str) -> String {
        utils::join_key(&self.config.base_path, key)
    }

    /// 列表前缀，base_path下的空前缀要带上结尾的 `/`
    fn list_prefix(&self, prefix: &str) -> String {
        let root = self.config.base_path.trim_matches('/');
        if prefix.is_empty() && !root.is_empty() {
            format!("{}/", root)
        } else {
            self.object_key(prefix)
        }
    }

    /// Poll HeadObject until the object exists (or is gone) / 轮询HeadObject
    async fn wait_until(&self, ctx: &OpContext, key: &str, exists: bool) -> Result<()> {
        let interval = Duration::from_millis(self.config.wait_interval_ms);
        let attempts = self.config.wait_max_attempts.max(1);

        for attempt in 1..=attempts {
            let (_, code) = ctx.run(async { Ok(self.bucket.head_object(key).await?) }).await?;
            tracing::debug!("S3 HeadObject {}: {} -> {}", attempt, key, code);

            match code {
                200..=299 if exists => return Ok(()),
                404 if !exists => return Ok(()),
                200..=299 | 404 => {}
                other => {
                    return Err(BlobError::Provider {
                        provider: PROVIDER,
                        status: other,
                        message: format!("HeadObject {}", key),
                    })
                }
            }

            if attempt < attempts {
                ctx.sleep(interval).await?;
            }
        }

        let state = if exists { "exist" } else { "be deleted" };
        Err(BlobError::WaitTimeout(format!("{} to {}", key, state)))
    }
}

/// Map a non-2xx response to a provider error / 检查响应状态
fn check_response(resp: ResponseData) -> Result<ResponseData> {
    let status = resp.status_code();
    if (200..300).contains(&status) {
        return Ok(resp);
    }
    Err(BlobError::Provider {
        provider: PROVIDER,
        status,
        message: String::from_utf8_lossy(resp.bytes()).into_owned(),
    })
}

#[async_trait]
impl StorageDriver for S3Driver {
    fn name(&self) -> &'static str {
        "S3"
    }

    fn capabilities(&self) -> Capability {
        Capability {
            can_sign_urls: false,
            can_server_side_copy: true,
            confirms_delete: true,
        }
    }

    async fn upload(
        &self,
        ctx: &OpContext,
        key: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<String> {
        let content_type = resolve_content_type(content_type, key, &data);
        let object_key = self.object_key(key);
        tracing::debug!("S3上传: key={}, size={}, type={}", object_key, data.len(), content_type);

        let resp = ctx
            .run(async {
                Ok(self
                    .upload_bucket
                    .put_object_with_content_type(&object_key, &data, &content_type)
                    .await?)
            })
            .await?;
        check_response(resp)?;
        Ok(self.blob_url(key))
    }

    async fn delete(&self, ctx: &OpContext, key: &str) -> Result<String> {
        let object_key = self.object_key(key);
        tracing::debug!("S3删除: key={}", object_key);

        let resp = ctx
            .run(async { Ok(self.bucket.delete_object(&object_key).await?) })
            .await?;
        check_response(resp)?;

        self.wait_until(ctx, &object_key, false).await?;
        Ok(self.blob_url(key))
    }

    async fn list_objects(&self, ctx: &OpContext, prefix: &str) -> Result<Vec<String>> {
        let list_prefix = self.list_prefix(prefix);
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let (page, status) = ctx
                .run(async {
                    Ok(self
                        .bucket
                        .list_page(list_prefix.clone(), None, token.clone(), None, None)
                        .await?)
                })
                .await?;
            if !(200..300).contains(&status) {
                return Err(BlobError::Provider {
                    provider: PROVIDER,
                    status,
                    message: format!("ListObjectsV2 {}", list_prefix),
                });
            }

            keys.extend(
                page.contents
                    .iter()
                    .map(|obj| utils::strip_root(&self.config.base_path, &obj.key).to_string()),
            );

            match page.next_continuation_token {
                Some(next) if page.is_truncated && !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        tracing::debug!("S3列表: prefix={}, count={}", list_prefix, keys.len());
        Ok(keys)
    }

    async fn download(&self, ctx: &OpContext, key: &str) -> Result<Bytes> {
        let object_key = self.object_key(key);
        let resp = ctx
            .run(async { Ok(self.bucket.get_object(&object_key).await?) })
            .await?;
        let resp = check_response(resp)?;
        Ok(resp.bytes().clone())
    }

    async fn copy(&self, ctx: &OpContext, source_key: &str, dest_key: &str) -> Result<()> {
        let src = self.object_key(source_key);
        let dst = self.object_key(dest_key);
        // copy_object_internal的from参数需要URL编码（中文等非ASCII字符）
        let encoded_src = urlencoding::encode(&src).into_owned();
        tracing::debug!("S3 CopyObject: src={}, dst={}", src, dst);

        let code = ctx
            .run(async { Ok(self.bucket.copy_object_internal(&encoded_src, &dst).await?) })
            .await?;
        if !(200..300).contains(&code) {
            return Err(BlobError::Provider {
                provider: PROVIDER,
                status: code,
                message: format!("CopyObject {} -> {}", src, dst),
            });
        }

        self.wait_until(ctx, &dst, true).await
    }

    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    fn key_from_url(&self, url: &str) -> String {
        utils::key_from_url(url, &self.base_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config() -> S3Config {
        S3Config {
            bucket: "media".to_string(),
            region: "eu-west-1".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            ..S3Config::default()
        }
    }

    fn mock_driver(server: &mockito::Server, base_path: &str) -> S3Driver {
        S3Driver::new(S3Config {
            endpoint: server.url(),
            force_path_style: true,
            base_path: base_path.to_string(),
            wait_interval_ms: 10,
            wait_max_attempts: 3,
            ..config()
        })
        .unwrap()
    }

    fn list_body(keys: &[&str], next: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|k| {
                format!(
                    "<Contents><Key>{}</Key><LastModified>2024-01-01T00:00:00.000Z</LastModified>\
                     <ETag>\"x\"</ETag><Size>1</Size><StorageClass>STANDARD</StorageClass></Contents>",
                    k
                )
            })
            .collect();
        let next = next
            .map(|t| format!("<NextContinuationToken>{}</NextContinuationToken>", t))
            .unwrap_or_default();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListBucketResult><Name>media</Name><Prefix></Prefix><KeyCount>{}</KeyCount>\
             <MaxKeys>1000</MaxKeys><IsTruncated>{}</IsTruncated>{}{}</ListBucketResult>",
            keys.len(),
            !next.is_empty(),
            contents,
            next
        )
    }

    #[test]
    fn test_urls() {
        let d = S3Driver::new(S3Config {
            base_path: "uploads".to_string(),
            ..config()
        })
        .unwrap();
        assert_eq!(d.base_url(), "https://media.s3.eu-west-1.amazonaws.com/uploads");
        assert_eq!(
            d.object_url("a/b.png", false).unwrap(),
            "https://media.s3.eu-west-1.amazonaws.com/uploads/a/b.png"
        );
        assert_eq!(d.key_from_url(&d.blob_url("a/b.png")), "a/b.png");
        assert_eq!(d.object_url("", true).unwrap(), "");
    }

    #[test]
    fn test_signing_unsupported() {
        let d = S3Driver::new(config()).unwrap();
        assert!(d.sign("2024-01-01T00:00:00Z", "a.png").unwrap_err().is_unsupported());
        assert!(d.signed_url("a.png").unwrap_err().is_unsupported());
        assert!(d.object_url("a.png", true).unwrap_err().is_unsupported());
        assert!(!d.capabilities().can_sign_urls);
    }

    #[test]
    fn test_list_prefix() {
        let d = S3Driver::new(S3Config {
            base_path: "/uploads/".to_string(),
            ..config()
        })
        .unwrap();
        assert_eq!(d.list_prefix(""), "uploads/");
        assert_eq!(d.list_prefix("img/"), "uploads/img/");
        assert_eq!(d.object_key("a.png"), "uploads/a.png");
    }

    #[tokio::test]
    async fn test_upload_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/media/uploads/a.png")
            .match_header("content-type", "image/png")
            .match_header("x-amz-acl", "public-read")
            .match_header("x-amz-server-side-encryption", "AES256")
            .match_header("content-disposition", "attachment")
            .with_status(200)
            .create_async()
            .await;

        let mut cfg = config();
        cfg.endpoint = server.url();
        cfg.force_path_style = true;
        cfg.base_path = "uploads".to_string();
        cfg.acl = "public-read".to_string();
        let d = S3Driver::new(cfg).unwrap();

        let png = Bytes::from_static(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR");
        let url = d.upload(&OpContext::new(), "a.png", None, png).await.unwrap();
        assert_eq!(url, format!("{}/media/uploads/a.png", server.url()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_waits_until_gone() {
        crate::init_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("DELETE", "/media/a.png")
            .with_status(204)
            .create_async()
            .await;
        let head = server
            .mock("HEAD", "/media/a.png")
            .with_status(404)
            .create_async()
            .await;

        let d = mock_driver(&server, "");
        let url = d.delete(&OpContext::new(), "a.png").await.unwrap();
        assert_eq!(url, format!("{}/media/a.png", server.url()));
        delete.assert_async().await;
        head.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_gives_up() {
        let mut server = mockito::Server::new_async().await;
        let _delete = server
            .mock("DELETE", "/media/a.png")
            .with_status(204)
            .create_async()
            .await;
        let head = server
            .mock("HEAD", "/media/a.png")
            .with_status(200)
            .expect(3)
            .create_async()
            .await;

        let d = mock_driver(&server, "");
        let err = d.delete(&OpContext::new(), "a.png").await.unwrap_err();
        assert!(matches!(err, BlobError::WaitTimeout(_)));
        head.assert_async().await;
    }

    #[tokio::test]
    async fn test_copy_waits_until_exists() {
        let mut server = mockito::Server::new_async().await;
        let copy = server
            .mock("PUT", "/media/b.png")
            .match_header("x-amz-copy-source", Matcher::Regex("a\\.png$".to_string()))
            .with_status(200)
            .with_body("<CopyObjectResult><ETag>\"x\"</ETag></CopyObjectResult>")
            .create_async()
            .await;
        let head = server
            .mock("HEAD", "/media/b.png")
            .with_status(200)
            .create_async()
            .await;

        let d = mock_driver(&server, "");
        d.copy(&OpContext::new(), "a.png", "b.png").await.unwrap();
        copy.assert_async().await;
        head.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/media/missing.png")
            .with_status(404)
            .with_body("<Error><Code>NoSuchKey</Code></Error>")
            .create_async()
            .await;

        let d = mock_driver(&server, "");
        let err = d.download(&OpContext::new(), "missing.png").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_follows_continuation() {
        crate::init_test_tracing();
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", Matcher::Regex("^/media/?$".to_string()))
            .match_query(Matcher::UrlEncoded("list-type".to_string(), "2".to_string()))
            .with_status(200)
            .with_body(list_body(&["uploads/img/1.png", "uploads/img/2.png"], Some("tok2")))
            .create_async()
            .await;
        let second = server
            .mock("GET", Matcher::Regex("^/media/?$".to_string()))
            .match_query(Matcher::UrlEncoded(
                "continuation-token".to_string(),
                "tok2".to_string(),
            ))
            .with_status(200)
            .with_body(list_body(&["uploads/img/3.png"], None))
            .create_async()
            .await;

        let d = mock_driver(&server, "uploads");
        let keys = d.list_objects(&OpContext::new(), "img/").await.unwrap();
        assert_eq!(keys, vec!["img/1.png", "img/2.png", "img/3.png"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _denied = server
            .mock("GET", Matcher::Regex("^/media/?$".to_string()))
            .match_query(Matcher::UrlEncoded("prefix".to_string(), "private/".to_string()))
            .with_status(403)
            .with_body("<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>")
            .create_async()
            .await;
        // gateways may answer an error status with a listing-shaped body
        let _gateway = server
            .mock("GET", Matcher::Regex("^/media/?$".to_string()))
            .match_query(Matcher::UrlEncoded("prefix".to_string(), "img/".to_string()))
            .with_status(403)
            .with_body(list_body(&["img/1.png"], None))
            .create_async()
            .await;

        let d = mock_driver(&server, "");
        let ctx = OpContext::new();
        assert!(d.list_objects(&ctx, "private/").await.is_err());

        let err = d.list_objects(&ctx, "img/").await.unwrap_err();
        assert!(matches!(err, BlobError::Provider { status: 403, .. }));
    }
}
