//! Azure SAS签名
//!
//! 只读签名URL，使用固定的11字段待签名格式。
//! REST请求的Shared Key认证由azure_storage完成。

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{BlobError, Result};

type HmacSha256 = Hmac<Sha256>;

/// 签名权限：只读
pub const PERMISSION: &str = "r";
/// 资源类型：blob
pub const RESOURCE_TYPE: &str = "b";
/// 签名URL有效期（秒）
pub const EXPIRE_SECS: i64 = 3600;

const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Expiry timestamp `secs` after `now`, ISO-8601 UTC / 过期时间
pub fn expiry_after(now: DateTime<Utc>, secs: i64) -> String {
    (now + Duration::seconds(secs)).format(EXPIRY_FORMAT).to_string()
}

/// SAS string-to-sign for a blob / SAS待签名字符串
///
/// Field order: permission, start, expiry, resource, identifier, version and
/// five empty trailing fields.
pub fn string_to_sign(account: &str, container: &str, key: &str, expiry: &str, api_version: &str) -> String {
    let resource = format!("/{}/{}/{}", account, container, key);
    [PERMISSION, "", expiry, &resource, "", api_version, "", "", "", "", ""].join("\n")
}

/// HMAC-SHA256 of `data`, base64 encoded / HMAC-SHA256签名
pub fn hmac_base64(key: &[u8], data: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| BlobError::Config(format!("invalid signing key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// SAS query string in `se, sr, sp, sig, sv` order / SAS查询串
pub fn signed_query(expiry: &str, signature: &str, api_version: &str) -> String {
    [
        format!("se={}", urlencoding::encode(expiry)),
        format!("sr={}", RESOURCE_TYPE),
        format!("sp={}", PERMISSION),
        format!("sig={}", urlencoding::encode(signature)),
        format!("sv={}", urlencoding::encode(api_version)),
    ]
    .join("&")
}

/// Fail fast on an unusable key / 校验密钥
pub fn check_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(BlobError::Config("secret_key decodes to an empty key".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_string_to_sign_layout() {
        let s = string_to_sign("acct", "pics", "a/b.png", "2024-01-01T00:00:00Z", "2014-02-14");
        assert_eq!(s, "r\n\n2024-01-01T00:00:00Z\n/acct/pics/a/b.png\n\n2014-02-14\n\n\n\n\n");
        assert_eq!(s.split('\n').count(), 11);
    }

    #[test]
    fn test_expiry_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(expiry_after(now, EXPIRE_SECS), "2024-01-01T01:00:00Z");
    }

    #[test]
    fn test_hmac_base64_deterministic() {
        let a = hmac_base64(b"00", "payload").unwrap();
        assert_eq!(a, hmac_base64(b"00", "payload").unwrap());
        assert_ne!(a, hmac_base64(b"01", "payload").unwrap());
        assert_ne!(a, hmac_base64(b"00", "payload2").unwrap());
        // 32 byte digest
        assert_eq!(BASE64.decode(&a).unwrap().len(), 32);
    }

    #[test]
    fn test_signed_query_order() {
        let q = signed_query("2024-01-01T00:00:00Z", "ab+c/d=", "2014-02-14");
        assert_eq!(
            q,
            "se=2024-01-01T00%3A00%3A00Z&sr=b&sp=r&sig=ab%2Bc%2Fd%3D&sv=2014-02-14"
        );
    }
}
