//! Key and URL helper functions / 对象键与URL工具函数

use chrono::{DateTime, Utc};

/// Join a root prefix and an object key with a single `/` / 拼接根路径和对象键
pub fn join_key(root: &str, key: &str) -> String {
    let root = root.trim_matches('/');
    let key = key.trim_start_matches('/');

    if root.is_empty() {
        key.to_string()
    } else if key.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, key)
    }
}

/// Strip a root prefix from an object key (inverse of [`join_key`]) / 去除根路径前缀
pub fn strip_root<'a>(root: &str, key: &'a str) -> &'a str {
    let root = root.trim_matches('/');
    if root.is_empty() {
        return key;
    }
    key.strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(key)
}

/// Extract the object key from a full URL / 从完整URL中提取对象键
///
/// The URL path has the leading `/{prefix}/` removed and is percent-decoded.
/// The path is taken as written, without dot-segment or backslash
/// normalization, so every key maps back to itself. Anything that is not an
/// absolute URL comes back unchanged.
pub fn key_from_url(full_url: &str, prefix: &str) -> String {
    if url::Url::parse(full_url).is_err() {
        return full_url.to_string();
    }

    let path = raw_path(full_url);
    let prefix = prefix.trim_matches('/');
    let rest = if prefix.is_empty() {
        path.trim_start_matches('/')
    } else {
        let with_slashes = format!("/{}/", prefix);
        path.strip_prefix(with_slashes.as_str()).unwrap_or(path)
    };

    urlencoding::decode(rest)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| rest.to_string())
}

/// Path text between the authority and the query or fragment
fn raw_path(full_url: &str) -> &str {
    let after_scheme = full_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(full_url);
    let after_authority = match after_scheme.find(['/', '?', '#']) {
        Some(i) => &after_scheme[i..],
        None => "",
    };
    let end = after_authority.find(['?', '#']).unwrap_or(after_authority.len());
    &after_authority[..end]
}

/// Current UTC time in nanoseconds, for unique names / 当前纳秒时间戳
pub fn unix_nano() -> String {
    nanos_of(Utc::now())
}

fn nanos_of(at: DateTime<Utc>) -> String {
    match at.timestamp_nanos_opt() {
        Some(n) => n.to_string(),
        // beyond year 2262
        None => format!("{}{:09}", at.timestamp(), at.timestamp_subsec_nanos()),
    }
}

/// Date partition prefix `YYYY/MM/DD` / 按日期分区的路径前缀
///
/// Always computed in UTC, not the host's local time zone, so hosts in
/// different zones agree on the partition.
pub fn timebase_path() -> String {
    timebase_path_at(Utc::now())
}

pub fn timebase_path_at(at: DateTime<Utc>) -> String {
    at.format("%Y/%m/%d").to_string()
}
