//! Content type detection / 内容类型检测
//!
//! Looks at the first 512 bytes, the same window browsers and most HTTP
//! stacks sniff.

use mime_guess::mime;

const SNIFF_LEN: usize = 512;
const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Exact magic prefixes / 魔数前缀
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"Rar!\x1a\x07", "application/x-rar-compressed"),
    (b"\x1a\x45\xdf\xa3", "video/webm"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"\x00asm", "application/wasm"),
    (b"<?xml", "text/xml; charset=utf-8"),
];

/// Detect the MIME type of `data` from its leading bytes / 根据内容嗅探类型
///
/// Falls back to `text/plain; charset=utf-8` for data without control bytes
/// and `application/octet-stream` otherwise.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(SNIFF_LEN)];

    if let Some(&(_, mime)) = SIGNATURES.iter().find(|(magic, _)| head.starts_with(magic)) {
        return mime;
    }

    // RIFF containers carry the real type at offset 8
    if head.len() >= 12 && &head[..4] == b"RIFF" {
        match &head[8..12] {
            b"WEBP" => return "image/webp",
            b"WAVE" => return "audio/wave",
            b"AVI " => return "video/avi",
            _ => {}
        }
    }

    // ISO base media: ....ftyp<brand>
    if head.len() >= 12 && &head[4..8] == b"ftyp" {
        return match &head[8..12] {
            b"avif" | b"avis" => "image/avif",
            b"heic" | b"heix" => "image/heic",
            _ => "video/mp4",
        };
    }

    let trimmed = trim_leading_whitespace(head);
    if starts_with_ignore_case(trimmed, b"<svg") {
        return "image/svg+xml";
    }
    if starts_with_ignore_case(trimmed, b"<!doctype html") || starts_with_ignore_case(trimmed, b"<html") {
        return "text/html; charset=utf-8";
    }

    if head.is_empty() || head.iter().any(|b| is_binary_byte(*b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

/// Pick the content type for an upload / 确定上传的内容类型
///
/// An explicit type wins; otherwise the data is sniffed and, if that only
/// yields `application/octet-stream`, the key's extension is consulted.
pub fn resolve_content_type(explicit: Option<&str>, key: &str, data: &[u8]) -> String {
    if let Some(ct) = explicit.map(str::trim).filter(|ct| !ct.is_empty()) {
        return ct.to_string();
    }

    let sniffed = sniff_content_type(data);
    if sniffed != OCTET_STREAM {
        return sniffed.to_string();
    }

    mime_guess::from_path(key)
        .first()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
        .to_string()
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix)
}
