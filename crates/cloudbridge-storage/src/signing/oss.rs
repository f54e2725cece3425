//! Bucket-domain HMAC-SHA1 signing (Aliyun OSS header authentication).
//!
//! string-to-sign = `METHOD\nContent-MD5\nContent-Type\nDate\n/bucket/key`,
//! signature = base64(HMAC-SHA1(secret, string-to-sign)),
//! header = `OSS <access_key>:<signature>`.

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::Credentials;

pub const AUTH_SCHEME: &str = "OSS";

/// Inputs of one OSS request signature.
#[derive(Debug, Clone, Copy)]
pub struct OssRequest<'a> {
    pub method: &'a str,
    /// base64 MD5 of the body, empty for body-less requests
    pub content_md5: &'a str,
    /// empty for body-less requests
    pub content_type: &'a str,
    /// RFC 1123 GMT date, also sent as the `Date` header
    pub date: &'a str,
    pub bucket: &'a str,
    /// Encoded object key without leading slash; empty addresses the bucket root.
    pub key: &'a str,
}

pub fn string_to_sign(req: &OssRequest<'_>) -> String {
    format!(
        "{}\n{}\n{}\n{}\n/{}/{}",
        req.method, req.content_md5, req.content_type, req.date, req.bucket, req.key
    )
}

pub fn signature(secret: &str, string_to_sign: &str) -> String {
    let mut mac =
        Hmac::<Sha1>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(string_to_sign.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Value of the `Authorization` header.
pub fn authorization(creds: Credentials<'_>, req: &OssRequest<'_>) -> String {
    let sig = signature(creds.secret_key, &string_to_sign(req));
    format!("{} {}:{}", AUTH_SCHEME, creds.access_key, sig)
}

/// base64 of the raw MD5 digest, as sent in `Content-MD5`.
pub fn content_md5(body: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(md5::compute(body).0)
}

/// `Date` header value, e.g. `Mon, 15 Jan 2024 12:30:00 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
