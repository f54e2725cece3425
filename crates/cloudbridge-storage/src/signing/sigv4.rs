//! Date-scoped HMAC-SHA256 signing (AWS Signature Version 4, header form).
//!
//! Used by S3 with a region-derived host and by R2 with an account-scoped host.
//! Only the three headers `host`, `x-amz-content-sha256` and `x-amz-date` are
//! signed and the query string is always empty.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{sha256_hex, Credentials};

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";
pub const TERMINATOR: &str = "aws4_request";
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Region and service the signing key is scoped to.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub region: &'a str,
    pub service: &'a str,
}

/// Inputs of one SigV4 request signature.
#[derive(Debug, Clone, Copy)]
pub struct SigV4Request<'a> {
    pub method: &'a str,
    /// Encoded absolute path, e.g. `/img/2024/01/a.png` or `/`.
    pub canonical_uri: &'a str,
    pub host: &'a str,
    /// Hex SHA-256 of the body; `EMPTY_PAYLOAD_SHA256` for DELETE and GET.
    pub payload_sha256: &'a str,
    /// `YYYYMMDDTHHMMSSZ`
    pub amz_date: &'a str,
}

impl SigV4Request<'_> {
    /// `YYYYMMDD` part of the timestamp.
    pub fn short_date(&self) -> &str {
        self.amz_date.get(..8).unwrap_or(self.amz_date)
    }
}

/// Output of [`sign`]: the header values the request has to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub signature: String,
    pub amz_date: String,
    pub content_sha256: String,
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key size");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// `AWS4<secret>` → date → region → service → `aws4_request`.
pub fn signing_key(secret: &str, short_date: &str, scope: Scope<'_>) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), short_date);
    let k_region = hmac_sha256(&k_date, scope.region);
    let k_service = hmac_sha256(&k_region, scope.service);
    hmac_sha256(&k_service, TERMINATOR)
}

pub fn credential_scope(short_date: &str, scope: Scope<'_>) -> String {
    format!(
        "{}/{}/{}/{}",
        short_date, scope.region, scope.service, TERMINATOR
    )
}

pub fn canonical_request(req: &SigV4Request<'_>) -> String {
    format!(
        "{method}\n{uri}\n\nhost:{host}\nx-amz-content-sha256:{hash}\nx-amz-date:{date}\n\n{signed}\n{hash}",
        method = req.method,
        uri = req.canonical_uri,
        host = req.host,
        hash = req.payload_sha256,
        date = req.amz_date,
        signed = SIGNED_HEADERS,
    )
}

pub fn string_to_sign(req: &SigV4Request<'_>, scope: Scope<'_>) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        req.amz_date,
        credential_scope(req.short_date(), scope),
        sha256_hex(canonical_request(req).as_bytes())
    )
}

pub fn sign(req: &SigV4Request<'_>, creds: Credentials<'_>, scope: Scope<'_>) -> SignedHeaders {
    let key = signing_key(creds.secret_key, req.short_date(), scope);
    let signature = hex::encode(hmac_sha256(&key, &string_to_sign(req, scope)));
    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        creds.access_key,
        credential_scope(req.short_date(), scope),
        SIGNED_HEADERS,
        signature
    );

    SignedHeaders {
        authorization,
        signature,
        amz_date: req.amz_date.to_string(),
        content_sha256: req.payload_sha256.to_string(),
    }
}

/// `x-amz-date` header value.
pub fn amz_date(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}
