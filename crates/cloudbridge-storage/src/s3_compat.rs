//! SigV4 request plumbing shared by the S3-compatible adapters.

use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::{Client, Method, Response};

use crate::signing::sigv4::{self, Scope, SigV4Request, EMPTY_PAYLOAD_SHA256};
use crate::signing::{encode_key, sha256_hex, Credentials};
use crate::StorageResult;

const SERVICE: &str = "s3";

/// Where and how an S3-compatible bucket is addressed.
#[derive(Debug, Clone)]
pub(crate) struct SigV4Target {
    /// Signed `Host` header value.
    pub host: String,
    pub region: String,
    /// Prepended to every object path: empty for virtual-hosted buckets,
    /// `/<bucket>` for path-style addressing.
    pub path_prefix: String,
    pub access_key: String,
    pub secret_key: String,
    /// Replaces `https://<host>` in the request URL; the signed host is unchanged.
    pub base_url: Option<String>,
}

impl SigV4Target {
    /// Canonical URI for an encoded key; an empty key addresses the bucket itself.
    pub fn canonical_uri(&self, encoded_key: &str) -> String {
        if encoded_key.is_empty() {
            if self.path_prefix.is_empty() {
                "/".to_string()
            } else {
                self.path_prefix.clone()
            }
        } else {
            format!("{}/{}", self.path_prefix, encoded_key)
        }
    }

    fn request_url(&self, canonical_uri: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), canonical_uri),
            None => format!("https://{}{}", self.host, canonical_uri),
        }
    }

    /// Sign and send one request. `body` is `None` for DELETE and GET.
    pub async fn send(
        &self,
        client: &Client,
        method: Method,
        key: &str,
        body: Option<Vec<u8>>,
        content_type: Option<&str>,
    ) -> StorageResult<Response> {
        let payload_sha256 = match &body {
            Some(bytes) => sha256_hex(bytes),
            None => EMPTY_PAYLOAD_SHA256.to_string(),
        };
        let amz_date = sigv4::amz_date(Utc::now());
        let canonical_uri = self.canonical_uri(&encode_key(key));

        let signed = sigv4::sign(
            &SigV4Request {
                method: method.as_str(),
                canonical_uri: &canonical_uri,
                host: &self.host,
                payload_sha256: &payload_sha256,
                amz_date: &amz_date,
            },
            Credentials {
                access_key: &self.access_key,
                secret_key: &self.secret_key,
            },
            Scope {
                region: &self.region,
                service: SERVICE,
            },
        );

        tracing::debug!(
            method = %method,
            host = %self.host,
            uri = %canonical_uri,
            "Sending signed request"
        );

        let mut request = client
            .request(method, self.request_url(&canonical_uri))
            .header(HOST, &self.host)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.content_sha256)
            .header(AUTHORIZATION, &signed.authorization);
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(bytes) = body {
            request = request.body(bytes);
        }

        Ok(request.send().await?)
    }
}
