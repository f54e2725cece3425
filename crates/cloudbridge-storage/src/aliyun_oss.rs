use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use cloudbridge_core::{BackendConfig, BackendKind};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, DATE, HOST};
use reqwest::{Client, Method, RequestBuilder};

use crate::http;
use crate::keys::{prefixed_url, validate_remote_path};
use crate::signing::oss::{self, OssRequest};
use crate::signing::{encode_key, Credentials};
use crate::traits::{StorageAdapter, StorageError, StorageResult};

/// Aliyun OSS adapter
///
/// Objects live on the bucket domain `<bucket>.<endpoint>` and every request is
/// signed with the OSS HMAC-SHA1 header scheme.
#[derive(Clone)]
pub struct AliyunOssAdapter {
    config: BackendConfig,
    client: Client,
    base_url: Option<String>,
}

impl AliyunOssAdapter {
    pub fn new(config: BackendConfig, client: Client) -> Self {
        Self {
            config,
            client,
            base_url: None,
        }
    }

    /// Send requests to `base_url` instead of `https://<bucket>.<endpoint>`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Bucket domain, e.g. `photos.oss-cn-hangzhou.aliyuncs.com`.
    pub fn host(&self) -> String {
        let endpoint = self.config.field("endpoint");
        let endpoint = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .unwrap_or(endpoint)
            .trim_end_matches('/');
        format!("{}.{}", self.config.field("bucket"), endpoint)
    }

    fn request_url(&self, encoded_key: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), encoded_key),
            None => format!("https://{}/{}", self.host(), encoded_key),
        }
    }

    fn public_url(&self, remote_path: &str) -> String {
        match self.config.url_prefix() {
            Some(prefix) => prefixed_url(prefix, remote_path),
            None => format!("https://{}/{}", self.host(), remote_path),
        }
    }

    fn credentials(&self) -> Credentials<'_> {
        Credentials {
            access_key: self.config.field("access_key"),
            secret_key: self.config.field("access_secret"),
        }
    }

    /// Build a signed request. `key` is the raw object key; it is signed as-is and
    /// percent-encoded only in the request URL.
    fn signed_request(
        &self,
        method: Method,
        key: &str,
        content_md5: &str,
        content_type: &str,
    ) -> RequestBuilder {
        let date = oss::http_date(Utc::now());
        let authorization = oss::authorization(
            self.credentials(),
            &OssRequest {
                method: method.as_str(),
                content_md5,
                content_type,
                date: &date,
                bucket: self.config.field("bucket"),
                key,
            },
        );

        let mut request = self
            .client
            .request(method, self.request_url(&encode_key(key)))
            .header(HOST, self.host())
            .header(DATE, date)
            .header(AUTHORIZATION, authorization);
        if !content_type.is_empty() {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if !content_md5.is_empty() {
            request = request.header("Content-MD5", content_md5);
        }
        request
    }

    fn ensure_configured(&self) -> StorageResult<()> {
        if self.validate_config() {
            return Ok(());
        }
        Err(StorageError::ConfigInvalid(
            BackendKind::AliyunOss,
            self.config.missing_fields(BackendKind::AliyunOss).join(", "),
        ))
    }
}

#[async_trait]
impl StorageAdapter for AliyunOssAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::AliyunOss
    }

    fn validate_config(&self) -> bool {
        self.config.validate_for(BackendKind::AliyunOss)
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> StorageResult<String> {
        self.ensure_configured()?;
        validate_remote_path(remote_path)?;

        let body = http::read_local(local_path).await?;
        let content_type = http::content_type_for(local_path);
        let content_md5 = oss::content_md5(&body);

        let response = self
            .signed_request(Method::PUT, remote_path, &content_md5, &content_type)
            .body(body)
            .send()
            .await?;
        http::expect_status(response, &[200]).await?;

        tracing::debug!(host = %self.host(), remote_path = %remote_path, "OSS upload successful");
        Ok(self.public_url(remote_path))
    }

    async fn delete_file(&self, remote_path: &str) -> StorageResult<()> {
        self.ensure_configured()?;
        validate_remote_path(remote_path)?;

        let response = self
            .signed_request(Method::DELETE, remote_path, "", "")
            .send()
            .await?;
        http::expect_status(response, &[200, 204]).await?;
        Ok(())
    }

    async fn get_file_url(&self, remote_path: &str) -> String {
        self.public_url(remote_path)
    }

    async fn test_connection(&self) -> StorageResult<()> {
        self.ensure_configured()?;
        let response = self.signed_request(Method::GET, "", "", "").send().await?;
        http::expect_status(response, &[200]).await?;
        Ok(())
    }
}
