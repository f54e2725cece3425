use std::path::Path;

use async_trait::async_trait;
use cloudbridge_core::{BackendConfig, BackendKind};
use reqwest::{Client, Method};

use crate::http;
use crate::keys::{prefixed_url, validate_remote_path};
use crate::s3_compat::SigV4Target;
use crate::traits::{StorageAdapter, StorageError, StorageResult};

/// Region R2 expects in the credential scope.
const R2_REGION: &str = "auto";

/// Cloudflare R2 adapter
///
/// S3-compatible API on an account-scoped host, path-style addressing
/// (`/<bucket>/<key>`) and the fixed region `auto`.
#[derive(Clone)]
pub struct CloudflareR2Adapter {
    config: BackendConfig,
    client: Client,
    target: SigV4Target,
}

impl CloudflareR2Adapter {
    pub fn new(config: BackendConfig, client: Client) -> Self {
        let target = SigV4Target {
            host: format!("{}.r2.cloudflarestorage.com", config.field("account_id")),
            region: R2_REGION.to_string(),
            path_prefix: format!("/{}", config.field("bucket")),
            access_key: config.field("access_key").to_string(),
            secret_key: config.field("access_secret").to_string(),
            base_url: None,
        };
        Self {
            config,
            client,
            target,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.target.base_url = Some(base_url.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.target.host
    }

    fn public_url(&self, remote_path: &str) -> String {
        match self.config.url_prefix() {
            Some(prefix) => prefixed_url(prefix, remote_path),
            None => format!(
                "https://{}/{}/{}",
                self.target.host,
                self.config.field("bucket"),
                remote_path
            ),
        }
    }

    fn ensure_configured(&self) -> StorageResult<()> {
        if self.validate_config() {
            return Ok(());
        }
        Err(StorageError::ConfigInvalid(
            BackendKind::CloudflareR2,
            self.config
                .missing_fields(BackendKind::CloudflareR2)
                .join(", "),
        ))
    }
}

#[async_trait]
impl StorageAdapter for CloudflareR2Adapter {
    fn kind(&self) -> BackendKind {
        BackendKind::CloudflareR2
    }

    fn validate_config(&self) -> bool {
        self.config.validate_for(BackendKind::CloudflareR2)
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> StorageResult<String> {
        self.ensure_configured()?;
        validate_remote_path(remote_path)?;

        let body = http::read_local(local_path).await?;
        let content_type = http::content_type_for(local_path);

        let response = self
            .target
            .send(
                &self.client,
                Method::PUT,
                remote_path,
                Some(body),
                Some(content_type.as_str()),
            )
            .await?;
        http::expect_status(response, &[200]).await?;

        Ok(self.public_url(remote_path))
    }

    async fn delete_file(&self, remote_path: &str) -> StorageResult<()> {
        self.ensure_configured()?;
        validate_remote_path(remote_path)?;

        let response = self
            .target
            .send(&self.client, Method::DELETE, remote_path, None, None)
            .await?;
        http::expect_status(response, &[200, 204]).await?;
        Ok(())
    }

    async fn get_file_url(&self, remote_path: &str) -> String {
        self.public_url(remote_path)
    }

    async fn test_connection(&self) -> StorageResult<()> {
        self.ensure_configured()?;
        let response = self
            .target
            .send(&self.client, Method::GET, "", None, None)
            .await?;
        http::expect_status(response, &[200]).await?;
        Ok(())
    }
}
