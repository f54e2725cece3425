use std::path::Path;

use async_trait::async_trait;
use cloudbridge_core::{BackendConfig, BackendKind};
use reqwest::{Client, Method};

use crate::http;
use crate::keys::{prefixed_url, validate_remote_path};
use crate::s3_compat::SigV4Target;
use crate::traits::{StorageAdapter, StorageError, StorageResult};

/// AWS S3 adapter
///
/// Virtual-hosted addressing (`<bucket>.s3.<region>.amazonaws.com`), SigV4 with the
/// configured region.
#[derive(Clone)]
pub struct AwsS3Adapter {
    config: BackendConfig,
    client: Client,
    target: SigV4Target,
}

impl AwsS3Adapter {
    pub fn new(config: BackendConfig, client: Client) -> Self {
        let host = format!(
            "{}.s3.{}.amazonaws.com",
            config.field("bucket"),
            config.field("region")
        );
        let target = SigV4Target {
            host,
            region: config.field("region").to_string(),
            path_prefix: String::new(),
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

    /// Send requests to `base_url` instead of `https://<host>`, keeping the signed host.
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
            None => format!("https://{}/{}", self.target.host, remote_path),
        }
    }

    fn ensure_configured(&self) -> StorageResult<()> {
        if self.validate_config() {
            Ok(())
        } else {
            Err(StorageError::ConfigInvalid(
                BackendKind::AwsS3,
                self.config.missing_fields(BackendKind::AwsS3).join(", "),
            ))
        }
    }
}

#[async_trait]
impl StorageAdapter for AwsS3Adapter {
    fn kind(&self) -> BackendKind {
        BackendKind::AwsS3
    }

    fn validate_config(&self) -> bool {
        self.config.validate_for(BackendKind::AwsS3)
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> StorageResult<String> {
        self.ensure_configured()?;
        validate_remote_path(remote_path)?;

        let body = http::read_local(local_path).await?;
        let content_type = http::content_type_for(local_path);
        let size = body.len();

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

        tracing::debug!(
            bucket = %self.config.field("bucket"),
            remote_path = %remote_path,
            size = size,
            content_type = %content_type,
            "S3 upload successful"
        );

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

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackendConfig {
        BackendConfig::new(BackendKind::AwsS3)
            .with("access_key", "AKID")
            .with("access_secret", "secret")
            .with("bucket", "b")
            .with("region", "r")
    }

    #[tokio::test]
    async fn default_url_uses_region_host() {
        let adapter = AwsS3Adapter::new(config(), Client::new());
        assert_eq!(adapter.host(), "b.s3.r.amazonaws.com");
        assert_eq!(
            adapter.get_file_url("img/2024/01/a.png").await,
            "https://b.s3.r.amazonaws.com/img/2024/01/a.png"
        );
    }

    #[tokio::test]
    async fn url_prefix_overrides_host() {
        let adapter = AwsS3Adapter::new(
            config().with("url_prefix", "https://cdn.example.com/"),
            Client::new(),
        );
        assert_eq!(
            adapter.get_file_url("img/a.png").await,
            "https://cdn.example.com/img/a.png"
        );
    }

    #[tokio::test]
    async fn unconfigured_adapter_refuses_to_upload() {
        let mut broken = config();
        broken.remove("region");
        let adapter = AwsS3Adapter::new(broken, Client::new());
        assert!(!adapter.validate_config());

        let err = adapter
            .upload_file(Path::new("/nonexistent.png"), "a.png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ConfigInvalid(BackendKind::AwsS3, ref m) if m == "region"));
    }
}
