use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use cloudbridge_core::{BackendConfig, BackendKind};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;

use crate::http;
use crate::keys::{basename, prefixed_url, validate_remote_path};
use crate::metadata::{ImgurRecord, MetadataStore};
use crate::traits::{StorageAdapter, StorageError, StorageResult};

const IMGUR_API: &str = "https://api.imgur.com";
const IMGUR_CDN: &str = "https://i.imgur.com";
const UPLOAD_TITLE: &str = "Uploaded via cloudbridge";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    id: Option<String>,
    deletehash: Option<String>,
    link: Option<String>,
}

/// Imgur adapter
///
/// Imgur picks its own identifiers, so the `id`/`deletehash` pair returned on upload
/// is kept in a [`MetadataStore`] keyed by remote path. Without that record the
/// image can be neither addressed nor deleted.
#[derive(Clone)]
pub struct ImgurAdapter {
    config: BackendConfig,
    client: Client,
    metadata: Arc<dyn MetadataStore>,
    api_base: String,
}

impl ImgurAdapter {
    pub fn new(config: BackendConfig, client: Client, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            config,
            client,
            metadata,
            api_base: IMGUR_API.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `Bearer <access_token>` when an account token is configured, else `Client-ID <id>`.
    fn authorization(&self) -> String {
        match self.config.get("access_token") {
            Some(token) => format!("Bearer {}", token),
            None => format!("Client-ID {}", self.config.field("client_id")),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .header(AUTHORIZATION, self.authorization())
    }

    /// Rewrite a CDN link onto the configured prefix, keeping only the file name.
    fn apply_prefix(&self, link: &str) -> String {
        match self.config.url_prefix() {
            Some(prefix) => prefixed_url(prefix, basename(link)),
            None => link.to_string(),
        }
    }

    fn ensure_configured(&self) -> StorageResult<()> {
        if self.validate_config() {
            return Ok(());
        }
        Err(StorageError::ConfigInvalid(
            BackendKind::Imgur,
            self.config.missing_fields(BackendKind::Imgur).join(", "),
        ))
    }
}

fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl StorageAdapter for ImgurAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Imgur
    }

    fn validate_config(&self) -> bool {
        self.config.validate_for(BackendKind::Imgur)
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> StorageResult<String> {
        self.ensure_configured()?;
        validate_remote_path(remote_path)?;

        let bytes = http::read_local(local_path).await?;
        let image = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let body = form_body(&[
            ("image", image.as_str()),
            ("type", "base64"),
            ("name", name.as_str()),
            ("title", UPLOAD_TITLE),
            ("description", remote_path),
        ]);

        let response = self
            .request(Method::POST, "/3/image")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let response = http::expect_status(response, &[200]).await?;
        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::ProtocolMismatch(format!("Unexpected upload response: {}", e)))?;

        let (id, deletehash, link) = match parsed.data {
            UploadData {
                id: Some(id),
                deletehash: Some(deletehash),
                link: Some(link),
            } if !id.is_empty() && !deletehash.is_empty() && !link.is_empty() => {
                (id, deletehash, link)
            }
            _ => {
                return Err(StorageError::ProtocolMismatch(
                    "Upload response is missing id, deletehash or link".to_string(),
                ))
            }
        };

        self.metadata
            .put(
                remote_path,
                ImgurRecord {
                    id: id.clone(),
                    deletehash,
                    link: link.clone(),
                },
            )
            .await?;

        tracing::debug!(remote_path = %remote_path, imgur_id = %id, "Imgur upload recorded");
        Ok(self.apply_prefix(&link))
    }

    async fn delete_file(&self, remote_path: &str) -> StorageResult<()> {
        self.ensure_configured()?;

        let record = self.metadata.get(remote_path).await?.ok_or_else(|| {
            StorageError::Metadata(format!("No delete token recorded for {}", remote_path))
        })?;

        let response = self
            .request(
                Method::DELETE,
                &format!("/3/image/{}", urlencoding::encode(&record.deletehash)),
            )
            .send()
            .await?;
        http::expect_status(response, &[200]).await?;

        if let Err(e) = self.metadata.remove(remote_path).await {
            tracing::warn!(
                error = %e,
                remote_path = %remote_path,
                "Imgur image deleted but its record could not be removed"
            );
        }
        Ok(())
    }

    async fn get_file_url(&self, remote_path: &str) -> String {
        let record = match self.metadata.get(remote_path).await {
            Ok(Some(record)) => record,
            Ok(None) => return String::new(),
            Err(e) => {
                tracing::warn!(error = %e, remote_path = %remote_path, "Imgur metadata lookup failed");
                return String::new();
            }
        };

        let link = if record.link.is_empty() {
            format!("{}/{}.jpg", IMGUR_CDN, record.id)
        } else {
            record.link
        };
        self.apply_prefix(&link)
    }

    async fn test_connection(&self) -> StorageResult<()> {
        self.ensure_configured()?;
        let response = self.request(Method::GET, "/3/credits").send().await?;
        http::expect_status(response, &[200]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryMetadataStore;

    fn adapter(config: BackendConfig) -> (ImgurAdapter, InMemoryMetadataStore) {
        let store = InMemoryMetadataStore::new();
        let adapter = ImgurAdapter::new(config, Client::new(), Arc::new(store.clone()));
        (adapter, store)
    }

    fn config() -> BackendConfig {
        BackendConfig::new(BackendKind::Imgur).with("client_id", "cid")
    }

    #[test]
    fn authorization_prefers_access_token() {
        let (plain, _) = adapter(config());
        assert_eq!(plain.authorization(), "Client-ID cid");

        let (bearer, _) = adapter(config().with("access_token", "tok"));
        assert_eq!(bearer.authorization(), "Bearer tok");
    }

    #[test]
    fn form_body_is_url_encoded() {
        assert_eq!(
            form_body(&[("image", "a+b/c="), ("type", "base64")]),
            "image=a%2Bb%2Fc%3D&type=base64"
        );
    }

    #[tokio::test]
    async fn url_of_unknown_path_is_empty() {
        let (adapter, _) = adapter(config());
        assert_eq!(adapter.get_file_url("img/missing.png").await, "");
    }

    #[tokio::test]
    async fn url_falls_back_to_id_and_applies_prefix() {
        let (adapter, store) = adapter(config().with("url_prefix", "https://img.example.com/"));
        store
            .put(
                "img/a.png",
                ImgurRecord {
                    id: "abc123".to_string(),
                    deletehash: "del".to_string(),
                    link: String::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            adapter.get_file_url("img/a.png").await,
            "https://img.example.com/abc123.jpg"
        );
    }

    #[tokio::test]
    async fn delete_without_record_fails_locally() {
        let (adapter, _) = adapter(config());
        let err = adapter.delete_file("img/a.png").await.unwrap_err();
        assert!(matches!(err, StorageError::Metadata(_)));
    }
}
