use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use cloudbridge_core::{BackendConfig, BackendKind};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::json;

use crate::http;
use crate::keys::{prefixed_url, validate_remote_path};
use crate::signing::encode_key;
use crate::traits::{StorageAdapter, StorageError, StorageResult};

const GITHUB_API: &str = "https://api.github.com";
const JSDELIVR_CDN: &str = "https://cdn.jsdelivr.net/gh";
const ACCEPT_V3: &str = "application/vnd.github.v3+json";

/// GitHub repository adapter, served through the jsDelivr CDN
///
/// Files are committed through the contents API under `<path>/<remote_path>` on the
/// configured branch. Deleting needs the blob sha, so it costs a lookup first.
#[derive(Clone)]
pub struct GithubAdapter {
    config: BackendConfig,
    client: Client,
    api_base: String,
}

impl GithubAdapter {
    pub fn new(config: BackendConfig, client: Client) -> Self {
        Self {
            config,
            client,
            api_base: GITHUB_API.to_string(),
        }
    }

    /// Point the adapter at another API root (GitHub Enterprise, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn repo(&self) -> &str {
        self.config.field("repo")
    }

    fn branch(&self) -> &str {
        self.config.field("branch")
    }

    /// Path of the file inside the repository.
    fn repo_path(&self, remote_path: &str) -> String {
        let dir = self.config.field("path").trim_matches('/');
        if dir.is_empty() {
            remote_path.to_string()
        } else {
            format!("{}/{}", dir, remote_path)
        }
    }

    fn contents_url(&self, remote_path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repo(),
            encode_key(&self.repo_path(remote_path))
        )
    }

    fn public_url(&self, remote_path: &str) -> String {
        match self.config.url_prefix() {
            Some(prefix) => prefixed_url(prefix, remote_path),
            None => format!(
                "{}/{}@{}/{}",
                JSDELIVR_CDN,
                self.repo(),
                self.branch(),
                self.repo_path(remote_path)
            ),
        }
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("token {}", self.config.field("token")))
            .header(ACCEPT, ACCEPT_V3)
            .header(USER_AGENT, http::USER_AGENT)
    }

    /// Blob sha of the file currently committed under `remote_path`.
    async fn file_sha(&self, remote_path: &str) -> StorageResult<String> {
        let response = self
            .request(Method::GET, self.contents_url(remote_path))
            .query(&[("ref", self.branch())])
            .send()
            .await?;
        let response = http::expect_status(response, &[200]).await?;
        let body = http::json_body(response).await?;

        body.get("sha")
            .and_then(|sha| sha.as_str())
            .map(str::to_string)
            .ok_or_else(|| StorageError::ProtocolMismatch("File lookup returned no sha".to_string()))
    }

    fn ensure_configured(&self) -> StorageResult<()> {
        if self.validate_config() {
            return Ok(());
        }
        Err(StorageError::ConfigInvalid(
            BackendKind::GithubJsdelivr,
            self.config
                .missing_fields(BackendKind::GithubJsdelivr)
                .join(", "),
        ))
    }
}

#[async_trait]
impl StorageAdapter for GithubAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::GithubJsdelivr
    }

    fn validate_config(&self) -> bool {
        self.config.validate_for(BackendKind::GithubJsdelivr)
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> StorageResult<String> {
        self.ensure_configured()?;
        validate_remote_path(remote_path)?;

        let bytes = http::read_local(local_path).await?;
        let payload = json!({
            "message": format!("Upload {}", remote_path),
            "content": base64::engine::general_purpose::STANDARD.encode(&bytes),
            "branch": self.branch(),
        });

        let response = self
            .request(Method::PUT, self.contents_url(remote_path))
            .json(&payload)
            .send()
            .await?;
        let response = http::expect_status(response, &[200, 201]).await?;
        let body = http::json_body(response).await?;

        if body.pointer("/content/sha").and_then(|s| s.as_str()).is_none() {
            return Err(StorageError::ProtocolMismatch(
                "Commit response has no content sha".to_string(),
            ));
        }

        Ok(self.public_url(remote_path))
    }

    async fn delete_file(&self, remote_path: &str) -> StorageResult<()> {
        self.ensure_configured()?;
        validate_remote_path(remote_path)?;

        let sha = self.file_sha(remote_path).await?;
        let payload = json!({
            "message": format!("Delete {}", remote_path),
            "sha": sha,
            "branch": self.branch(),
        });

        let response = self
            .request(Method::DELETE, self.contents_url(remote_path))
            .json(&payload)
            .send()
            .await?;
        http::expect_status(response, &[200]).await?;
        Ok(())
    }

    async fn get_file_url(&self, remote_path: &str) -> String {
        self.public_url(remote_path)
    }

    async fn test_connection(&self) -> StorageResult<()> {
        self.ensure_configured()?;
        let url = format!("{}/repos/{}", self.api_base, self.repo());
        let response = self.request(Method::GET, url).send().await?;
        http::expect_status(response, &[200]).await?;
        Ok(())
    }
}
