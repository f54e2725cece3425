//! Storage adapter abstraction
//!
//! This module defines the `StorageAdapter` trait every remote backend implements,
//! and the error taxonomy adapters report internally.

use crate::BackendKind;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage operation errors
///
/// Adapters return these so the cause can be logged; callers above the adapter
/// boundary only see success or failure (see [`StorageAdapterExt`]).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0} is not configured (missing: {1})")]
    ConfigInvalid(BackendKind, String),

    #[error("Local file unreadable: {path}: {source}")]
    LocalFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote rejected request with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    ProtocolMismatch(String),

    #[error("Invalid remote path: {0}")]
    InvalidKey(String),

    #[error("Metadata store error: {0}")]
    Metadata(String),
}

impl StorageError {
    /// Short machine-readable cause, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::ConfigInvalid(..) => "config_invalid",
            StorageError::LocalFileUnreadable { .. } => "local_file_unreadable",
            StorageError::Transport(_) => "transport",
            StorageError::RemoteRejected { .. } => "remote_rejected",
            StorageError::ProtocolMismatch(_) => "protocol_mismatch",
            StorageError::InvalidKey(_) => "invalid_key",
            StorageError::Metadata(_) => "metadata",
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Transport(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage adapter trait
///
/// One implementation per remote backend. Adapters are built from a single
/// `BackendConfig` and hold no state beyond it, except the image host which also
/// keeps a handle on a `MetadataStore`.
///
/// **Remote paths** are backend-relative keys such as `img/2024/01/a.png`; the same
/// path is used for an asset regardless of which backend stores it.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Backend this adapter talks to
    fn kind(&self) -> BackendKind;

    /// True iff every required configuration field is non-empty
    fn validate_config(&self) -> bool;

    /// Upload a local file under `remote_path` and return its public URL
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> StorageResult<String>;

    /// Delete the object stored under `remote_path`
    async fn delete_file(&self, remote_path: &str) -> StorageResult<()>;

    /// Public URL for `remote_path`
    ///
    /// Derived from configuration only, except for the image host which has to
    /// look up the identifier it was assigned; an unknown path yields an empty
    /// string there.
    async fn get_file_url(&self, remote_path: &str) -> String;

    /// Minimal authenticated read against the backend
    async fn test_connection(&self) -> StorageResult<()>;
}

/// Boundary helpers that collapse adapter errors to a binary outcome
///
/// The structured error is logged here and then dropped, so orchestration code
/// cannot branch on the failure cause.
#[async_trait]
pub trait StorageAdapterExt: StorageAdapter {
    async fn try_upload(&self, local_path: &Path, remote_path: &str) -> Option<String> {
        let start = std::time::Instant::now();
        match self.upload_file(local_path, remote_path).await {
            Ok(url) => {
                tracing::info!(
                    backend = %self.kind(),
                    remote_path = %remote_path,
                    url = %url,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload successful"
                );
                Some(url)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    error_kind = e.kind(),
                    backend = %self.kind(),
                    remote_path = %remote_path,
                    local_path = %local_path.display(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload failed"
                );
                None
            }
        }
    }

    async fn try_delete(&self, remote_path: &str) -> bool {
        let start = std::time::Instant::now();
        match self.delete_file(remote_path).await {
            Ok(()) => {
                tracing::info!(
                    backend = %self.kind(),
                    remote_path = %remote_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Delete successful"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    error_kind = e.kind(),
                    backend = %self.kind(),
                    remote_path = %remote_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Delete failed"
                );
                false
            }
        }
    }

    async fn check_connection(&self) -> bool {
        match self.test_connection().await {
            Ok(()) => {
                tracing::info!(backend = %self.kind(), "Connection test passed");
                true
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    error_kind = e.kind(),
                    backend = %self.kind(),
                    "Connection test failed"
                );
                false
            }
        }
    }
}

impl<T: StorageAdapter + ?Sized> StorageAdapterExt for T {}
