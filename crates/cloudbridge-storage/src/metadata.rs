//! Side store for identifiers an image host assigns on upload.
//!
//! Imgur hands back an id and a deletion token that are needed later to build the
//! public URL and to delete the image. They are keyed by remote path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{StorageError, StorageResult};

/// What the image host returned for one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImgurRecord {
    pub id: String,
    pub deletehash: String,
    #[serde(default)]
    pub link: String,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, remote_path: &str) -> StorageResult<Option<ImgurRecord>>;

    async fn put(&self, remote_path: &str, record: ImgurRecord) -> StorageResult<()>;

    async fn remove(&self, remote_path: &str) -> StorageResult<()>;
}

/// Process-local store, mostly for tests.
#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    records: Arc<Mutex<HashMap<String, ImgurRecord>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get(&self, remote_path: &str) -> StorageResult<Option<ImgurRecord>> {
        Ok(self.records.lock().await.get(remote_path).cloned())
    }

    async fn put(&self, remote_path: &str, record: ImgurRecord) -> StorageResult<()> {
        self.records
            .lock()
            .await
            .insert(remote_path.to_string(), record);
        Ok(())
    }

    async fn remove(&self, remote_path: &str) -> StorageResult<()> {
        self.records.lock().await.remove(remote_path);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// Every write replaces the document through a temporary file and a rename, and
/// read-modify-write cycles are serialized by the mutex.
#[derive(Clone)]
pub struct JsonFileMetadataStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileMetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StorageResult<HashMap<String, ImgurRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Metadata(format!("{} is corrupt: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StorageError::Metadata(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, records: &HashMap<String, ImgurRecord>) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| StorageError::Metadata(format!("Failed to encode metadata: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StorageError::Metadata(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            StorageError::Metadata(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StorageError::Metadata(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl MetadataStore for JsonFileMetadataStore {
    async fn get(&self, remote_path: &str) -> StorageResult<Option<ImgurRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(remote_path))
    }

    async fn put(&self, remote_path: &str, record: ImgurRecord) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.insert(remote_path.to_string(), record);
        self.save(&records).await
    }

    async fn remove(&self, remote_path: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.remove(remote_path).is_some() {
            self.save(&records).await?;
        }
        Ok(())
    }
}
