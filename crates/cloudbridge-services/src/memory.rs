//! In-memory host stores
//!
//! Back the `AssetStore` and `ProvenanceStore` hooks without a host application, for
//! tests and the command-line tool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use cloudbridge_core::{AssetProvenance, AssetStore, Derivative, ProvenanceStore};
use tokio::sync::Mutex;
use uuid::Uuid;

/// One asset as the host would keep it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub local_path: PathBuf,
    pub public_url: String,
    pub derivatives: Vec<Derivative>,
}

#[derive(Clone, Default)]
pub struct InMemoryAssetStore {
    assets: Arc<Mutex<HashMap<Uuid, AssetRecord>>>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset and return its id.
    pub async fn add_asset(&self, local_path: impl Into<PathBuf>, public_url: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.assets.lock().await.insert(
            id,
            AssetRecord {
                local_path: local_path.into(),
                public_url: public_url.to_string(),
                derivatives: Vec::new(),
            },
        );
        id
    }

    pub async fn add_derivative(&self, asset_id: Uuid, derivative: Derivative) {
        if let Some(record) = self.assets.lock().await.get_mut(&asset_id) {
            record.derivatives.push(derivative);
        }
    }

    pub async fn record(&self, asset_id: Uuid) -> Option<AssetRecord> {
        self.assets.lock().await.get(&asset_id).cloned()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn local_path(&self, asset_id: Uuid) -> Result<Option<PathBuf>> {
        Ok(self
            .assets
            .lock()
            .await
            .get(&asset_id)
            .map(|r| r.local_path.clone()))
    }

    async fn public_url(&self, asset_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .assets
            .lock()
            .await
            .get(&asset_id)
            .map(|r| r.public_url.clone()))
    }

    async fn set_public_url(&self, asset_id: Uuid, url: &str) -> Result<()> {
        let mut assets = self.assets.lock().await;
        let record = assets
            .get_mut(&asset_id)
            .ok_or_else(|| anyhow::anyhow!("Asset {} not found", asset_id))?;
        record.public_url = url.to_string();
        Ok(())
    }

    async fn derivatives(&self, asset_id: Uuid) -> Result<Vec<Derivative>> {
        Ok(self
            .assets
            .lock()
            .await
            .get(&asset_id)
            .map(|r| r.derivatives.clone())
            .unwrap_or_default())
    }

    async fn set_derivative_url(&self, asset_id: Uuid, label: &str, url: &str) -> Result<()> {
        let mut assets = self.assets.lock().await;
        let derivative = assets
            .get_mut(&asset_id)
            .and_then(|r| r.derivatives.iter_mut().find(|d| d.label == label))
            .ok_or_else(|| anyhow::anyhow!("Derivative {} of asset {} not found", label, asset_id))?;
        derivative.cloud_url = Some(url.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryProvenanceStore {
    records: Arc<Mutex<HashMap<Uuid, AssetProvenance>>>,
}

impl InMemoryProvenanceStore {
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
impl ProvenanceStore for InMemoryProvenanceStore {
    async fn put(&self, asset_id: Uuid, provenance: AssetProvenance) -> Result<()> {
        self.records.lock().await.insert(asset_id, provenance);
        Ok(())
    }

    async fn get(&self, asset_id: Uuid) -> Result<Option<AssetProvenance>> {
        Ok(self.records.lock().await.get(&asset_id).cloned())
    }

    async fn remove(&self, asset_id: Uuid) -> Result<()> {
        self.records.lock().await.remove(&asset_id);
        Ok(())
    }
}
