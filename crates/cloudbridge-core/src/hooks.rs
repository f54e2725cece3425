//! Hooks and traits for host integration
//!
//! The bridge never owns the host's settings, asset records or attachment
//! metadata. It reaches them through these traits; the host implements them.

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::models::{AssetProvenance, Derivative};
use crate::storage_types::BackendKind;

/// Source of backend configuration.
pub trait ConfigProvider: Send + Sync {
    /// Fields configured for `kind` (empty when nothing is configured).
    fn backend_config(&self, kind: BackendKind) -> BackendConfig;

    /// Backends the operator switched on. Always contains `Local`.
    fn enabled_backends(&self) -> BTreeSet<BackendKind>;

    /// Backend used when an upload does not request one.
    fn default_backend(&self) -> BackendKind;
}

/// Host asset records
///
/// Read and write access to the host's attachment store. Derivatives are the
/// generated variants (thumbnails and the like) the host keeps next to the asset.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Absolute path of the asset's primary file.
    async fn local_path(&self, asset_id: Uuid) -> anyhow::Result<Option<PathBuf>>;

    async fn public_url(&self, asset_id: Uuid) -> anyhow::Result<Option<String>>;

    async fn set_public_url(&self, asset_id: Uuid, url: &str) -> anyhow::Result<()>;

    async fn derivatives(&self, asset_id: Uuid) -> anyhow::Result<Vec<Derivative>>;

    /// Attach a cloud URL to one derivative of the asset.
    async fn set_derivative_url(&self, asset_id: Uuid, label: &str, url: &str)
        -> anyhow::Result<()>;
}

/// Per-asset provenance records
#[async_trait]
pub trait ProvenanceStore: Send + Sync {
    async fn put(&self, asset_id: Uuid, provenance: AssetProvenance) -> anyhow::Result<()>;

    async fn get(&self, asset_id: Uuid) -> anyhow::Result<Option<AssetProvenance>>;

    async fn remove(&self, asset_id: Uuid) -> anyhow::Result<()>;
}
