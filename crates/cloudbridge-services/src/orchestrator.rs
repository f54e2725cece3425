//! Upload orchestration: reacts to host asset lifecycle events.
//!
//! Every operation here is best-effort. Remote failures are logged and the asset
//! simply stays (or is treated as) local; nothing is surfaced to the host as an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cloudbridge_core::{AssetProvenance, AssetStore, BackendKind, ProvenanceStore};
use cloudbridge_storage::keys::{remote_path_for, sibling_remote_path};
use cloudbridge_storage::{BackendRegistry, ResolvedBackend, StorageAdapter, StorageAdapterExt};
use serde::Serialize;
use uuid::Uuid;

/// Where an asset ended up after `on_asset_created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum AssetPlacement {
    /// No remote backend applies.
    Local,
    /// Uploaded; the asset's public URL now points at the remote copy.
    Remote {
        backend: BackendKind,
        remote_path: String,
        url: String,
    },
    /// A remote backend was selected but the upload did not go through.
    KeptLocal { backend: BackendKind },
}

impl AssetPlacement {
    pub fn is_remote(&self) -> bool {
        matches!(self, AssetPlacement::Remote { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            AssetPlacement::Remote { url, .. } => Some(url.as_str()),
            _ => None,
        }
    }
}

/// Outcome of a cascading remote delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub attempted: usize,
    pub succeeded: usize,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.attempted == self.succeeded
    }
}

pub struct UploadOrchestrator {
    registry: Arc<BackendRegistry>,
    assets: Arc<dyn AssetStore>,
    provenance: Arc<dyn ProvenanceStore>,
    local_root: PathBuf,
    default_backend: BackendKind,
}

impl UploadOrchestrator {
    pub fn new(
        registry: Arc<BackendRegistry>,
        assets: Arc<dyn AssetStore>,
        provenance: Arc<dyn ProvenanceStore>,
        local_root: impl Into<PathBuf>,
        default_backend: BackendKind,
    ) -> Self {
        Self {
            registry,
            assets,
            provenance,
            local_root: local_root.into(),
            default_backend,
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Upload a freshly created asset to the requested backend, or to the default
    /// one when the host did not ask for any.
    ///
    /// An asset that already has a remote provenance record is left where it is.
    pub async fn on_asset_created(&self, asset_id: Uuid, requested: Option<&str>) -> AssetPlacement {
        if let Some(placement) = self.existing_placement(asset_id).await {
            return placement;
        }

        let resolved = match requested {
            Some(id) => self.registry.resolve_id(id),
            None => self.registry.resolve(self.default_backend),
        };
        let adapter = match resolved {
            ResolvedBackend::Local => {
                tracing::debug!(asset_id = %asset_id, "Asset stays on local storage");
                return AssetPlacement::Local;
            }
            ResolvedBackend::Remote(adapter) => adapter,
        };
        let backend = adapter.kind();
        let kept_local = AssetPlacement::KeptLocal { backend };

        let local_path = match self.assets.local_path(asset_id).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                tracing::warn!(asset_id = %asset_id, backend = %backend, "Asset has no local file");
                return kept_local;
            }
            Err(e) => {
                tracing::error!(error = %e, asset_id = %asset_id, "Failed to look up asset file");
                return kept_local;
            }
        };

        let remote_path = match remote_path_for(&self.local_root, &local_path) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    asset_id = %asset_id,
                    local_path = %local_path.display(),
                    "Asset file is not under the local storage root"
                );
                return kept_local;
            }
        };

        let Some(url) = adapter.try_upload(&local_path, &remote_path).await else {
            return kept_local;
        };

        let provenance = AssetProvenance {
            backend_id: backend,
            original_local_path: local_path,
            cloud_url: url.clone(),
        };
        if let Err(e) = self.provenance.put(asset_id, provenance).await {
            tracing::error!(
                error = %e,
                asset_id = %asset_id,
                backend = %backend,
                remote_path = %remote_path,
                "Failed to record provenance, removing orphaned remote copy"
            );
            adapter.try_delete(&remote_path).await;
            return kept_local;
        }

        if let Err(e) = self.assets.set_public_url(asset_id, &url).await {
            tracing::error!(error = %e, asset_id = %asset_id, "Failed to update asset URL");
        }

        tracing::info!(
            asset_id = %asset_id,
            backend = %backend,
            remote_path = %remote_path,
            url = %url,
            "Asset placed on remote backend"
        );

        AssetPlacement::Remote {
            backend,
            remote_path,
            url,
        }
    }

    /// Upload generated derivatives next to their parent on the parent's backend.
    ///
    /// Returns the number of derivatives uploaded. Derivatives whose file does not
    /// exist are skipped.
    pub async fn on_derivatives_generated(&self, asset_id: Uuid) -> usize {
        let Some((provenance, adapter)) = self.remote_placement(asset_id).await else {
            return 0;
        };
        let Some(parent_remote) = self.parent_remote_path(asset_id, &provenance) else {
            return 0;
        };

        let derivatives = match self.assets.derivatives(asset_id).await {
            Ok(derivatives) => derivatives,
            Err(e) => {
                tracing::error!(error = %e, asset_id = %asset_id, "Failed to list derivatives");
                return 0;
            }
        };

        let local_dir = provenance
            .original_local_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut uploaded = 0;
        for derivative in derivatives {
            let local_path = local_dir.join(&derivative.file_name);
            if !tokio::fs::try_exists(&local_path).await.unwrap_or(false) {
                tracing::debug!(
                    asset_id = %asset_id,
                    label = %derivative.label,
                    local_path = %local_path.display(),
                    "Derivative file missing, skipping"
                );
                continue;
            }

            let remote_path = sibling_remote_path(&parent_remote, &derivative.file_name);
            let Some(url) = adapter.try_upload(&local_path, &remote_path).await else {
                continue;
            };

            match self
                .assets
                .set_derivative_url(asset_id, &derivative.label, &url)
                .await
            {
                Ok(()) => uploaded += 1,
                Err(e) => tracing::error!(
                    error = %e,
                    asset_id = %asset_id,
                    label = %derivative.label,
                    "Failed to attach derivative URL"
                ),
            }
        }

        uploaded
    }

    /// Delete the remote copy of an asset and of each derivative, then forget its
    /// provenance. Each delete is attempted regardless of the others.
    pub async fn on_asset_deleted(&self, asset_id: Uuid) -> DeleteReport {
        let mut report = DeleteReport::default();

        let provenance = match self.provenance.get(asset_id).await {
            Ok(Some(provenance)) if provenance.is_remote() => provenance,
            Ok(_) => return report,
            Err(e) => {
                tracing::error!(error = %e, asset_id = %asset_id, "Failed to read provenance");
                return report;
            }
        };

        match self.registry.get(provenance.backend_id) {
            Some(adapter) => {
                if let Some(parent_remote) = self.parent_remote_path(asset_id, &provenance) {
                    let mut remote_paths = vec![parent_remote.clone()];
                    match self.assets.derivatives(asset_id).await {
                        Ok(derivatives) => remote_paths.extend(
                            derivatives
                                .iter()
                                .map(|d| sibling_remote_path(&parent_remote, &d.file_name)),
                        ),
                        Err(e) => tracing::warn!(
                            error = %e,
                            asset_id = %asset_id,
                            "Failed to list derivatives, deleting primary only"
                        ),
                    }

                    for remote_path in &remote_paths {
                        report.attempted += 1;
                        if adapter.try_delete(remote_path).await {
                            report.succeeded += 1;
                        }
                    }
                }
            }
            None => tracing::warn!(
                asset_id = %asset_id,
                backend = %provenance.backend_id,
                "Backend no longer registered, remote copy left in place"
            ),
        }

        if let Err(e) = self.provenance.remove(asset_id).await {
            tracing::error!(error = %e, asset_id = %asset_id, "Failed to remove provenance");
        }

        tracing::info!(
            asset_id = %asset_id,
            backend = %provenance.backend_id,
            attempted = report.attempted,
            succeeded = report.succeeded,
            "Remote delete finished"
        );
        report
    }

    /// URL consumers should use for an asset: the cloud URL when it was placed
    /// remotely, otherwise `local_url` unchanged.
    pub async fn resolve_url(&self, asset_id: Uuid, local_url: &str) -> String {
        match self.provenance.get(asset_id).await {
            Ok(Some(provenance)) if provenance.is_remote() && !provenance.cloud_url.is_empty() => {
                provenance.cloud_url
            }
            Ok(_) => local_url.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, asset_id = %asset_id, "Failed to read provenance");
                local_url.to_string()
            }
        }
    }

    async fn existing_placement(&self, asset_id: Uuid) -> Option<AssetPlacement> {
        let provenance = match self.provenance.get(asset_id).await {
            Ok(Some(provenance)) if provenance.is_remote() => provenance,
            Ok(_) => return None,
            Err(e) => {
                tracing::error!(error = %e, asset_id = %asset_id, "Failed to read provenance");
                return Some(AssetPlacement::Local);
            }
        };

        let remote_path = self
            .parent_remote_path(asset_id, &provenance)
            .unwrap_or_default();
        tracing::info!(
            asset_id = %asset_id,
            backend = %provenance.backend_id,
            remote_path = %remote_path,
            "Asset already placed remotely, skipping upload"
        );
        Some(AssetPlacement::Remote {
            backend: provenance.backend_id,
            remote_path,
            url: provenance.cloud_url,
        })
    }

    async fn remote_placement(
        &self,
        asset_id: Uuid,
    ) -> Option<(AssetProvenance, Arc<dyn StorageAdapter>)> {
        let provenance = match self.provenance.get(asset_id).await {
            Ok(Some(provenance)) if provenance.is_remote() => provenance,
            Ok(_) => return None,
            Err(e) => {
                tracing::error!(error = %e, asset_id = %asset_id, "Failed to read provenance");
                return None;
            }
        };

        match self.registry.get(provenance.backend_id) {
            Some(adapter) => Some((provenance, adapter)),
            None => {
                tracing::warn!(
                    asset_id = %asset_id,
                    backend = %provenance.backend_id,
                    "Backend no longer registered"
                );
                None
            }
        }
    }

    fn parent_remote_path(&self, asset_id: Uuid, provenance: &AssetProvenance) -> Option<String> {
        match remote_path_for(&self.local_root, &provenance.original_local_path) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!(error = %e, asset_id = %asset_id, "Stored asset path is unusable");
                None
            }
        }
    }
}
