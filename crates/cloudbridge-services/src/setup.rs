//! Bridge setup and initialization
//!
//! Builds the shared HTTP client, the image-host metadata store and the backend
//! registry from a validated `BridgeConfig`.

use std::sync::Arc;

use cloudbridge_core::{AppError, AssetStore, BridgeConfig, ProvenanceStore};
use cloudbridge_storage::{http, BackendRegistry, JsonFileMetadataStore, MetadataStore};

use crate::orchestrator::UploadOrchestrator;

/// Everything the bridge needs at runtime, built once.
#[derive(Clone)]
pub struct BridgeContext {
    pub config: BridgeConfig,
    pub client: reqwest::Client,
    pub metadata: Arc<dyn MetadataStore>,
    pub registry: Arc<BackendRegistry>,
}

impl BridgeContext {
    pub fn from_config(config: BridgeConfig) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let client = http::build_client(config.http_timeout_secs)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let metadata: Arc<dyn MetadataStore> =
            Arc::new(JsonFileMetadataStore::new(config.metadata_path.clone()));

        Self::with_metadata(config, client, metadata)
    }

    /// Same as `from_config`, with an explicit client and metadata store.
    pub fn with_metadata(
        config: BridgeConfig,
        client: reqwest::Client,
        metadata: Arc<dyn MetadataStore>,
    ) -> Result<Self, AppError> {
        tracing::info!(
            enabled = ?config.enabled_backends.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
            default_backend = %config.default_backend,
            "Initializing backend registry..."
        );
        let registry = Arc::new(BackendRegistry::from_config(
            &config,
            client.clone(),
            metadata.clone(),
        ));

        if !config.default_backend.is_local() && registry.get(config.default_backend).is_none() {
            tracing::warn!(
                default_backend = %config.default_backend,
                "Default backend is not configured, new assets will stay local"
            );
        }

        Ok(Self {
            config,
            client,
            metadata,
            registry,
        })
    }

    pub fn orchestrator(
        &self,
        assets: Arc<dyn AssetStore>,
        provenance: Arc<dyn ProvenanceStore>,
    ) -> UploadOrchestrator {
        UploadOrchestrator::new(
            self.registry.clone(),
            assets,
            provenance,
            self.config.local_root.clone(),
            self.config.default_backend,
        )
    }
}
