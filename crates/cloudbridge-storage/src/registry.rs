//! Backend registry
//!
//! Built once at startup from the enabled backends and their configuration, then
//! shared by reference. Only adapters whose configuration validates are kept, so
//! anything the registry hands out is ready to use.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cloudbridge_core::{BackendConfig, BackendKind, ConfigProvider};
use reqwest::Client;

use crate::aliyun_oss::AliyunOssAdapter;
use crate::aws_s3::AwsS3Adapter;
use crate::cloudflare_r2::CloudflareR2Adapter;
use crate::github::GithubAdapter;
use crate::imgur::ImgurAdapter;
use crate::metadata::MetadataStore;
use crate::traits::{StorageAdapter, StorageAdapterExt};

/// Outcome of a backend lookup.
#[derive(Clone)]
pub enum ResolvedBackend {
    /// Keep the asset where the host wrote it.
    Local,
    Remote(Arc<dyn StorageAdapter>),
}

impl ResolvedBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            ResolvedBackend::Local => BackendKind::Local,
            ResolvedBackend::Remote(adapter) => adapter.kind(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ResolvedBackend::Local)
    }
}

impl fmt::Debug for ResolvedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedBackend::Local => f.write_str("Local"),
            ResolvedBackend::Remote(adapter) => write!(f, "Remote({})", adapter.kind()),
        }
    }
}

/// Construct the adapter for `kind`. `None` for the local pseudo-backend.
pub fn create_adapter(
    kind: BackendKind,
    config: BackendConfig,
    client: Client,
    metadata: Arc<dyn MetadataStore>,
) -> Option<Arc<dyn StorageAdapter>> {
    match kind {
        BackendKind::Local => None,
        BackendKind::AliyunOss => Some(Arc::new(AliyunOssAdapter::new(config, client))),
        BackendKind::AwsS3 => Some(Arc::new(AwsS3Adapter::new(config, client))),
        BackendKind::CloudflareR2 => Some(Arc::new(CloudflareR2Adapter::new(config, client))),
        BackendKind::GithubJsdelivr => Some(Arc::new(GithubAdapter::new(config, client))),
        BackendKind::Imgur => Some(Arc::new(ImgurAdapter::new(config, client, metadata))),
    }
}

#[derive(Clone, Default)]
pub struct BackendRegistry {
    adapters: BTreeMap<BackendKind, Arc<dyn StorageAdapter>>,
}

impl BackendRegistry {
    /// Registry with only the local pseudo-backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every enabled backend whose configuration validates.
    pub fn from_config(
        config: &dyn ConfigProvider,
        client: Client,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        let mut registry = Self::new();

        for kind in config.enabled_backends() {
            let backend_config = config.backend_config(kind);
            let Some(adapter) =
                create_adapter(kind, backend_config, client.clone(), metadata.clone())
            else {
                continue;
            };
            registry.register(adapter);
        }

        tracing::info!(
            backends = ?registry.adapters.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            "Backend registry initialized"
        );
        registry
    }

    /// Add an adapter, unless its configuration is incomplete. Returns whether it was kept.
    pub fn register(&mut self, adapter: Arc<dyn StorageAdapter>) -> bool {
        let kind = adapter.kind();
        if kind.is_local() {
            return false;
        }
        if !adapter.validate_config() {
            tracing::warn!(backend = %kind, "Backend enabled but not configured, skipping");
            return false;
        }
        self.adapters.insert(kind, adapter);
        true
    }

    pub fn resolve(&self, kind: BackendKind) -> ResolvedBackend {
        match self.adapters.get(&kind) {
            Some(adapter) => ResolvedBackend::Remote(adapter.clone()),
            None => {
                if !kind.is_local() {
                    tracing::debug!(backend = %kind, "Backend not registered, using local storage");
                }
                ResolvedBackend::Local
            }
        }
    }

    /// Resolve a raw backend identifier. Unknown identifiers resolve to local storage.
    pub fn resolve_id(&self, id: &str) -> ResolvedBackend {
        match id.parse::<BackendKind>() {
            Ok(kind) => self.resolve(kind),
            Err(_) => {
                tracing::debug!(backend = %id, "Unknown backend id, using local storage");
                ResolvedBackend::Local
            }
        }
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn StorageAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn adapters(&self) -> impl Iterator<Item = (BackendKind, &Arc<dyn StorageAdapter>)> {
        self.adapters.iter().map(|(kind, adapter)| (*kind, adapter))
    }

    /// Every usable backend, local first.
    pub fn available_backends(&self) -> Vec<BackendKind> {
        std::iter::once(BackendKind::Local)
            .chain(self.adapters.keys().copied())
            .collect()
    }

    /// Run a connection test against every registered adapter, one at a time.
    pub async fn test_all(&self) -> BTreeMap<BackendKind, bool> {
        let mut results = BTreeMap::new();
        for (kind, adapter) in &self.adapters {
            results.insert(*kind, adapter.check_connection().await);
        }
        results
    }
}
