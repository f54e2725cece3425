//! Helpers for the `cloudbridge` operator binary.

use std::path::Path;

use cloudbridge_core::{AppError, BackendKind, BridgeConfig};
use cloudbridge_storage::keys::{prefixed_url, remote_path_for};
use cloudbridge_storage::BackendRegistry;
use serde::Serialize;

/// One row of `cloudbridge backends`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub id: &'static str,
    pub name: &'static str,
    pub enabled: bool,
    /// Enabled and fully configured.
    pub registered: bool,
    pub default: bool,
    pub missing_fields: Vec<&'static str>,
}

pub fn backend_statuses(config: &BridgeConfig, registry: &BackendRegistry) -> Vec<BackendStatus> {
    BackendKind::ALL
        .iter()
        .map(|kind| {
            let enabled = config.enabled_backends.contains(kind);
            let missing_fields = if kind.is_local() {
                Vec::new()
            } else {
                config
                    .backends
                    .get(kind)
                    .map(|c| c.missing_fields(*kind))
                    .unwrap_or_else(|| kind.required_fields().to_vec())
            };
            BackendStatus {
                id: kind.as_str(),
                name: kind.display_name(),
                enabled,
                registered: kind.is_local() || registry.get(*kind).is_some(),
                default: config.default_backend == *kind,
                missing_fields,
            }
        })
        .collect()
}

/// Remote path of `file`, relative to the local storage root.
///
/// Both paths are canonicalized when they exist so relative arguments work.
pub fn remote_path_for_file(local_root: &Path, file: &Path) -> Result<String, AppError> {
    let root = local_root
        .canonicalize()
        .unwrap_or_else(|_| local_root.to_path_buf());
    let file = file.canonicalize().map_err(|e| {
        AppError::InvalidInput(format!("Cannot read {}: {}", file.display(), e))
    })?;
    remote_path_for(&root, &file).map_err(|e| AppError::InvalidInput(e.to_string()))
}

/// Public URL of a file left on local storage.
pub fn local_url(config: &BridgeConfig, remote_path: &str) -> String {
    prefixed_url(&config.local_base_url, remote_path)
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays parseable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
