//! Asset models shared by the orchestrator and the host-facing stores.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::storage_types::BackendKind;

/// Where an asset ended up. Written once when the upload succeeds, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProvenance {
    pub backend_id: BackendKind,
    pub original_local_path: PathBuf,
    pub cloud_url: String,
}

impl AssetProvenance {
    pub fn is_remote(&self) -> bool {
        !self.backend_id.is_local()
    }
}

/// A generated variant of an asset, stored next to the primary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivative {
    /// Size label the host uses for the variant (e.g. `thumbnail`, `medium`).
    pub label: String,
    /// File name inside the primary file's directory.
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_url: Option<String>,
}

impl Derivative {
    pub fn new(label: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            file_name: file_name.into(),
            cloud_url: None,
        }
    }
}
