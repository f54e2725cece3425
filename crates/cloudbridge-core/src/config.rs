//! Configuration module
//!
//! Bridge configuration is read from the environment (optionally seeded from a
//! `.env` file). Backend credentials follow the `<KIND>_<FIELD>` naming scheme,
//! e.g. `AWS_S3_ACCESS_KEY` or `IMGUR_CLIENT_ID`.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::path::PathBuf;

use crate::hooks::ConfigProvider;
use crate::storage_types::BackendKind;

const HTTP_TIMEOUT_SECS: u64 = 30;
const LOCAL_BASE_URL: &str = "http://localhost/uploads";
const METADATA_FILE_NAME: &str = ".cloudbridge-metadata.json";
const GITHUB_DEFAULT_BRANCH: &str = "main";
const GITHUB_DEFAULT_PATH: &str = "images";

/// Named fields for a single backend (credentials, bucket, region, url prefix...).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BackendConfig {
    pub kind: Option<BackendKind>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl BackendConfig {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind: Some(kind),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Field value, treating blank strings as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Field value or empty string. Only meaningful once `validate_for` holds.
    pub fn field(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Optional custom domain / CDN prefix for public URLs, without trailing slash.
    pub fn url_prefix(&self) -> Option<&str> {
        self.get("url_prefix")
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
    }

    /// True iff every field `kind` requires is non-empty.
    pub fn validate_for(&self, kind: BackendKind) -> bool {
        kind.required_fields()
            .iter()
            .all(|field| self.get(field).is_some())
    }

    /// Required fields that are missing or blank.
    pub fn missing_fields(&self, kind: BackendKind) -> Vec<&'static str> {
        kind.required_fields()
            .iter()
            .copied()
            .filter(|field| self.get(field).is_none())
            .collect()
    }
}

/// Bridge configuration.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub enabled_backends: BTreeSet<BackendKind>,
    pub default_backend: BackendKind,
    /// Root directory the host writes assets into. Remote paths are relative to it.
    pub local_root: PathBuf,
    pub local_base_url: String,
    /// JSON document holding image-host delete tokens.
    pub metadata_path: PathBuf,
    pub http_timeout_secs: u64,
    pub backends: BTreeMap<BackendKind, BackendConfig>,
}

impl BridgeConfig {
    /// Minimal config with only local storage enabled.
    pub fn local_only(local_root: impl Into<PathBuf>) -> Self {
        let local_root = local_root.into();
        let mut enabled_backends = BTreeSet::new();
        enabled_backends.insert(BackendKind::Local);
        Self {
            metadata_path: local_root.join(METADATA_FILE_NAME),
            enabled_backends,
            default_backend: BackendKind::Local,
            local_root,
            local_base_url: LOCAL_BASE_URL.to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            backends: BTreeMap::new(),
        }
    }

    /// Enable a backend with the given fields.
    pub fn with_backend(mut self, config: BackendConfig) -> Self {
        if let Some(kind) = config.kind {
            self.enabled_backends.insert(kind);
            self.backends.insert(kind, config);
        }
        self
    }

    pub fn with_default_backend(mut self, kind: BackendKind) -> Self {
        self.default_backend = kind;
        self
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut enabled_backends = BTreeSet::new();
        enabled_backends.insert(BackendKind::Local);
        if let Some(list) = var("CLOUDBRIDGE_ENABLED_BACKENDS") {
            for id in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                enabled_backends.insert(id.parse::<BackendKind>()?);
            }
        }

        let default_backend = match var("CLOUDBRIDGE_DEFAULT_BACKEND") {
            Some(id) => id.parse::<BackendKind>()?,
            None => BackendKind::Local,
        };

        let local_root = var("CLOUDBRIDGE_LOCAL_ROOT")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("CLOUDBRIDGE_LOCAL_ROOT must be set"))?;

        let local_base_url = var("CLOUDBRIDGE_LOCAL_BASE_URL")
            .unwrap_or_else(|| LOCAL_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let metadata_path = var("CLOUDBRIDGE_METADATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| local_root.join(METADATA_FILE_NAME));

        let http_timeout_secs = match var("CLOUDBRIDGE_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("CLOUDBRIDGE_HTTP_TIMEOUT_SECS must be a valid number")
            })?,
            None => HTTP_TIMEOUT_SECS,
        };

        let mut backends = BTreeMap::new();
        for kind in BackendKind::ALL.iter().filter(|k| !k.is_local()) {
            let mut backend = BackendConfig::new(*kind);
            if *kind == BackendKind::GithubJsdelivr {
                backend.set("branch", GITHUB_DEFAULT_BRANCH);
                backend.set("path", GITHUB_DEFAULT_PATH);
            }
            let names = kind
                .required_fields()
                .iter()
                .chain(kind.optional_fields().iter());
            for name in names {
                if let Some(value) = var(&env_key(*kind, name)) {
                    backend.set(name, value.trim());
                }
            }
            backends.insert(*kind, backend);
        }

        let config = BridgeConfig {
            enabled_backends,
            default_backend,
            local_root,
            local_base_url,
            metadata_path,
            http_timeout_secs,
            backends,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "CLOUDBRIDGE_HTTP_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if !self.enabled_backends.contains(&self.default_backend) {
            return Err(anyhow::anyhow!(
                "CLOUDBRIDGE_DEFAULT_BACKEND '{}' is not listed in CLOUDBRIDGE_ENABLED_BACKENDS",
                self.default_backend
            ));
        }

        Ok(())
    }
}

impl ConfigProvider for BridgeConfig {
    fn backend_config(&self, kind: BackendKind) -> BackendConfig {
        self.backends
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| BackendConfig::new(kind))
    }

    fn enabled_backends(&self) -> BTreeSet<BackendKind> {
        self.enabled_backends.clone()
    }

    fn default_backend(&self) -> BackendKind {
        self.default_backend
    }
}

/// Environment variable holding `field` for `kind`, e.g. `CLOUDFLARE_R2_ACCOUNT_ID`.
pub fn env_key(kind: BackendKind, field: &str) -> String {
    format!("{}_{}", kind.as_str(), field).to_uppercase()
}
