//! Cloudbridge Core Library
//!
//! This crate provides the backend identifiers, configuration, error types,
//! asset models and host integration traits shared by every cloudbridge crate.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{env_key, BackendConfig, BridgeConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{AssetStore, ConfigProvider, ProvenanceStore};
pub use models::{AssetProvenance, Derivative};
pub use storage_types::BackendKind;
