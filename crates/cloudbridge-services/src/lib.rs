//! Cloudbridge Services Library
//!
//! Asset lifecycle orchestration on top of `cloudbridge-storage`: placing new
//! assets on a backend, following up with their derivatives, cascading deletes and
//! rewriting public URLs. Also provides in-memory host stores and the bootstrap
//! that wires everything from configuration.

pub mod memory;
pub mod orchestrator;
pub mod setup;

pub use memory::{AssetRecord, InMemoryAssetStore, InMemoryProvenanceStore};
pub use orchestrator::{AssetPlacement, DeleteReport, UploadOrchestrator};
pub use setup::BridgeContext;
