pub mod asset;

pub use asset::{AssetProvenance, Derivative};
