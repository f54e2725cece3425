//! Cloudbridge Storage Library
//!
//! This crate provides the `StorageAdapter` trait and one adapter per remote
//! backend: Aliyun OSS, AWS S3, Cloudflare R2, GitHub (served via jsDelivr) and
//! Imgur. It also contains the request signers, the image-host metadata store and
//! the registry that builds adapters from configuration.
//!
//! # Remote paths
//!
//! An asset's remote path is its location relative to the host's upload root,
//! e.g. `2024/01/photo.jpg`. Every backend stores the asset under that same path.
//! Paths must not contain `..` or a leading `/`.

pub mod aliyun_oss;
pub mod aws_s3;
pub mod cloudflare_r2;
pub mod github;
pub mod http;
pub mod imgur;
pub mod keys;
pub mod metadata;
pub mod registry;
pub(crate) mod s3_compat;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use aliyun_oss::AliyunOssAdapter;
pub use aws_s3::AwsS3Adapter;
pub use cloudbridge_core::BackendKind;
pub use cloudflare_r2::CloudflareR2Adapter;
pub use github::GithubAdapter;
pub use imgur::ImgurAdapter;
pub use metadata::{ImgurRecord, InMemoryMetadataStore, JsonFileMetadataStore, MetadataStore};
pub use registry::{create_adapter, BackendRegistry, ResolvedBackend};
pub use traits::{StorageAdapter, StorageAdapterExt, StorageError, StorageResult};
