use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cloudbridge_core::{AssetProvenance, BackendKind, Derivative, ProvenanceStore};
use cloudbridge_services::{
    AssetPlacement, DeleteReport, InMemoryAssetStore, InMemoryProvenanceStore,
    UploadOrchestrator,
};
use cloudbridge_storage::{BackendRegistry, StorageAdapter, StorageError, StorageResult};
use tempfile::TempDir;

const CDN: &str = "https://cdn.test";

/// Adapter double that records every call and never touches the network.
#[derive(Clone, Default)]
struct RecordingAdapter {
    kind: Option<BackendKind>,
    fail_uploads: bool,
    fail_deletes: bool,
    uploads: Arc<Mutex<Vec<String>>>,
    deletes: Arc<Mutex<Vec<String>>>,
}

impl RecordingAdapter {
    fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageAdapter for RecordingAdapter {
    fn kind(&self) -> BackendKind {
        self.kind.unwrap_or(BackendKind::AwsS3)
    }

    fn validate_config(&self) -> bool {
        true
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> StorageResult<String> {
        self.uploads.lock().unwrap().push(remote_path.to_string());
        if self.fail_uploads {
            return Err(StorageError::RemoteRejected {
                status: 500,
                body: String::new(),
            });
        }
        assert!(local_path.exists(), "uploading a missing file");
        Ok(format!("{}/{}", CDN, remote_path))
    }

    async fn delete_file(&self, remote_path: &str) -> StorageResult<()> {
        self.deletes.lock().unwrap().push(remote_path.to_string());
        if self.fail_deletes {
            return Err(StorageError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    async fn get_file_url(&self, remote_path: &str) -> String {
        format!("{}/{}", CDN, remote_path)
    }

    async fn test_connection(&self) -> StorageResult<()> {
        Ok(())
    }
}

struct Harness {
    root: TempDir,
    adapter: RecordingAdapter,
    assets: InMemoryAssetStore,
    provenance: InMemoryProvenanceStore,
    orchestrator: UploadOrchestrator,
}

impl Harness {
    fn new(adapter: RecordingAdapter, default_backend: BackendKind) -> Self {
        let root = TempDir::new().unwrap();
        let mut registry = BackendRegistry::new();
        assert!(registry.register(Arc::new(adapter.clone())));

        let assets = InMemoryAssetStore::new();
        let provenance = InMemoryProvenanceStore::new();
        let orchestrator = UploadOrchestrator::new(
            Arc::new(registry),
            Arc::new(assets.clone()),
            Arc::new(provenance.clone()),
            root.path(),
            default_backend,
        );

        Self {
            root,
            adapter,
            assets,
            provenance,
            orchestrator,
        }
    }

    fn write(&self, relative: &str) -> PathBuf {
        let path = self.root.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"image-bytes").unwrap();
        path
    }

    async fn asset(&self, relative: &str) -> uuid::Uuid {
        let path = self.write(relative);
        self.assets
            .add_asset(path, &format!("http://localhost/uploads/{}", relative))
            .await
    }
}

#[tokio::test]
async fn upload_to_requested_backend_rewrites_url() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let id = h.asset("2024/01/photo.jpg").await;

    let placement = h.orchestrator.on_asset_created(id, Some("aws_s3")).await;

    assert_eq!(
        placement,
        AssetPlacement::Remote {
            backend: BackendKind::AwsS3,
            remote_path: "2024/01/photo.jpg".to_string(),
            url: "https://cdn.test/2024/01/photo.jpg".to_string(),
        }
    );
    assert_eq!(h.adapter.uploads(), vec!["2024/01/photo.jpg"]);

    let record = h.assets.record(id).await.unwrap();
    assert_eq!(record.public_url, "https://cdn.test/2024/01/photo.jpg");

    let provenance = h.provenance.get(id).await.unwrap().unwrap();
    assert_eq!(provenance.backend_id, BackendKind::AwsS3);
    assert_eq!(provenance.original_local_path, record.local_path);
    assert_eq!(provenance.cloud_url, "https://cdn.test/2024/01/photo.jpg");
}

#[tokio::test]
async fn second_create_event_keeps_first_placement() {
    let root = TempDir::new().unwrap();
    let s3 = RecordingAdapter::default();
    let imgur = RecordingAdapter {
        kind: Some(BackendKind::Imgur),
        ..Default::default()
    };
    let mut registry = BackendRegistry::new();
    assert!(registry.register(Arc::new(s3.clone())));
    assert!(registry.register(Arc::new(imgur.clone())));

    let assets = InMemoryAssetStore::new();
    let provenance = InMemoryProvenanceStore::new();
    let orchestrator = UploadOrchestrator::new(
        Arc::new(registry),
        Arc::new(assets.clone()),
        Arc::new(provenance.clone()),
        root.path(),
        BackendKind::Local,
    );
    let path = root.path().join("a.jpg");
    std::fs::write(&path, b"image-bytes").unwrap();
    let id = assets.add_asset(path, "http://localhost/uploads/a.jpg").await;

    let first = orchestrator.on_asset_created(id, Some("aws_s3")).await;
    let second = orchestrator.on_asset_created(id, Some("imgur")).await;

    assert_eq!(first, second);
    assert_eq!(s3.uploads(), vec!["a.jpg"]);
    assert!(imgur.uploads().is_empty());

    let stored = provenance.get(id).await.unwrap().unwrap();
    assert_eq!(stored.backend_id, BackendKind::AwsS3);
    assert_eq!(stored.cloud_url, "https://cdn.test/a.jpg");
}

#[tokio::test]
async fn default_backend_applies_when_none_requested() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::AwsS3);
    let id = h.asset("a.jpg").await;

    let placement = h.orchestrator.on_asset_created(id, None).await;
    assert!(placement.is_remote());
    assert_eq!(h.adapter.uploads(), vec!["a.jpg"]);
}

#[tokio::test]
async fn unknown_backend_leaves_asset_untouched() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::AwsS3);
    let id = h.asset("2024/01/photo.jpg").await;

    let placement = h
        .orchestrator
        .on_asset_created(id, Some("unconfigured-kind"))
        .await;

    assert_eq!(placement, AssetPlacement::Local);
    assert!(h.adapter.uploads().is_empty());
    assert!(h.provenance.is_empty().await);
    assert_eq!(
        h.assets.record(id).await.unwrap().public_url,
        "http://localhost/uploads/2024/01/photo.jpg"
    );
}

#[tokio::test]
async fn unregistered_backend_resolves_local() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let id = h.asset("a.jpg").await;

    assert_eq!(
        h.orchestrator.on_asset_created(id, Some("imgur")).await,
        AssetPlacement::Local
    );
    assert!(h.provenance.is_empty().await);
}

#[tokio::test]
async fn failed_upload_keeps_asset_local() {
    let adapter = RecordingAdapter {
        fail_uploads: true,
        ..Default::default()
    };
    let h = Harness::new(adapter, BackendKind::Local);
    let id = h.asset("2024/01/photo.jpg").await;

    let placement = h.orchestrator.on_asset_created(id, Some("aws_s3")).await;

    assert_eq!(
        placement,
        AssetPlacement::KeptLocal {
            backend: BackendKind::AwsS3
        }
    );
    assert_eq!(h.adapter.uploads().len(), 1);
    assert!(h.provenance.is_empty().await);
    assert_eq!(
        h.assets.record(id).await.unwrap().public_url,
        "http://localhost/uploads/2024/01/photo.jpg"
    );
}

#[tokio::test]
async fn file_outside_root_is_not_uploaded() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let elsewhere = TempDir::new().unwrap();
    let path = elsewhere.path().join("a.jpg");
    std::fs::write(&path, b"x").unwrap();
    let id = h.assets.add_asset(path, "http://localhost/a.jpg").await;

    let placement = h.orchestrator.on_asset_created(id, Some("aws_s3")).await;
    assert!(!placement.is_remote());
    assert!(h.adapter.uploads().is_empty());
}

#[tokio::test]
async fn derivatives_follow_parent_backend() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let id = h.asset("2024/01/photo.jpg").await;
    h.write("2024/01/photo-150x150.jpg");
    h.assets
        .add_derivative(id, Derivative::new("thumbnail", "photo-150x150.jpg"))
        .await;
    h.assets
        .add_derivative(id, Derivative::new("medium", "photo-300x200.jpg"))
        .await;

    h.orchestrator.on_asset_created(id, Some("aws_s3")).await;
    let uploaded = h.orchestrator.on_derivatives_generated(id).await;

    assert_eq!(uploaded, 1);
    assert_eq!(
        h.adapter.uploads(),
        vec!["2024/01/photo.jpg", "2024/01/photo-150x150.jpg"]
    );

    let record = h.assets.record(id).await.unwrap();
    assert_eq!(
        record.derivatives[0].cloud_url.as_deref(),
        Some("https://cdn.test/2024/01/photo-150x150.jpg")
    );
    assert_eq!(record.derivatives[1].cloud_url, None);
    assert_eq!(record.public_url, "https://cdn.test/2024/01/photo.jpg");
}

#[tokio::test]
async fn derivatives_of_local_asset_are_ignored() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let id = h.asset("a.jpg").await;
    h.write("a-150x150.jpg");
    h.assets
        .add_derivative(id, Derivative::new("thumbnail", "a-150x150.jpg"))
        .await;

    assert_eq!(h.orchestrator.on_derivatives_generated(id).await, 0);
    assert!(h.adapter.uploads().is_empty());
}

#[tokio::test]
async fn delete_cascades_to_every_derivative() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let id = h.asset("2024/01/photo.jpg").await;
    h.assets
        .add_derivative(id, Derivative::new("thumbnail", "photo-150x150.jpg"))
        .await;
    h.assets
        .add_derivative(id, Derivative::new("medium", "photo-300x200.jpg"))
        .await;
    h.orchestrator.on_asset_created(id, Some("aws_s3")).await;

    let report = h.orchestrator.on_asset_deleted(id).await;

    assert_eq!(
        report,
        DeleteReport {
            attempted: 3,
            succeeded: 3
        }
    );
    assert_eq!(
        h.adapter.deletes(),
        vec![
            "2024/01/photo.jpg",
            "2024/01/photo-150x150.jpg",
            "2024/01/photo-300x200.jpg"
        ]
    );
    assert!(h.provenance.is_empty().await);
}

#[tokio::test]
async fn delete_attempts_every_path_even_when_failing() {
    let adapter = RecordingAdapter {
        fail_deletes: true,
        ..Default::default()
    };
    let h = Harness::new(adapter, BackendKind::Local);
    let id = h.asset("a.jpg").await;
    h.assets
        .add_derivative(id, Derivative::new("thumbnail", "a-150x150.jpg"))
        .await;
    h.orchestrator.on_asset_created(id, Some("aws_s3")).await;

    let report = h.orchestrator.on_asset_deleted(id).await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 0);
    assert!(!report.is_complete());
    assert_eq!(h.adapter.deletes().len(), 2);
}

#[tokio::test]
async fn delete_of_local_asset_makes_no_calls() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let id = h.asset("a.jpg").await;

    assert_eq!(h.orchestrator.on_asset_deleted(id).await, DeleteReport::default());
    assert!(h.adapter.deletes().is_empty());
}

#[tokio::test]
async fn resolve_url_prefers_cloud_copy() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let remote = h.asset("remote.jpg").await;
    let local = h.asset("local.jpg").await;
    h.orchestrator.on_asset_created(remote, Some("aws_s3")).await;

    assert_eq!(
        h.orchestrator
            .resolve_url(remote, "http://localhost/uploads/remote.jpg")
            .await,
        "https://cdn.test/remote.jpg"
    );
    assert_eq!(
        h.orchestrator
            .resolve_url(local, "http://localhost/uploads/local.jpg")
            .await,
        "http://localhost/uploads/local.jpg"
    );
}

#[tokio::test]
async fn resolve_url_ignores_local_provenance() {
    let h = Harness::new(RecordingAdapter::default(), BackendKind::Local);
    let id = h.asset("a.jpg").await;
    h.provenance
        .put(
            id,
            AssetProvenance {
                backend_id: BackendKind::Local,
                original_local_path: h.root.path().join("a.jpg"),
                cloud_url: "https://should-not-be-used".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        h.orchestrator.resolve_url(id, "http://localhost/a.jpg").await,
        "http://localhost/a.jpg"
    );
}
