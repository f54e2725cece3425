use cloudbridge_core::{BackendConfig, BackendKind};
use cloudbridge_storage::{GithubAdapter, StorageAdapter, StorageAdapterExt, StorageError};
use mockito::Matcher;
use serde_json::json;
use tempfile::TempDir;

const CONTENTS_PATH: &str = "/repos/octo/assets/contents/images/2024/01/a.png";

fn config() -> BackendConfig {
    BackendConfig::new(BackendKind::GithubJsdelivr)
        .with("token", "ghp_test")
        .with("repo", "octo/assets")
        .with("branch", "main")
        .with("path", "images")
}

fn adapter(server: &mockito::ServerGuard) -> GithubAdapter {
    GithubAdapter::new(config(), reqwest::Client::new()).with_base_url(server.url())
}

#[tokio::test]
async fn upload_commits_base64_content() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.png");
    std::fs::write(&file, b"hello").unwrap();

    let mut server = mockito::Server::new_async().await;
    let commit = server
        .mock("PUT", CONTENTS_PATH)
        .match_header("authorization", "token ghp_test")
        .match_header("accept", "application/vnd.github.v3+json")
        .match_header("user-agent", Matcher::Regex("^cloudbridge/".to_string()))
        .match_body(Matcher::PartialJson(json!({
            "content": "aGVsbG8=",
            "branch": "main",
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"content":{"sha":"3b18e512dba79e4c8300dd08aeb37f8e728b8dad"}}"#)
        .create_async()
        .await;

    let url = adapter(&server)
        .upload_file(&file, "2024/01/a.png")
        .await
        .unwrap();

    commit.assert_async().await;
    assert_eq!(
        url,
        "https://cdn.jsdelivr.net/gh/octo/assets@main/images/2024/01/a.png"
    );
}

#[tokio::test]
async fn upload_without_content_sha_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.png");
    std::fs::write(&file, b"hello").unwrap();

    let mut server = mockito::Server::new_async().await;
    let _commit = server
        .mock("PUT", CONTENTS_PATH)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let err = adapter(&server)
        .upload_file(&file, "2024/01/a.png")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::ProtocolMismatch(_)));
}

#[tokio::test]
async fn delete_looks_up_sha_then_deletes() {
    let mut server = mockito::Server::new_async().await;
    let lookup = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_status(200)
        .with_body(r#"{"sha":"abc123","path":"images/2024/01/a.png"}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", CONTENTS_PATH)
        .match_body(Matcher::PartialJson(json!({
            "sha": "abc123",
            "branch": "main",
        })))
        .with_status(200)
        .with_body(r#"{"commit":{}}"#)
        .create_async()
        .await;

    assert!(adapter(&server).try_delete("2024/01/a.png").await);
    lookup.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn delete_stops_when_lookup_fails() {
    let mut server = mockito::Server::new_async().await;
    let lookup = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"message":"Not Found"}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", CONTENTS_PATH)
        .expect(0)
        .create_async()
        .await;

    let err = adapter(&server)
        .delete_file("2024/01/a.png")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::RemoteRejected { status: 404, .. }));
    lookup.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn connection_test_reads_repository() {
    let mut server = mockito::Server::new_async().await;
    let repo = server
        .mock("GET", "/repos/octo/assets")
        .match_header("authorization", "token ghp_test")
        .with_status(200)
        .with_body(r#"{"full_name":"octo/assets"}"#)
        .create_async()
        .await;

    assert!(adapter(&server).check_connection().await);
    repo.assert_async().await;
}

#[tokio::test]
async fn url_defaults_to_jsdelivr_with_repo_path() {
    let adapter = GithubAdapter::new(config(), reqwest::Client::new());
    assert_eq!(
        adapter.get_file_url("2024/01/a.png").await,
        "https://cdn.jsdelivr.net/gh/octo/assets@main/images/2024/01/a.png"
    );
}

#[tokio::test]
async fn url_prefix_replaces_cdn_and_repo_path() {
    let adapter = GithubAdapter::new(
        config().with("url_prefix", "https://cdn.example.com/"),
        reqwest::Client::new(),
    );

    let url = adapter.get_file_url("2024/01/a.png").await;
    assert_eq!(url, "https://cdn.example.com/2024/01/a.png");
    assert!(!url.contains("images/"));
}
