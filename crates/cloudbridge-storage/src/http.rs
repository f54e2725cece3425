//! HTTP plumbing shared by the adapters.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response};

use crate::{StorageError, StorageResult};

pub(crate) const USER_AGENT: &str = concat!("cloudbridge/", env!("CARGO_PKG_VERSION"));

/// Longest response body kept in a `RemoteRejected` error.
const MAX_ERROR_BODY: usize = 512;

/// Build the client every adapter shares. Requests give up after `timeout_secs`.
pub fn build_client(timeout_secs: u64) -> StorageResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| StorageError::Transport(format!("Failed to build HTTP client: {}", e)))
}

/// Read the whole local file into memory.
pub async fn read_local(path: &Path) -> StorageResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| StorageError::LocalFileUnreadable {
            path: path.to_path_buf(),
            source,
        })
}

/// MIME type guessed from the file extension.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Pass the response through when its status is one of `accepted`.
pub async fn expect_status(response: Response, accepted: &[u16]) -> StorageResult<Response> {
    let status = response.status().as_u16();
    if accepted.contains(&status) {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(StorageError::RemoteRejected { status, body })
}

/// Parse a JSON response body.
pub async fn json_body(response: Response) -> StorageResult<serde_json::Value> {
    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| StorageError::ProtocolMismatch(format!("Response is not JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("a/b.png")), "image/png");
        assert_eq!(content_type_for(Path::new("a/b.jpg")), "image/jpeg");
        assert_eq!(
            content_type_for(Path::new("a/b.unknownext")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn read_local_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_local(&dir.path().join("missing.png")).await.unwrap_err();
        assert!(matches!(err, StorageError::LocalFileUnreadable { .. }));
    }
}
