//! Remote path derivation shared by every backend.
//!
//! A remote path is the file's location relative to the host's upload root,
//! always `/`-separated, e.g. `2024/01/photo.jpg`. Thumbnails sit next to their
//! parent: `2024/01/photo-150x150.jpg`.

use std::path::{Component, Path};

use crate::{StorageError, StorageResult};

/// Derive the remote path of `file` relative to `root`.
///
/// Fails when the file is not under the root or the relative path climbs out of it.
pub fn remote_path_for(root: &Path, file: &Path) -> StorageResult<String> {
    let relative = file.strip_prefix(root).map_err(|_| {
        StorageError::InvalidKey(format!(
            "{} is outside upload root {}",
            file.display(),
            root.display()
        ))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(StorageError::InvalidKey(format!(
                    "{} resolves outside upload root",
                    file.display()
                )))
            }
        }
    }

    let key = segments.join("/");
    validate_remote_path(&key)?;
    Ok(key)
}

/// Reject empty keys, absolute keys and keys containing `..`.
pub fn validate_remote_path(remote_path: &str) -> StorageResult<()> {
    if remote_path.is_empty() {
        return Err(StorageError::InvalidKey("Remote path is empty".to_string()));
    }
    if remote_path.starts_with('/') || remote_path.split('/').any(|s| s == "..") {
        return Err(StorageError::InvalidKey(
            "Remote path contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Remote path of a derivative file stored beside `parent_remote_path`.
pub fn sibling_remote_path(parent_remote_path: &str, file_name: &str) -> String {
    match parent_remote_path.rfind('/') {
        Some(idx) => format!("{}/{}", &parent_remote_path[..idx], file_name),
        None => file_name.to_string(),
    }
}

/// Last path segment of a remote path or URL.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `<prefix>/<remote_path>`, with the prefix's trailing slash already trimmed.
pub fn prefixed_url(prefix: &str, remote_path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), remote_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn remote_path_is_relative_to_root() {
        let root = PathBuf::from("/var/uploads");
        let file = root.join("2024").join("01").join("photo.jpg");
        assert_eq!(remote_path_for(&root, &file).unwrap(), "2024/01/photo.jpg");
    }

    #[test]
    fn remote_path_rejects_outside_root() {
        let root = PathBuf::from("/var/uploads");
        assert!(remote_path_for(&root, Path::new("/etc/passwd")).is_err());
        assert!(remote_path_for(&root, &root.join("../secret.jpg")).is_err());
        assert!(remote_path_for(&root, &root).is_err());
    }

    #[test]
    fn validate_remote_path_rules() {
        assert!(validate_remote_path("img/a.png").is_ok());
        assert!(validate_remote_path("").is_err());
        assert!(validate_remote_path("/img/a.png").is_err());
        assert!(validate_remote_path("img/../a.png").is_err());
        assert!(validate_remote_path("img/a..b.png").is_ok());
    }

    #[test]
    fn sibling_keeps_parent_directory() {
        assert_eq!(
            sibling_remote_path("2024/01/photo.jpg", "photo-150x150.jpg"),
            "2024/01/photo-150x150.jpg"
        );
        assert_eq!(sibling_remote_path("photo.jpg", "photo-1x1.jpg"), "photo-1x1.jpg");
    }

    #[test]
    fn basename_and_prefix() {
        assert_eq!(basename("https://i.imgur.com/abc.png"), "abc.png");
        assert_eq!(basename("a.png"), "a.png");
        assert_eq!(prefixed_url("https://cdn.test/", "img/a.png"), "https://cdn.test/img/a.png");
    }
}
