use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use vodmirror_core::StorageBackend;

use crate::traits::{normalize_prefix, ObjectStore, StorageError, StorageResult};

/// Local filesystem destination, used by tests and local runs.
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at `base_path`, creating the directory
    /// if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore { base_path })
    }

    /// Convert an object key to a filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.split('/').any(|segment| segment == "..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "Key '{}' resolves outside the storage directory",
                key
            )));
        }
        Ok(self.base_path.join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = normalize_prefix(prefix);
        let root = self.base_path.join(prefix.trim_end_matches('/'));
        if fs::metadata(&root).await.is_err() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| StorageError::ListFailed(format!("{}: {}", dir.display(), e)))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::ListFailed(format!("{}: {}", dir.display(), e)))?
            {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&root) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn verify(&self) -> StorageResult<()> {
        fs::metadata(&self.base_path).await.map_err(|e| {
            StorageError::Unavailable(format!(
                "Storage directory {} is not accessible: {}",
                self.base_path.display(),
                e
            ))
        })?;
        Ok(())
    }

    fn destination_uri(&self, key: &str) -> String {
        self.base_path
            .join(key.trim_start_matches('/'))
            .display()
            .to_string()
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn put_then_list_round_trips() {
        let (_dir, store) = store().await;

        store
            .put("assets/show1/v1/seg_1.ts", Bytes::from_static(b"a"), "video/MP2T")
            .await
            .unwrap();
        store
            .put("assets/show1/index.m3u8", Bytes::from_static(b"b"), "application/x-mpegURL")
            .await
            .unwrap();

        let keys = store.list_keys("assets/show1").await.unwrap();
        assert_eq!(keys, vec!["index.m3u8", "v1/seg_1.ts"]);
    }

    #[tokio::test]
    async fn put_overwrites_existing_objects() {
        let (dir, store) = store().await;

        store
            .put("k/seg.ts", Bytes::from_static(b"old"), "video/MP2T")
            .await
            .unwrap();
        store
            .put("k/seg.ts", Bytes::from_static(b"new"), "video/MP2T")
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("k/seg.ts")).unwrap();
        assert_eq!(written, b"new");
    }

    #[tokio::test]
    async fn listing_a_missing_prefix_is_empty() {
        let (_dir, store) = store().await;
        assert!(store.list_keys("nothing/here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let (_dir, store) = store().await;
        let err = store
            .put("../escape.ts", Bytes::from_static(b"x"), "video/MP2T")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));

        let err = store
            .put("/absolute.ts", Bytes::from_static(b"x"), "video/MP2T")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn verify_succeeds_on_an_existing_root() {
        let (_dir, store) = store().await;
        store.verify().await.unwrap();
    }
}
