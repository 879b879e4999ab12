#[cfg(feature = "storage-local")]
use crate::LocalStore;
#[cfg(feature = "storage-s3")]
use crate::S3Store;
use crate::{ObjectStore, StorageError, StorageResult};
use std::sync::Arc;
use vodmirror_core::{MirrorConfig, StorageBackend};

/// Create a destination store based on configuration
pub async fn create_store(config: &MirrorConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint.clone();

            let store = S3Store::new(bucket, region, endpoint).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let store = LocalStore::new(base_path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_backend_requires_a_path() {
        let mut config = MirrorConfig::default();
        config.storage_backend = StorageBackend::Local;
        config.local_storage_path = None;

        let err = create_store(&config).await.err().unwrap();
        assert!(matches!(err, StorageError::ConfigError(_)));
    }

    #[tokio::test]
    async fn local_backend_builds_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MirrorConfig::default();
        config.storage_backend = StorageBackend::Local;
        config.local_storage_path = Some(dir.path().display().to_string());

        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_type(), StorageBackend::Local);
    }
}
