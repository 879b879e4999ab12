//! Storage abstraction trait
//!
//! This module defines the ObjectStore trait that all destination backends
//! must implement.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use vodmirror_core::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Destination unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination object store.
///
/// Backends are assumed to support durable, idempotent at-least-once writes:
/// putting an existing key overwrites it, and a write is listable once `put`
/// returns. Resumability correctness depends on nothing stronger.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write one object, overwriting any existing content under the key.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// List the object keys currently present under a prefix, relative to
    /// that prefix (no leading `/`).
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Cheap reachability probe used by input validation before any transfer
    /// work starts.
    async fn verify(&self) -> StorageResult<()>;

    /// Caller-facing URI of an object key (e.g. `s3://bucket/key`).
    fn destination_uri(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Normalize a listing prefix so it always ends with exactly one `/`.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_end_matches('/'))
}
