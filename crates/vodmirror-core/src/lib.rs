//! Vodmirror Core Library
//!
//! This crate provides the domain models, error types, configuration, and URL
//! handling shared across all vodmirror components.

pub mod collections;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod urls;
pub mod validation;

// Re-export commonly used types
pub use collections::OrderedSet;
pub use config::MirrorConfig;
pub use error::MirrorError;
pub use models::{
    CompletionStatus, ManifestKind, MirrorReport, MirrorRequest, TransferOutcome, VodAsset,
};
pub use storage_types::StorageBackend;
