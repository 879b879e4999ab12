//! Object-storage backends for mirror destinations.
//!
//! All backends implement the `ObjectStore` trait, so the transfer engine
//! works against any destination without coupling to implementation details.
//! Writes are idempotent overwrites: re-uploading a key is always safe, which
//! is what resumability across invocations relies on.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3Store;
pub use traits::{ObjectStore, StorageError, StorageResult};
