//! Storage abstractions for snapshot and directory persistence.
//!
//! Backends only move bytes under string keys. JSON handling and the
//! "missing or corrupt means empty" rule live in [`SnapshotStore`].
//!
//! ## Layout
//!
//! ```text
//! {root or bucket}/
//! ├── items_seen.json       # snapshot (snapshot.key)
//! └── config/
//!     └── recipients.json   # recipient directory (recipients.directory_key)
//! ```

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;
mod snapshot;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::StorageConfig;

// Re-export for convenience
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;
pub use snapshot::{SnapshotStore, WriteMetadata};

/// Key-value byte storage.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Read an object, returning `None` if it does not exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Create or overwrite an object.
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Human-readable location of a key, for logs.
    fn location(&self, key: &str) -> String;
}

/// Open the backend named by the storage config.
///
/// A configured bucket selects S3; otherwise the local directory is used.
pub async fn open(config: &StorageConfig) -> Result<Box<dyn BlobStorage>> {
    match config.bucket.as_deref() {
        #[cfg(feature = "s3")]
        Some(bucket) => Ok(Box::new(S3Storage::from_env(bucket).await)),
        #[cfg(not(feature = "s3"))]
        Some(bucket) => Err(crate::error::AppError::config(format!(
            "bucket '{bucket}' configured but S3 support is not enabled"
        ))),
        None => Ok(Box::new(LocalStorage::new(&config.local_dir))),
    }
}
