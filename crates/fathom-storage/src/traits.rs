//! Storage abstraction trait
//!
//! This module defines the BlobStore trait that all storage backends must
//! implement.

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Content-addressable blob storage.
///
/// Keys are opaque strings; the pipeline assumes nothing about their
/// structure beyond round-trip stability. Backends are stateless handles
/// and safe to share across concurrent jobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download an object by its storage key. A missing object is
    /// [`StorageError::NotFound`], distinguishable from transport failures.
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Upload data under a specific storage key (derived thumbnails and
    /// renditions). Overwrites any existing object at that key.
    async fn put(&self, storage_key: &str, data: Vec<u8>, content_type: &str)
        -> StorageResult<()>;

    /// Delete an object by its storage key.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}
