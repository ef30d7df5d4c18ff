//! Blob storage backends for the media pipeline.
//!
//! The pipeline addresses raw and derived media bytes through the
//! [`BlobStore`] trait; keys are opaque strings assigned at upload time.

mod memory;
#[cfg(feature = "storage-s3")]
mod s3;
mod traits;

pub use memory::MemoryBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{BlobStore, StorageError, StorageResult};
