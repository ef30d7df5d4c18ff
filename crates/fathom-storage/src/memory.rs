use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::traits::{BlobStore, StorageError, StorageResult};

/// In-memory blob store for tests and local development.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, (Bytes, String)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, bypassing the upload path.
    pub async fn insert(&self, storage_key: impl Into<String>, data: Vec<u8>, content_type: &str) {
        self.objects.write().await.insert(
            storage_key.into(),
            (Bytes::from(data), content_type.to_string()),
        );
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(storage_key)
            .map(|(data, _)| data.to_vec())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn put(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        if storage_key.is_empty() {
            return Err(StorageError::InvalidKey("empty storage key".to_string()));
        }
        self.objects.write().await.insert(
            storage_key.to_string(),
            (Bytes::from(data), content_type.to_string()),
        );
        Ok(())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(storage_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryBlobStore::new();
        store
            .put("uploads/a.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        assert!(store.exists("uploads/a.jpg").await.unwrap());
        assert_eq!(store.download("uploads/a.jpg").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let store = MemoryBlobStore::new();
        match store.download("uploads/missing.jpg").await {
            Err(StorageError::NotFound(key)) => assert_eq!(key, "uploads/missing.jpg"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        store
            .put("uploads/a.jpg", vec![1], "image/jpeg")
            .await
            .unwrap();
        store.delete("uploads/a.jpg").await.unwrap();
        store.delete("uploads/a.jpg").await.unwrap();
        assert!(!store.exists("uploads/a.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryBlobStore::new();
        store
            .put("uploads/a.jpg", vec![1], "image/jpeg")
            .await
            .unwrap();
        store
            .put("uploads/a.jpg", vec![2, 2], "image/png")
            .await
            .unwrap();
        assert_eq!(store.download("uploads/a.jpg").await.unwrap(), vec![2, 2]);
        assert_eq!(store.len().await, 1);
    }
}
