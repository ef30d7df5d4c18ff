//! The worker's seam over the media repository.
//!
//! Each call runs in its own transactional scope; nothing is shared across
//! concurrent jobs.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use fathom_core::models::{Media, MediaDetailsUpdate, MediaStatus};
use fathom_db::{with_transaction, MediaRepository, RepositoryError};

/// Persistence operations the worker needs from the data layer.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn get_media(&self, media_id: Uuid) -> Result<Option<Media>>;

    async fn set_status(&self, media_id: Uuid, status: MediaStatus) -> Result<()>;

    /// Apply a status transition and a details merge as one logical update.
    async fn set_status_with_details(
        &self,
        media_id: Uuid,
        status: MediaStatus,
        details: MediaDetailsUpdate,
    ) -> Result<()>;
}

/// Postgres-backed [`MediaStore`].
#[derive(Clone)]
pub struct PgMediaStore {
    pool: PgPool,
    repo: MediaRepository,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            repo: MediaRepository::new(),
        }
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn get_media(&self, media_id: Uuid) -> Result<Option<Media>> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.repo.get_by_id(&mut conn, media_id).await?)
    }

    async fn set_status(&self, media_id: Uuid, status: MediaStatus) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.repo.update_status(&mut conn, media_id, status).await?)
    }

    async fn set_status_with_details(
        &self,
        media_id: Uuid,
        status: MediaStatus,
        details: MediaDetailsUpdate,
    ) -> Result<()> {
        let repo = self.repo;
        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                repo.update_details(&mut **tx, media_id, details).await?;
                repo.update_status(&mut **tx, media_id, status).await?;
                Ok::<_, RepositoryError>(())
            })
        })
        .await
    }
}
