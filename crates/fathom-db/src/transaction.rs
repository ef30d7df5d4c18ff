//! Transaction boundary helper.
//!
//! The repository never commits; one logical unit of work (e.g. a single
//! processing job's writes) runs inside a closure passed here.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Transaction};

/// Execute a closure within a database transaction, committing on success
/// and rolling back on error.
///
/// # Example
///
/// ```ignore
/// use fathom_db::{with_transaction, MediaRepository};
///
/// async fn example(pool: &sqlx::PgPool) -> anyhow::Result<()> {
///     let repo = MediaRepository::new();
///     with_transaction(pool, |tx| {
///         Box::pin(async move {
///             repo.update_status(tx, id, MediaStatus::Processed).await?;
///             Ok::<_, fathom_db::RepositoryError>(())
///         })
///     })
///     .await
/// }
/// ```
pub async fn with_transaction<F, R, E>(pool: &PgPool, f: F) -> Result<R>
where
    F: for<'a> FnOnce(
        &'a mut Transaction<'_, Postgres>,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<R, E>> + Send + 'a>,
    >,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    match f(&mut tx).await {
        Ok(result) => {
            tx.commit().await.context("Failed to commit transaction")?;
            Ok(result)
        }
        Err(e) => {
            tx.rollback().await.ok();
            Err(anyhow::Error::from(e))
        }
    }
}
