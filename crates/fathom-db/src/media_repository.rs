use sqlx::PgConnection;
use uuid::Uuid;

use fathom_core::models::{Media, MediaDetailsUpdate, MediaSpeciesTag, MediaStatus, MediaType};

use crate::error::RepositoryError;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

/// Fields for a new media row. Status is always forced to `pending`.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub user_id: Uuid,
    pub storage_key: String,
    pub media_type: MediaType,
    pub dive_log_id: Option<Uuid>,
    pub mime_type: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub description: Option<String>,
}

impl NewMedia {
    pub fn new(user_id: Uuid, storage_key: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            user_id,
            storage_key: storage_key.into(),
            media_type,
            dive_log_id: None,
            mime_type: None,
            file_size_bytes: None,
            description: None,
        }
    }
}

/// Optional type filter and pagination for list queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaFilter {
    pub media_type: Option<MediaType>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// CRUD over media rows and their species tags.
///
/// Every method takes an explicit connection handle and never commits;
/// callers wrap one logical unit of work in a transaction (see
/// [`crate::with_transaction`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaRepository;

impl MediaRepository {
    pub fn new() -> Self {
        Self
    }

    /// Insert a new media row with `status = pending` and return its id.
    ///
    /// A `user_id` (or `dive_log_id`) that does not reference an existing
    /// row surfaces as [`RepositoryError::ConstraintViolation`].
    #[tracing::instrument(skip(self, conn, new), fields(user_id = %new.user_id))]
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        new: NewMedia,
    ) -> Result<Uuid, RepositoryError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO media (
                user_id, dive_log_id, status, storage_key, media_type,
                mime_type, file_size_bytes, description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(new.user_id)
        .bind(new.dive_log_id)
        .bind(MediaStatus::Pending)
        .bind(&new.storage_key)
        .bind(new.media_type)
        .bind(new.mime_type.as_deref())
        .bind(new.file_size_bytes)
        .bind(new.description.as_deref())
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(media_id = %id, "Media row created");

        Ok(id)
    }

    #[tracing::instrument(skip(self, conn))]
    pub async fn get_by_id(
        &self,
        conn: &mut PgConnection,
        media_id: Uuid,
    ) -> Result<Option<Media>, RepositoryError> {
        let media = sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = $1")
            .bind(media_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(media)
    }

    /// Fetch several media rows in one query; missing ids are silently
    /// skipped.
    #[tracing::instrument(skip(self, conn, media_ids))]
    pub async fn get_by_ids(
        &self,
        conn: &mut PgConnection,
        media_ids: &[Uuid],
    ) -> Result<Vec<Media>, RepositoryError> {
        if media_ids.is_empty() {
            return Ok(Vec::new());
        }

        let media = sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = ANY($1)")
            .bind(media_ids)
            .fetch_all(&mut *conn)
            .await?;

        Ok(media)
    }

    /// A user's media, newest first, with optional type filter and
    /// pagination.
    #[tracing::instrument(skip(self, conn))]
    pub async fn get_by_user(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        filter: MediaFilter,
    ) -> Result<Vec<Media>, RepositoryError> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = filter.offset.unwrap_or(0);

        let media = match filter.media_type {
            Some(media_type) => {
                sqlx::query_as::<_, Media>(
                    r#"
                    SELECT * FROM media
                    WHERE user_id = $1 AND media_type = $2
                    ORDER BY created_at DESC
                    LIMIT $3 OFFSET $4
                    "#,
                )
                .bind(user_id)
                .bind(media_type)
                .bind(limit)
                .bind(offset)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, Media>(
                    r#"
                    SELECT * FROM media
                    WHERE user_id = $1
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&mut *conn)
                .await?
            }
        };

        Ok(media)
    }

    /// Media attached to a dive log, newest first.
    #[tracing::instrument(skip(self, conn))]
    pub async fn get_by_dive_log(
        &self,
        conn: &mut PgConnection,
        dive_log_id: Uuid,
        media_type: Option<MediaType>,
    ) -> Result<Vec<Media>, RepositoryError> {
        let media = match media_type {
            Some(media_type) => {
                sqlx::query_as::<_, Media>(
                    r#"
                    SELECT * FROM media
                    WHERE dive_log_id = $1 AND media_type = $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(dive_log_id)
                .bind(media_type)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, Media>(
                    r#"
                    SELECT * FROM media
                    WHERE dive_log_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(dive_log_id)
                .fetch_all(&mut *conn)
                .await?
            }
        };

        Ok(media)
    }

    /// A user's media carrying a given species tag, newest first.
    #[tracing::instrument(skip(self, conn))]
    pub async fn get_by_species_tag(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        species_id: Uuid,
        filter: MediaFilter,
    ) -> Result<Vec<Media>, RepositoryError> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = filter.offset.unwrap_or(0);

        let media = match filter.media_type {
            Some(media_type) => {
                sqlx::query_as::<_, Media>(
                    r#"
                    SELECT m.* FROM media m
                    JOIN media_species_tags t ON t.media_id = m.id
                    WHERE m.user_id = $1 AND t.species_id = $2 AND m.media_type = $3
                    ORDER BY m.created_at DESC
                    LIMIT $4 OFFSET $5
                    "#,
                )
                .bind(user_id)
                .bind(species_id)
                .bind(media_type)
                .bind(limit)
                .bind(offset)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, Media>(
                    r#"
                    SELECT m.* FROM media m
                    JOIN media_species_tags t ON t.media_id = m.id
                    WHERE m.user_id = $1 AND t.species_id = $2
                    ORDER BY m.created_at DESC
                    LIMIT $3 OFFSET $4
                    "#,
                )
                .bind(user_id)
                .bind(species_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&mut *conn)
                .await?
            }
        };

        Ok(media)
    }

    /// Species tags on a media item, most recent first.
    #[tracing::instrument(skip(self, conn))]
    pub async fn get_species_tags(
        &self,
        conn: &mut PgConnection,
        media_id: Uuid,
    ) -> Result<Vec<MediaSpeciesTag>, RepositoryError> {
        let tags = sqlx::query_as::<_, MediaSpeciesTag>(
            r#"
            SELECT media_id, species_id, source, tagged_at, model_confidence
            FROM media_species_tags
            WHERE media_id = $1
            ORDER BY tagged_at DESC
            "#,
        )
        .bind(media_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(tags)
    }

    /// Update the processing status. A missing id is a no-op, not an error.
    #[tracing::instrument(skip(self, conn))]
    pub async fn update_status(
        &self,
        conn: &mut PgConnection,
        media_id: Uuid,
        status: MediaStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE media SET status = $2, updated_at = now() WHERE id = $1")
            .bind(media_id)
            .bind(status)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(media_id = %media_id, "update_status matched no row");
        }

        Ok(())
    }

    /// Apply a typed partial update. Only set/cleared fields reach the
    /// statement; a missing id is a no-op.
    #[tracing::instrument(skip(self, conn, update))]
    pub async fn update_details(
        &self,
        conn: &mut PgConnection,
        media_id: Uuid,
        update: MediaDetailsUpdate,
    ) -> Result<(), RepositoryError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut sql = String::from("UPDATE media SET updated_at = now()");
        let mut bind_count = 2; // $1 is the media id

        let mut push = |column: &str, sql: &mut String| {
            sql.push_str(&format!(", {} = ${}", column, bind_count));
            bind_count += 1;
        };

        if !update.dive_log_id.is_absent() {
            push("dive_log_id", &mut sql);
        }
        if !update.mime_type.is_absent() {
            push("mime_type", &mut sql);
        }
        if !update.file_size_bytes.is_absent() {
            push("file_size_bytes", &mut sql);
        }
        if !update.width.is_absent() {
            push("width", &mut sql);
        }
        if !update.height.is_absent() {
            push("height", &mut sql);
        }
        if !update.duration_seconds.is_absent() {
            push("duration_seconds", &mut sql);
        }
        if !update.taken_at.is_absent() {
            push("taken_at", &mut sql);
        }
        if !update.exif.is_absent() {
            push("exif", &mut sql);
        }
        if !update.processed_versions.is_absent() {
            push("processed_versions", &mut sql);
        }
        if !update.description.is_absent() {
            push("description", &mut sql);
        }
        if !update.error_details.is_absent() {
            push("error_details", &mut sql);
        }

        sql.push_str(" WHERE id = $1");

        let mut query = sqlx::query(&sql).bind(media_id);

        if !update.dive_log_id.is_absent() {
            query = query.bind(update.dive_log_id.into_bind());
        }
        if !update.mime_type.is_absent() {
            query = query.bind(update.mime_type.into_bind());
        }
        if !update.file_size_bytes.is_absent() {
            query = query.bind(update.file_size_bytes.into_bind());
        }
        if !update.width.is_absent() {
            query = query.bind(update.width.into_bind());
        }
        if !update.height.is_absent() {
            query = query.bind(update.height.into_bind());
        }
        if !update.duration_seconds.is_absent() {
            query = query.bind(update.duration_seconds.into_bind());
        }
        if !update.taken_at.is_absent() {
            query = query.bind(update.taken_at.into_bind());
        }
        if !update.exif.is_absent() {
            query = query.bind(update.exif.into_bind());
        }
        if !update.processed_versions.is_absent() {
            query = query.bind(
                update
                    .processed_versions
                    .into_bind()
                    .map(|v| v.to_json_value()),
            );
        }
        if !update.description.is_absent() {
            query = query.bind(update.description.into_bind());
        }
        if !update.error_details.is_absent() {
            query = query.bind(update.error_details.into_bind());
        }

        query.execute(&mut *conn).await?;

        Ok(())
    }

    /// Delete a media row. Species tags cascade with it. Returns whether a
    /// row was removed.
    #[tracing::instrument(skip(self, conn))]
    pub async fn delete(
        &self,
        conn: &mut PgConnection,
        media_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(media_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
