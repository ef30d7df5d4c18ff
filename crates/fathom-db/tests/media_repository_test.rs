//! MediaRepository tests covering CRUD semantics, miss behavior, ordering,
//! and cascade deletion.

use sqlx::PgPool;
use uuid::Uuid;

use fathom_core::models::{
    MediaDetailsUpdate, MediaStatus, MediaType, ProcessedVersion, ProcessedVersions,
    SpeciesTagSource,
};
use fathom_db::{MediaFilter, MediaRepository, NewMedia, RepositoryError};

async fn create_test_user(pool: &PgPool) -> Uuid {
    let suffix = Uuid::new_v4().simple().to_string();
    sqlx::query_scalar("INSERT INTO users (email, username) VALUES ($1, $2) RETURNING id")
        .bind(format!("{}@example.com", &suffix[..8]))
        .bind(format!("user_{}", &suffix[..8]))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn create_test_dive_log(pool: &PgPool, user_id: Uuid) -> Uuid {
    sqlx::query_scalar("INSERT INTO dive_logs (user_id, dive_title) VALUES ($1, $2) RETURNING id")
        .bind(user_id)
        .bind("Test Dive")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn create_test_species(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO species (ml_label, scientific_name, common_name)
        VALUES ($1, 'Testus speciesus', 'Test Fish')
        RETURNING id
        "#,
    )
    .bind(format!("species_{}", Uuid::new_v4().simple()))
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn create_test_media(pool: &PgPool, user_id: Uuid) -> Uuid {
    let mut conn = pool.acquire().await.unwrap();
    MediaRepository::new()
        .create(
            &mut conn,
            NewMedia::new(
                user_id,
                format!("uploads/{}.jpg", Uuid::new_v4().simple()),
                MediaType::Image,
            ),
        )
        .await
        .unwrap()
}

async fn create_test_tag(pool: &PgPool, media_id: Uuid, species_id: Uuid) {
    sqlx::query(
        "INSERT INTO media_species_tags (media_id, species_id, source) VALUES ($1, $2, $3)",
    )
    .bind(media_id)
    .bind(species_id)
    .bind(SpeciesTagSource::User)
    .execute(pool)
    .await
    .unwrap();
}

/// Force a deterministic created_at so ordering tests don't depend on clock
/// resolution.
async fn backdate(pool: &PgPool, media_id: Uuid, seconds_ago: i64) {
    sqlx::query("UPDATE media SET created_at = now() - make_interval(secs => $2) WHERE id = $1")
        .bind(media_id)
        .bind(seconds_ago as f64)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn create_sets_status_pending(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    let id = repo
        .create(
            &mut conn,
            NewMedia::new(user_id, "uploads/x.jpg", MediaType::Image),
        )
        .await
        .unwrap();

    let media = repo.get_by_id(&mut conn, id).await.unwrap().unwrap();
    assert_eq!(media.status, MediaStatus::Pending);
    assert_eq!(media.storage_key, "uploads/x.jpg");
    assert_eq!(media.media_type, MediaType::Image);
    assert!(media.processed_versions.is_none());
    assert!(media.error_details.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn create_with_unknown_user_is_constraint_violation(pool: PgPool) {
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    let result = repo
        .create(
            &mut conn,
            NewMedia::new(Uuid::new_v4(), "uploads/x.jpg", MediaType::Image),
        )
        .await;

    assert!(matches!(
        result,
        Err(RepositoryError::ConstraintViolation(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn get_by_id_miss_is_none(pool: PgPool) {
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    let media = repo.get_by_id(&mut conn, Uuid::new_v4()).await.unwrap();
    assert!(media.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn update_status_miss_is_noop(pool: PgPool) {
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    repo.update_status(&mut conn, Uuid::new_v4(), MediaStatus::Processed)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn update_status_transitions(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let media_id = create_test_media(&pool, user_id).await;
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    repo.update_status(&mut conn, media_id, MediaStatus::Processing)
        .await
        .unwrap();

    let media = repo.get_by_id(&mut conn, media_id).await.unwrap().unwrap();
    assert_eq!(media.status, MediaStatus::Processing);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_details_set_clear_absent(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let media_id = create_test_media(&pool, user_id).await;
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    repo.update_details(
        &mut conn,
        media_id,
        MediaDetailsUpdate::new()
            .width(1920)
            .height(1080)
            .mime_type("image/jpeg")
            .description("reef wall"),
    )
    .await
    .unwrap();

    // Clearing one field leaves the set ones alone; absent fields stay put.
    repo.update_details(
        &mut conn,
        media_id,
        MediaDetailsUpdate::new().clear_description(),
    )
    .await
    .unwrap();

    let media = repo.get_by_id(&mut conn, media_id).await.unwrap().unwrap();
    assert_eq!(media.width, Some(1920));
    assert_eq!(media.height, Some(1080));
    assert_eq!(media.mime_type.as_deref(), Some("image/jpeg"));
    assert!(media.description.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn update_details_persists_processed_versions(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let media_id = create_test_media(&pool, user_id).await;
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    let mut versions = ProcessedVersions::default();
    versions.insert(
        "thumb_256",
        ProcessedVersion {
            storage_key: format!("derived/{}/thumb_256.jpg", media_id),
            width: 256,
            height: 171,
            content_type: "image/jpeg".to_string(),
        },
    );

    repo.update_details(
        &mut conn,
        media_id,
        MediaDetailsUpdate::new().processed_versions(versions.clone()),
    )
    .await
    .unwrap();

    let media = repo.get_by_id(&mut conn, media_id).await.unwrap().unwrap();
    assert_eq!(media.processed_versions_parsed(), versions);
}

#[sqlx::test(migrations = "./migrations")]
async fn update_details_miss_is_noop(pool: PgPool) {
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    repo.update_details(
        &mut conn,
        Uuid::new_v4(),
        MediaDetailsUpdate::new().width(10),
    )
    .await
    .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_returns_whether_row_was_removed(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let media_id = create_test_media(&pool, user_id).await;
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    assert!(repo.delete(&mut conn, media_id).await.unwrap());
    assert!(!repo.delete(&mut conn, media_id).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_cascades_species_tags(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let media_id = create_test_media(&pool, user_id).await;
    let species_id = create_test_species(&pool).await;
    create_test_tag(&pool, media_id, species_id).await;

    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    assert_eq!(
        repo.get_species_tags(&mut conn, media_id).await.unwrap().len(),
        1
    );

    assert!(repo.delete(&mut conn, media_id).await.unwrap());

    let remaining: i64 =
        sqlx::query_scalar("SELECT count(*) FROM media_species_tags WHERE media_id = $1")
            .bind(media_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn get_by_user_orders_newest_first(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let older = create_test_media(&pool, user_id).await;
    let newer = create_test_media(&pool, user_id).await;
    backdate(&pool, older, 120).await;
    backdate(&pool, newer, 30).await;

    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    let media = repo
        .get_by_user(&mut conn, user_id, MediaFilter::default())
        .await
        .unwrap();

    assert_eq!(media.len(), 2);
    assert_eq!(media[0].id, newer);
    assert_eq!(media[1].id, older);
}

#[sqlx::test(migrations = "./migrations")]
async fn get_by_user_applies_type_filter_and_pagination(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    for i in 0..3 {
        let id = repo
            .create(
                &mut conn,
                NewMedia::new(user_id, format!("uploads/{i}.jpg"), MediaType::Image),
            )
            .await
            .unwrap();
        backdate(&pool, id, 100 - i).await;
    }
    repo.create(
        &mut conn,
        NewMedia::new(user_id, "uploads/clip.mp4", MediaType::Video),
    )
    .await
    .unwrap();

    let images = repo
        .get_by_user(
            &mut conn,
            user_id,
            MediaFilter {
                media_type: Some(MediaType::Image),
                limit: None,
                offset: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(images.len(), 3);
    assert!(images.iter().all(|m| m.media_type == MediaType::Image));

    let page = repo
        .get_by_user(
            &mut conn,
            user_id,
            MediaFilter {
                media_type: Some(MediaType::Image),
                limit: Some(2),
                offset: Some(1),
            },
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, images[1].id);
}

#[sqlx::test(migrations = "./migrations")]
async fn get_by_dive_log_filters_by_association(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let dive_log_id = create_test_dive_log(&pool, user_id).await;
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    let attached = repo
        .create(
            &mut conn,
            NewMedia {
                dive_log_id: Some(dive_log_id),
                ..NewMedia::new(user_id, "uploads/a.jpg", MediaType::Image)
            },
        )
        .await
        .unwrap();
    create_test_media(&pool, user_id).await;

    let media = repo
        .get_by_dive_log(&mut conn, dive_log_id, None)
        .await
        .unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].id, attached);
}

#[sqlx::test(migrations = "./migrations")]
async fn get_by_species_tag_joins_through_tags(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let tagged = create_test_media(&pool, user_id).await;
    let _untagged = create_test_media(&pool, user_id).await;
    let species_id = create_test_species(&pool).await;
    create_test_tag(&pool, tagged, species_id).await;

    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    let media = repo
        .get_by_species_tag(&mut conn, user_id, species_id, MediaFilter::default())
        .await
        .unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].id, tagged);
}

#[sqlx::test(migrations = "./migrations")]
async fn get_by_ids_skips_missing(pool: PgPool) {
    let user_id = create_test_user(&pool).await;
    let media_id = create_test_media(&pool, user_id).await;
    let repo = MediaRepository::new();
    let mut conn = pool.acquire().await.unwrap();

    let media = repo
        .get_by_ids(&mut conn, &[media_id, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(media.len(), 1);

    assert!(repo.get_by_ids(&mut conn, &[]).await.unwrap().is_empty());
}
