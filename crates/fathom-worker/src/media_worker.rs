//! Core processing orchestration: one media item per job, driven from
//! `uploaded` through `processing` to `processed` or `failed`.

use std::sync::Arc;

use uuid::Uuid;

use fathom_core::models::{
    Media, MediaDetailsUpdate, MediaStatus, ProcessedVersion, ProcessedVersions,
};
use fathom_core::ProcessingFailure;
use fathom_processing::{MediaCodec, MediaProcessor};
use fathom_storage::BlobStore;

use crate::media_store::MediaStore;

/// Drives one media item end-to-end: fetch metadata, download the raw blob,
/// decode, run the processing transforms, upload derived assets, and
/// persist the terminal status.
///
/// Failures in download/decode/processing are classified data, not control
/// flow: they land in the `failed` status with `error_details`, and never
/// escape [`MediaWorker::process_media`], so one bad message cannot abort a
/// batch. Re-running a job is safe: derived keys are deterministic per
/// media id and the terminal update is last-write-wins.
#[derive(Clone)]
pub struct MediaWorker {
    store: Arc<dyn MediaStore>,
    blobs: Arc<dyn BlobStore>,
    codec: MediaCodec,
    processor: MediaProcessor,
}

struct ProcessedOutcome {
    details: MediaDetailsUpdate,
    version_count: usize,
}

impl MediaWorker {
    pub fn new(
        store: Arc<dyn MediaStore>,
        blobs: Arc<dyn BlobStore>,
        processor: MediaProcessor,
    ) -> Self {
        Self {
            store,
            blobs,
            codec: MediaCodec::new(),
            processor,
        }
    }

    /// Process one uploaded media item.
    ///
    /// A missing row or missing storage key abandons the job without a
    /// status transition; everything after that resolves to `processed` or
    /// `failed`.
    #[tracing::instrument(skip(self))]
    pub async fn process_media(&self, media_id: Uuid) {
        tracing::info!(media_id = %media_id, "Starting media processing");

        let media = match self.store.get_media(media_id).await {
            Ok(Some(media)) => media,
            Ok(None) => {
                // Stale or duplicate event; expected under at-least-once delivery.
                tracing::info!(media_id = %media_id, "No media row found, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(media_id = %media_id, error = %e, "Failed to fetch media row");
                return;
            }
        };

        if media.storage_key.is_empty() {
            tracing::error!(media_id = %media_id, "Media row has no storage key, abandoning job");
            return;
        }

        if let Err(e) = self
            .store
            .set_status(media_id, MediaStatus::Processing)
            .await
        {
            tracing::error!(media_id = %media_id, error = %e, "Failed to mark media as processing");
            return;
        }

        match self.run_pipeline(&media).await {
            Ok(outcome) => {
                if let Err(e) = self
                    .store
                    .set_status_with_details(media_id, MediaStatus::Processed, outcome.details)
                    .await
                {
                    tracing::error!(media_id = %media_id, error = %e, "Failed to persist processed state");
                    return;
                }
                tracing::info!(
                    media_id = %media_id,
                    versions = outcome.version_count,
                    "Media processed successfully"
                );
            }
            Err(failure) => {
                tracing::warn!(
                    media_id = %media_id,
                    stage = failure.stage.as_str(),
                    error = %failure.message,
                    "Media processing failed"
                );
                let details = MediaDetailsUpdate::new()
                    .error_details(failure.to_string())
                    .clear_processed_versions();
                if let Err(e) = self
                    .store
                    .set_status_with_details(media_id, MediaStatus::Failed, details)
                    .await
                {
                    tracing::error!(media_id = %media_id, error = %e, "Failed to persist failed state");
                }
            }
        }
    }

    async fn run_pipeline(&self, media: &Media) -> Result<ProcessedOutcome, ProcessingFailure> {
        let raw = self
            .blobs
            .download(&media.storage_key)
            .await
            .map_err(ProcessingFailure::download)?;

        // Decode and the transforms are CPU-bound; keep them off the async pool.
        let codec = self.codec;
        let processor = self.processor.clone();
        let media_type = media.media_type;
        let (thumbnails, optimization, metadata) = tokio::task::spawn_blocking(move || {
            let decoded = codec
                .decode(&raw, media_type)
                .map_err(ProcessingFailure::decode)?;
            let thumbnails = processor.generate_thumbnails(&decoded);
            let optimization = processor.optimize_format(&decoded);
            let metadata = processor.extract_metadata(&decoded);
            Ok::<_, ProcessingFailure>((thumbnails, optimization, metadata))
        })
        .await
        .map_err(ProcessingFailure::transform)??;

        if thumbnails.is_empty() {
            return Err(ProcessingFailure::transform(
                "thumbnail generation produced no renditions",
            ));
        }

        let mut versions = ProcessedVersions::default();
        for thumbnail in thumbnails.thumbnails {
            let storage_key = format!("derived/{}/{}.jpg", media.id, thumbnail.name);
            self.blobs
                .put(&storage_key, thumbnail.data, thumbnail.content_type)
                .await
                .map_err(ProcessingFailure::transform)?;
            versions.insert(
                thumbnail.name,
                ProcessedVersion {
                    storage_key,
                    width: thumbnail.width,
                    height: thumbnail.height,
                    content_type: thumbnail.content_type.to_string(),
                },
            );
        }

        if let Some(optimized) = optimization.data {
            let storage_key = format!("derived/{}/optimized.jpg", media.id);
            self.blobs
                .put(&storage_key, optimized, optimization.content_type)
                .await
                .map_err(ProcessingFailure::transform)?;
            if let Some((width, height)) = metadata.width.zip(metadata.height) {
                versions.insert(
                    "optimized",
                    ProcessedVersion {
                        storage_key,
                        width,
                        height,
                        content_type: optimization.content_type.to_string(),
                    },
                );
            }
        }

        let version_count = versions.len();
        let mut details = MediaDetailsUpdate::new()
            .mime_type(metadata.mime_type)
            .file_size_bytes(metadata.size_bytes as i64)
            .processed_versions(versions)
            .clear_error_details();
        if let Some(width) = metadata.width {
            details = details.width(width as i32);
        }
        if let Some(height) = metadata.height {
            details = details.height(height as i32);
        }
        if let Some(duration) = metadata.duration_seconds {
            details = details.duration_seconds(duration);
        }
        if let Some(taken_at) = metadata.taken_at {
            details = details.taken_at(taken_at);
        }
        if let Some(exif) = metadata.exif {
            details = details.exif(exif);
        }

        Ok(ProcessedOutcome {
            details,
            version_count,
        })
    }
}
