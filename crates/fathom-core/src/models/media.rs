use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Processing status of a media item.
///
/// The upload API creates items in `Pending`; the pipeline is the only
/// writer of the `Processed` and `Failed` terminal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Pending,
    Uploading,
    Uploaded,
    Processing,
    Processed,
    Failed,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Pending => "pending",
            MediaStatus::Uploading => "uploading",
            MediaStatus::Uploaded => "uploaded",
            MediaStatus::Processing => "processing",
            MediaStatus::Processed => "processed",
            MediaStatus::Failed => "failed",
        }
    }
}

/// Media type enum, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

/// Origin of a species tag on a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "species_tag_source", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesTagSource {
    User,
    Ml,
}

/// One uploaded photo or video and its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Media {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dive_log_id: Option<Uuid>,
    pub status: MediaStatus,
    pub storage_key: String,
    pub media_type: MediaType,
    pub mime_type: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_seconds: Option<f64>,
    pub taken_at: Option<DateTime<Utc>>,
    pub exif: Option<JsonValue>,
    pub processed_versions: Option<JsonValue>,
    pub description: Option<String>,
    pub error_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Media {
    /// Parse the `processed_versions` JSONB column into its typed form.
    pub fn processed_versions_parsed(&self) -> ProcessedVersions {
        self.processed_versions
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

/// Join row linking a media item to a species catalog entry.
///
/// Composite identity `(media_id, species_id)`; lifecycle is owned by the
/// tagging subsystem, the pipeline only reads these and relies on cascade
/// deletion with the parent media row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MediaSpeciesTag {
    pub media_id: Uuid,
    pub species_id: Uuid,
    pub source: SpeciesTagSource,
    pub tagged_at: DateTime<Utc>,
    pub model_confidence: Option<f64>,
}

/// Descriptor of one derived asset (thumbnail, optimized rendition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedVersion {
    pub storage_key: String,
    pub width: u32,
    pub height: u32,
    pub content_type: String,
}

/// Mapping of derived-asset name (`"thumb_256"`, ...) to its descriptor.
/// Stored in the `processed_versions` JSONB column; non-empty only when the
/// item is `Processed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedVersions(pub BTreeMap<String, ProcessedVersion>);

impl ProcessedVersions {
    pub fn insert(&mut self, name: impl Into<String>, version: ProcessedVersion) {
        self.0.insert(name.into(), version);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&ProcessedVersion> {
        self.0.get(name)
    }

    /// Serialize for the JSONB column.
    pub fn to_json_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_default()
    }
}
