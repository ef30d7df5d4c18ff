//! Typed partial update for media rows.
//!
//! Each optional column is a tri-state [`Field`]: left alone, set to a new
//! value, or explicitly cleared to NULL. This makes "field present but null"
//! vs "field absent" a compile-time distinction instead of a runtime map
//! lookup.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::media::ProcessedVersions;

/// Tri-state update field.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    /// Leave the column untouched.
    #[default]
    Absent,
    /// Write the new value.
    Set(T),
    /// Write NULL.
    Clear,
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    /// The value to bind for the column: `Some(v)` for `Set`, `None` for
    /// `Clear`. Must not be called on `Absent` fields; the update builder
    /// only binds fields that are present.
    pub fn into_bind(self) -> Option<T> {
        match self {
            Field::Set(v) => Some(v),
            Field::Clear => None,
            Field::Absent => None,
        }
    }
}

/// Partial update of a media row. Only non-absent fields reach the UPDATE
/// statement; applying an empty update is a no-op.
#[derive(Debug, Clone, Default)]
pub struct MediaDetailsUpdate {
    pub dive_log_id: Field<Uuid>,
    pub mime_type: Field<String>,
    pub file_size_bytes: Field<i64>,
    pub width: Field<i32>,
    pub height: Field<i32>,
    pub duration_seconds: Field<f64>,
    pub taken_at: Field<DateTime<Utc>>,
    pub exif: Field<JsonValue>,
    pub processed_versions: Field<ProcessedVersions>,
    pub description: Field<String>,
    pub error_details: Field<String>,
}

impl MediaDetailsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dive_log_id(mut self, id: Uuid) -> Self {
        self.dive_log_id = Field::Set(id);
        self
    }

    pub fn clear_dive_log_id(mut self) -> Self {
        self.dive_log_id = Field::Clear;
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Field::Set(mime.into());
        self
    }

    pub fn file_size_bytes(mut self, size: i64) -> Self {
        self.file_size_bytes = Field::Set(size);
        self
    }

    pub fn width(mut self, width: i32) -> Self {
        self.width = Field::Set(width);
        self
    }

    pub fn height(mut self, height: i32) -> Self {
        self.height = Field::Set(height);
        self
    }

    pub fn duration_seconds(mut self, duration: f64) -> Self {
        self.duration_seconds = Field::Set(duration);
        self
    }

    pub fn taken_at(mut self, at: DateTime<Utc>) -> Self {
        self.taken_at = Field::Set(at);
        self
    }

    pub fn exif(mut self, exif: JsonValue) -> Self {
        self.exif = Field::Set(exif);
        self
    }

    pub fn processed_versions(mut self, versions: ProcessedVersions) -> Self {
        self.processed_versions = Field::Set(versions);
        self
    }

    pub fn clear_processed_versions(mut self) -> Self {
        self.processed_versions = Field::Clear;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Field::Set(description.into());
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Field::Clear;
        self
    }

    pub fn error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Field::Set(details.into());
        self
    }

    pub fn clear_error_details(mut self) -> Self {
        self.error_details = Field::Clear;
        self
    }

    /// True when no field would be written.
    pub fn is_empty(&self) -> bool {
        self.dive_log_id.is_absent()
            && self.mime_type.is_absent()
            && self.file_size_bytes.is_absent()
            && self.width.is_absent()
            && self.height.is_absent()
            && self.duration_seconds.is_absent()
            && self.taken_at.is_absent()
            && self.exif.is_absent()
            && self.processed_versions.is_absent()
            && self.description.is_absent()
            && self.error_details.is_absent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_update_is_empty() {
        assert!(MediaDetailsUpdate::new().is_empty());
    }

    #[test]
    fn test_set_vs_clear_vs_absent() {
        let update = MediaDetailsUpdate::new()
            .width(1920)
            .clear_error_details();

        assert_eq!(update.width, Field::Set(1920));
        assert_eq!(update.error_details, Field::Clear);
        assert!(update.height.is_absent());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_into_bind() {
        assert_eq!(Field::Set(5).into_bind(), Some(5));
        assert_eq!(Field::<i32>::Clear.into_bind(), None);
    }
}
