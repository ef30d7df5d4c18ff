//! Typed event-stream topics and payloads.
//!
//! Dispatch is an exhaustive match over [`Topic`] rather than raw topic
//! strings; payloads deserialize into typed structs and tolerate unknown
//! fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topics this pipeline subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// An upload finished and the raw object is in the blob store.
    MediaUploaded,
}

impl Topic {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Topic::MediaUploaded => "media-uploaded",
        }
    }

    /// Resolve a broker topic name. Unknown names are not an error; the
    /// caller logs and skips the batch.
    pub fn from_name(name: &str) -> Option<Topic> {
        match name {
            "media-uploaded" => Some(Topic::MediaUploaded),
            _ => None,
        }
    }

    /// All topic names this pipeline subscribes to.
    pub fn subscribed() -> &'static [&'static str] {
        &["media-uploaded"]
    }
}

/// Payload of a `media-uploaded` message.
///
/// A payload that fails to deserialize (missing or malformed `media_id`) is
/// a skip condition, never an error that aborts the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUploadedEvent {
    pub media_id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}
