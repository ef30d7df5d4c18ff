//! Classified processing failures.
//!
//! `process_media` reports failure as data rather than an escaping error:
//! the stage classification drives the FAILED status transition and the
//! `error_details` text persisted with it.

use std::fmt;

/// Pipeline stage where a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Blob download (missing object, transport error).
    Download,
    /// Codec could not produce a decoded representation.
    Decode,
    /// A processing transform or derived-asset upload failed.
    Transform,
    /// The terminal status/details write failed.
    Persist,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Download => "download",
            FailureStage::Decode => "decode",
            FailureStage::Transform => "transform",
            FailureStage::Persist => "persist",
        }
    }
}

/// A failed processing job: which stage broke and a human-readable cause,
/// persisted verbatim into `error_details`.
#[derive(Debug, Clone)]
pub struct ProcessingFailure {
    pub stage: FailureStage,
    pub message: String,
}

impl ProcessingFailure {
    pub fn download(err: impl fmt::Display) -> Self {
        Self {
            stage: FailureStage::Download,
            message: err.to_string(),
        }
    }

    pub fn decode(err: impl fmt::Display) -> Self {
        Self {
            stage: FailureStage::Decode,
            message: err.to_string(),
        }
    }

    pub fn transform(err: impl fmt::Display) -> Self {
        Self {
            stage: FailureStage::Transform,
            message: err.to_string(),
        }
    }

    pub fn persist(err: impl fmt::Display) -> Self {
        Self {
            stage: FailureStage::Persist,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ProcessingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage.as_str(), self.message)
    }
}

impl std::error::Error for ProcessingFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_stage_and_cause() {
        let failure = ProcessingFailure::download("blob not found: uploads/x.jpg");
        assert_eq!(failure.stage, FailureStage::Download);
        assert_eq!(
            failure.to_string(),
            "download failed: blob not found: uploads/x.jpg"
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(FailureStage::Decode.as_str(), "decode");
        assert_eq!(FailureStage::Transform.as_str(), "transform");
    }
}
