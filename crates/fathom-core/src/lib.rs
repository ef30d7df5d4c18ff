//! Fathom core: domain models, typed events, and configuration shared by
//! the media pipeline crates.

pub mod config;
pub mod events;
pub mod models;
pub mod processing_failure;

pub use config::Config;
pub use events::{MediaUploadedEvent, Topic};
pub use processing_failure::{FailureStage, ProcessingFailure};
