//! Pure media transforms for the pipeline: decoding, thumbnail generation,
//! format optimization, and metadata extraction.
//!
//! Nothing in this crate performs I/O or holds shared state; every type is
//! safe to call concurrently from multiple worker jobs.

mod bmff;
mod codec;
mod processor;

pub use codec::{CodecError, DecodedMedia, MediaCodec, VideoInfo};
pub use processor::{
    MediaMetadata, MediaProcessor, OptimizationResult, Thumbnail, ThumbnailSet,
};
