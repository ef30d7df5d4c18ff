//! Media decoding with a declared-format hint.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader};
use thiserror::Error;

use fathom_core::models::MediaType;

use crate::bmff;
pub use crate::bmff::VideoInfo;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty input")]
    EmptyInput,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),
}

/// In-memory decoded representation, input to the processing transforms.
pub enum DecodedMedia {
    Image {
        image: DynamicImage,
        format: ImageFormat,
        /// Original encoded bytes, retained for EXIF extraction.
        raw: Vec<u8>,
    },
    Video {
        info: VideoInfo,
        size_bytes: u64,
    },
}

impl DecodedMedia {
    pub fn media_type(&self) -> MediaType {
        match self {
            DecodedMedia::Image { .. } => MediaType::Image,
            DecodedMedia::Video { .. } => MediaType::Video,
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            DecodedMedia::Image { image, .. } => Some((image.width(), image.height())),
            DecodedMedia::Video { info, .. } => {
                (info.width > 0 && info.height > 0).then_some((info.width, info.height))
            }
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DecodedMedia::Image { format, .. } => format.to_mime_type(),
            DecodedMedia::Video { .. } => "video/mp4",
        }
    }
}

/// Decodes raw bytes into a [`DecodedMedia`] using the media's declared
/// type as the format hint. Stateless and safe to share across jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaCodec;

impl MediaCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, data: &[u8], media_type: MediaType) -> Result<DecodedMedia, CodecError> {
        if data.is_empty() {
            return Err(CodecError::EmptyInput);
        }

        match media_type {
            MediaType::Image => self.decode_image(data),
            MediaType::Video => self.decode_video(data),
        }
    }

    fn decode_image(&self, data: &[u8]) -> Result<DecodedMedia, CodecError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| CodecError::DecodeFailed(e.to_string()))?;

        let format = reader
            .format()
            .ok_or_else(|| CodecError::UnsupportedFormat("unrecognized image bytes".to_string()))?;

        let image = reader
            .decode()
            .map_err(|e| CodecError::DecodeFailed(e.to_string()))?;

        Ok(DecodedMedia::Image {
            image,
            format,
            raw: data.to_vec(),
        })
    }

    fn decode_video(&self, data: &[u8]) -> Result<DecodedMedia, CodecError> {
        let info = bmff::probe(data).map_err(|e| match e {
            bmff::ProbeError::NotBmff => {
                CodecError::UnsupportedFormat("not an ISO BMFF container".to_string())
            }
            other => CodecError::DecodeFailed(other.to_string()),
        })?;

        Ok(DecodedMedia::Video {
            info,
            size_bytes: data.len() as u64,
        })
    }
}
