//! Processing transforms: thumbnails, format optimization, metadata.
//!
//! Each transform is independent and total over any successfully decoded
//! input; none touches I/O or shared state.

use std::io::Cursor;

use chrono::{DateTime, TimeZone, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::codec::DecodedMedia;

const DEFAULT_THUMBNAIL_SIZES: &[u32] = &[256, 1024];
const JPEG_QUALITY: u8 = 85;

/// One generated thumbnail rendition.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// All thumbnails produced for one media item.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailSet {
    pub thumbnails: Vec<Thumbnail>,
}

impl ThumbnailSet {
    pub fn is_empty(&self) -> bool {
        self.thumbnails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.thumbnails.len()
    }
}

/// Outcome of the format-optimization transform. `data` is present only
/// when re-encoding actually shrank the payload.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub original_size_bytes: u64,
    pub optimized_size_bytes: u64,
    pub content_type: &'static str,
    pub data: Option<Vec<u8>>,
}

/// Metadata extracted from a decoded media object.
#[derive(Debug, Clone, Serialize)]
pub struct MediaMetadata {
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_seconds: Option<f64>,
    pub size_bytes: u64,
    pub taken_at: Option<DateTime<Utc>>,
    pub exif: Option<JsonValue>,
}

/// Pure transformation layer over decoded media. Stateless apart from its
/// configuration; safe to invoke concurrently from multiple workers.
#[derive(Debug, Clone)]
pub struct MediaProcessor {
    thumbnail_sizes: Vec<u32>,
}

impl Default for MediaProcessor {
    fn default() -> Self {
        Self {
            thumbnail_sizes: DEFAULT_THUMBNAIL_SIZES.to_vec(),
        }
    }
}

impl MediaProcessor {
    /// `thumbnail_sizes` are bounding-box edge lengths, ascending.
    pub fn new(thumbnail_sizes: Vec<u32>) -> Self {
        if thumbnail_sizes.is_empty() {
            return Self::default();
        }
        Self { thumbnail_sizes }
    }

    /// Generate thumbnail renditions.
    ///
    /// Images produce at least one JPEG thumbnail per configured bounding
    /// box, never upscaled; boxes that collapse to identical dimensions are
    /// emitted once. Videos produce an empty set: frame extraction needs a
    /// real decoder, which the codec's container probe is not.
    pub fn generate_thumbnails(&self, decoded: &DecodedMedia) -> ThumbnailSet {
        let image = match decoded {
            DecodedMedia::Image { image, .. } => image,
            DecodedMedia::Video { .. } => return ThumbnailSet::default(),
        };

        let mut set = ThumbnailSet::default();
        let mut last_dims = None;

        for &size in &self.thumbnail_sizes {
            let (width, height) = fit_within(image.width(), image.height(), size);
            if last_dims == Some((width, height)) {
                continue;
            }

            let filter = select_filter(image.width(), image.height(), width, height);
            let resized = image.resize_exact(width, height, filter);

            match encode_jpeg(&resized) {
                Ok(data) => {
                    set.thumbnails.push(Thumbnail {
                        name: format!("thumb_{}", size),
                        width,
                        height,
                        content_type: "image/jpeg",
                        data,
                    });
                    last_dims = Some((width, height));
                }
                Err(e) => {
                    tracing::warn!(size = size, error = %e, "Thumbnail encode failed, skipping rendition");
                }
            }
        }

        set
    }

    /// Re-encode toward a smaller representation. Identity result when the
    /// input is already the best we can do (including all video input).
    pub fn optimize_format(&self, decoded: &DecodedMedia) -> OptimizationResult {
        match decoded {
            DecodedMedia::Image { image, raw, .. } => {
                let original_size = raw.len() as u64;
                match encode_jpeg(image) {
                    Ok(encoded) if (encoded.len() as u64) < original_size => OptimizationResult {
                        original_size_bytes: original_size,
                        optimized_size_bytes: encoded.len() as u64,
                        content_type: "image/jpeg",
                        data: Some(encoded),
                    },
                    _ => OptimizationResult {
                        original_size_bytes: original_size,
                        optimized_size_bytes: original_size,
                        content_type: decoded.mime_type(),
                        data: None,
                    },
                }
            }
            DecodedMedia::Video { size_bytes, .. } => OptimizationResult {
                original_size_bytes: *size_bytes,
                optimized_size_bytes: *size_bytes,
                content_type: "video/mp4",
                data: None,
            },
        }
    }

    /// Extract dimensions, MIME type, duration, and EXIF fields. EXIF
    /// absence is not an error.
    pub fn extract_metadata(&self, decoded: &DecodedMedia) -> MediaMetadata {
        match decoded {
            DecodedMedia::Image { image, raw, .. } => {
                let (taken_at, exif) = extract_exif(raw);
                MediaMetadata {
                    mime_type: decoded.mime_type().to_string(),
                    width: Some(image.width()),
                    height: Some(image.height()),
                    duration_seconds: None,
                    size_bytes: raw.len() as u64,
                    taken_at,
                    exif,
                }
            }
            DecodedMedia::Video { info, size_bytes } => MediaMetadata {
                mime_type: decoded.mime_type().to_string(),
                width: (info.width > 0).then_some(info.width),
                height: (info.height > 0).then_some(info.height),
                duration_seconds: Some(info.duration_seconds),
                size_bytes: *size_bytes,
                taken_at: None,
                exif: None,
            },
        }
    }
}

/// Scale dimensions to fit a square bounding box without upscaling.
fn fit_within(width: u32, height: u32, bound: u32) -> (u32, u32) {
    let scale = (bound as f32 / width as f32)
        .min(bound as f32 / height as f32)
        .min(1.0);
    let w = ((width as f32 * scale).round() as u32).max(1);
    let h = ((height as f32 * scale).round() as u32).max(1);
    (w, h)
}

/// Pick a resampling filter by downscale ratio: cheap filters for heavy
/// reductions, Lanczos for near-1:1 work.
fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(buffer)
}

/// Best-effort EXIF read from the original encoded bytes. Returns the
/// capture timestamp (DateTimeOriginal) and a flat field map.
fn extract_exif(raw: &[u8]) -> (Option<DateTime<Utc>>, Option<JsonValue>) {
    let reader = exif::Reader::new();
    let parsed = match reader.read_from_container(&mut Cursor::new(raw)) {
        Ok(parsed) => parsed,
        Err(_) => return (None, None),
    };

    let mut fields = serde_json::Map::new();
    for field in parsed.fields().filter(|f| f.ifd_num == exif::In::PRIMARY) {
        fields.insert(
            field.tag.to_string(),
            JsonValue::String(field.display_value().with_unit(field).to_string()),
        );
    }

    let taken_at = parsed
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .and_then(|field| match field.value {
            exif::Value::Ascii(ref v) => v.first().cloned(),
            _ => None,
        })
        .and_then(|ascii| exif::DateTime::from_ascii(&ascii).ok())
        .and_then(|dt| {
            Utc.with_ymd_and_hms(
                dt.year as i32,
                dt.month as u32,
                dt.day as u32,
                dt.hour as u32,
                dt.minute as u32,
                dt.second as u32,
            )
            .single()
        });

    let exif = if fields.is_empty() {
        None
    } else {
        Some(JsonValue::Object(fields))
    };

    (taken_at, exif)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MediaCodec;
    use fathom_core::models::MediaType;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn decoded_png(width: u32, height: u32) -> DecodedMedia {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 120, 200, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        MediaCodec::new()
            .decode(&buffer, MediaType::Image)
            .unwrap()
    }

    fn decoded_video() -> DecodedMedia {
        let data = crate::bmff::tests::minimal_mp4(1000, 42_000, 1920, 1080);
        MediaCodec::new().decode(&data, MediaType::Video).unwrap()
    }

    #[test]
    fn test_thumbnails_fit_bounds_without_upscaling() {
        let processor = MediaProcessor::new(vec![100, 400]);
        let set = processor.generate_thumbnails(&decoded_png(800, 600));

        assert_eq!(set.len(), 2);
        let small = &set.thumbnails[0];
        assert_eq!(small.name, "thumb_100");
        assert_eq!((small.width, small.height), (100, 75));
        let large = &set.thumbnails[1];
        assert_eq!((large.width, large.height), (400, 300));
        assert!(!small.data.is_empty());
    }

    #[test]
    fn test_small_image_yields_one_original_size_thumbnail() {
        let processor = MediaProcessor::new(vec![256, 1024]);
        let set = processor.generate_thumbnails(&decoded_png(40, 30));

        // Both bounding boxes collapse to the original dimensions.
        assert_eq!(set.len(), 1);
        assert_eq!(
            (set.thumbnails[0].width, set.thumbnails[0].height),
            (40, 30)
        );
    }

    #[test]
    fn test_video_thumbnails_are_empty() {
        let processor = MediaProcessor::default();
        assert!(processor.generate_thumbnails(&decoded_video()).is_empty());
    }

    #[test]
    fn test_optimize_shrinks_or_is_identity() {
        let processor = MediaProcessor::default();
        let decoded = decoded_png(600, 600);
        let result = processor.optimize_format(&decoded);

        match result.data {
            Some(ref data) => {
                assert!(result.optimized_size_bytes < result.original_size_bytes);
                assert_eq!(data.len() as u64, result.optimized_size_bytes);
                assert_eq!(result.content_type, "image/jpeg");
            }
            None => assert_eq!(result.optimized_size_bytes, result.original_size_bytes),
        }
    }

    #[test]
    fn test_optimize_video_is_identity() {
        let processor = MediaProcessor::default();
        let result = processor.optimize_format(&decoded_video());
        assert!(result.data.is_none());
        assert_eq!(result.original_size_bytes, result.optimized_size_bytes);
    }

    #[test]
    fn test_extract_metadata_image_without_exif() {
        let processor = MediaProcessor::default();
        let metadata = processor.extract_metadata(&decoded_png(320, 240));

        assert_eq!(metadata.mime_type, "image/png");
        assert_eq!(metadata.width, Some(320));
        assert_eq!(metadata.height, Some(240));
        assert_eq!(metadata.duration_seconds, None);
        // A bare PNG has no EXIF; that is not an error.
        assert!(metadata.exif.is_none());
        assert!(metadata.taken_at.is_none());
    }

    #[test]
    fn test_extract_metadata_video() {
        let processor = MediaProcessor::default();
        let metadata = processor.extract_metadata(&decoded_video());

        assert_eq!(metadata.mime_type, "video/mp4");
        assert_eq!(metadata.width, Some(1920));
        assert_eq!(metadata.height, Some(1080));
        assert_eq!(metadata.duration_seconds, Some(42.0));
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(800, 600, 400), (400, 300));
        assert_eq!(fit_within(600, 800, 400), (300, 400));
        assert_eq!(fit_within(100, 100, 400), (100, 100));
        assert_eq!(fit_within(4000, 10, 400), (400, 1));
    }

    #[test]
    fn test_select_filter_by_ratio() {
        assert_eq!(select_filter(1000, 1000, 100, 100), FilterType::Triangle);
        assert_eq!(select_filter(160, 160, 100, 100), FilterType::CatmullRom);
        assert_eq!(select_filter(110, 110, 100, 100), FilterType::Lanczos3);
    }
}
