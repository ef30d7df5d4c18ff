//! Minimal ISO BMFF (MP4/MOV) container probe.
//!
//! Walks the top-level box structure for `ftyp` and `moov`, reading the
//! presentation duration from `mvhd` and display dimensions from the track
//! headers. Pure in-memory parsing; unknown boxes are skipped, truncated or
//! non-BMFF input is an error. This is a probe, not a decoder: no sample
//! data is touched.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("not an ISO BMFF container")]
    NotBmff,
    #[error("truncated container: {0}")]
    Truncated(&'static str),
    #[error("no movie header found")]
    MissingMovieHeader,
}

/// Container-level facts about a video file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
    pub major_brand: String,
}

struct BoxHeader {
    box_type: [u8; 4],
    /// Offset of the payload relative to the box start.
    header_len: usize,
    /// Total box size including the header.
    size: usize,
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, ProbeError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ProbeError::Truncated("u32 read past end"))
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64, ProbeError> {
    data.get(offset..offset + 8)
        .map(|b| u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .ok_or(ProbeError::Truncated("u64 read past end"))
}

fn read_header(data: &[u8], offset: usize) -> Result<BoxHeader, ProbeError> {
    let size32 = read_u32(data, offset)? as usize;
    let box_type: [u8; 4] = data
        .get(offset + 4..offset + 8)
        .map(|b| [b[0], b[1], b[2], b[3]])
        .ok_or(ProbeError::Truncated("box type read past end"))?;

    let (size, header_len) = match size32 {
        // size == 0: box extends to end of the buffer
        0 => (data.len() - offset, 8),
        // size == 1: 64-bit largesize follows the type
        1 => {
            let large = read_u64(data, offset + 8)? as usize;
            (large, 16)
        }
        n => (n, 8),
    };

    if size < header_len || offset.checked_add(size).map_or(true, |end| end > data.len()) {
        return Err(ProbeError::Truncated("box size exceeds buffer"));
    }

    Ok(BoxHeader {
        box_type,
        header_len,
        size,
    })
}

/// Find the first child box of the given type within `data`, returning its
/// payload slice.
fn find_box<'a>(data: &'a [u8], box_type: &[u8; 4]) -> Result<Option<&'a [u8]>, ProbeError> {
    let mut offset = 0;
    while offset + 8 <= data.len() {
        let header = read_header(data, offset)?;
        if &header.box_type == box_type {
            return Ok(Some(&data[offset + header.header_len..offset + header.size]));
        }
        offset += header.size;
    }
    Ok(None)
}

/// Collect payload slices of every child box of the given type.
fn find_boxes<'a>(data: &'a [u8], box_type: &[u8; 4]) -> Result<Vec<&'a [u8]>, ProbeError> {
    let mut found = Vec::new();
    let mut offset = 0;
    while offset + 8 <= data.len() {
        let header = read_header(data, offset)?;
        if &header.box_type == box_type {
            found.push(&data[offset + header.header_len..offset + header.size]);
        }
        offset += header.size;
    }
    Ok(found)
}

/// Duration in seconds from an `mvhd` payload.
fn parse_mvhd(payload: &[u8]) -> Result<f64, ProbeError> {
    let version = *payload.first().ok_or(ProbeError::Truncated("empty mvhd"))?;
    // version + flags take 4 bytes; v0 uses 32-bit times, v1 uses 64-bit
    let (timescale, duration) = match version {
        1 => (read_u32(payload, 20)?, read_u64(payload, 24)?),
        _ => (read_u32(payload, 12)?, read_u32(payload, 16)? as u64),
    };
    if timescale == 0 {
        return Ok(0.0);
    }
    Ok(duration as f64 / timescale as f64)
}

/// Display dimensions from a `tkhd` payload (16.16 fixed point).
fn parse_tkhd(payload: &[u8]) -> Result<(u32, u32), ProbeError> {
    let version = *payload.first().ok_or(ProbeError::Truncated("empty tkhd"))?;
    // width/height sit after the transformation matrix, 16.16 fixed point
    let dims_offset = match version {
        1 => 88,
        _ => 76,
    };
    let width = read_u32(payload, dims_offset)? >> 16;
    let height = read_u32(payload, dims_offset + 4)? >> 16;
    Ok((width, height))
}

/// Probe an ISO BMFF buffer for duration and display dimensions.
pub fn probe(data: &[u8]) -> Result<VideoInfo, ProbeError> {
    if data.len() < 12 {
        return Err(ProbeError::NotBmff);
    }

    let first = read_header(data, 0).map_err(|_| ProbeError::NotBmff)?;
    if &first.box_type != b"ftyp" || first.size < first.header_len + 4 {
        return Err(ProbeError::NotBmff);
    }
    let major_brand = String::from_utf8_lossy(&data[first.header_len..first.header_len + 4])
        .trim()
        .to_string();

    let moov = find_box(data, b"moov")?.ok_or(ProbeError::MissingMovieHeader)?;
    let mvhd = find_box(moov, b"mvhd")?.ok_or(ProbeError::MissingMovieHeader)?;
    let duration_seconds = parse_mvhd(mvhd)?;

    // The video track is whichever track reports nonzero display dimensions.
    let mut width = 0;
    let mut height = 0;
    for trak in find_boxes(moov, b"trak")? {
        if let Some(tkhd) = find_box(trak, b"tkhd")? {
            let (w, h) = parse_tkhd(tkhd)?;
            if w > 0 && h > 0 {
                width = w.max(width);
                height = h.max(height);
            }
        }
    }

    Ok(VideoInfo {
        width,
        height,
        duration_seconds,
        major_brand,
    })
}
