// src/engine/decoder.rs
//
// Decode collaborator: file or bytes in, flat 8-bit ImageBuffer out.

use crate::engine::buffer::ImageBuffer;
use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::RowGrayError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Read and decode an image file.
pub fn load(path: impl AsRef<Path>) -> EngineResult<ImageBuffer> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RowGrayError::file_not_found(display.clone())
        } else {
            RowGrayError::file_read_failed(display.clone(), e)
        }
    })?;
    decode_bytes(&bytes)
}

/// Decode encoded bytes (PNG or JPEG) into 8-bit interleaved channels.
///
/// The channel count follows the source: gray, gray+alpha, RGB or RGBA.
/// Deeper samples (16-bit, float) are reduced to 8 bits.
pub fn decode_bytes(bytes: &[u8]) -> EngineResult<ImageBuffer> {
    let format = match detect_format(bytes) {
        Some(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => format,
        Some(other) => {
            return Err(RowGrayError::decode_failed(format!(
                "unsupported input format: {other:?}"
            )))
        }
        None => return Err(RowGrayError::decode_failed("unrecognized image format")),
    };
    ensure_dimensions_safe(bytes)?;
    let img = run_with_panic_policy("decode:image", || {
        image::load_from_memory_with_format(bytes, format)
            .map_err(|e| RowGrayError::decode_failed(format!("decode failed: {e}")))
    })?;
    check_dimensions(img.width(), img.height())?;
    into_buffer(img)
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(RowGrayError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(RowGrayError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Inspect the header and reject oversized images before decoding pixels.
fn ensure_dimensions_safe(bytes: &[u8]) -> EngineResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}

fn into_buffer(img: DynamicImage) -> EngineResult<ImageBuffer> {
    let (width, height) = (img.width(), img.height());
    let (channels, raw) = match img {
        DynamicImage::ImageLuma8(b) => (1, b.into_raw()),
        DynamicImage::ImageLumaA8(b) => (2, b.into_raw()),
        DynamicImage::ImageRgb8(b) => (3, b.into_raw()),
        DynamicImage::ImageRgba8(b) => (4, b.into_raw()),
        other => {
            let color = other.color();
            match (color.has_color(), color.has_alpha()) {
                (false, false) => (1, other.to_luma8().into_raw()),
                (false, true) => (2, other.to_luma_alpha8().into_raw()),
                (true, false) => (3, other.to_rgb8().into_raw()),
                (true, true) => (4, other.to_rgba8().into_raw()),
            }
        }
    };
    ImageBuffer::from_raw(width, height, channels, raw)
}
