// src/engine/encoder.rs
//
// Encode collaborator: ImageBuffer in, PNG or JPEG bytes out, plus the
// atomic file write used by the conversion pipeline.

use crate::engine::buffer::ImageBuffer;
use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::error::RowGrayError;
use crate::ops::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Encode a buffer in the requested format.
pub fn encode(buffer: &ImageBuffer, format: OutputFormat) -> EngineResult<Vec<u8>> {
    match format {
        OutputFormat::Png => encode_png(buffer),
        OutputFormat::Jpeg { quality } => encode_jpeg(buffer, quality),
    }
}

/// Encode and write to `path` atomically. Returns the number of bytes written.
///
/// The bytes go to a temporary file in the target directory which is synced
/// and then renamed over `path`, so readers never observe a partial file.
pub fn write(
    path: impl AsRef<Path>,
    buffer: &ImageBuffer,
    format: OutputFormat,
) -> EngineResult<u64> {
    let path = path.as_ref();
    let data = encode(buffer, format)?;

    let output_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(output_dir)
        .map_err(|e| RowGrayError::file_write_failed(output_dir.display().to_string(), e))?;
    let temp_path = temp_file.path().display().to_string();

    temp_file
        .write_all(&data)
        .map_err(|e| RowGrayError::file_write_failed(temp_path.clone(), e))?;
    temp_file
        .as_file_mut()
        .sync_all()
        .map_err(|e| RowGrayError::file_write_failed(temp_path, e))?;

    // tempfile removes the temporary on drop if the rename fails
    temp_file
        .persist(path)
        .map_err(|e| RowGrayError::file_write_failed(path.display().to_string(), e.error))?;

    Ok(data.len() as u64)
}

fn color_type(channels: u8) -> EngineResult<ExtendedColorType> {
    match channels {
        1 => Ok(ExtendedColorType::L8),
        2 => Ok(ExtendedColorType::La8),
        3 => Ok(ExtendedColorType::Rgb8),
        4 => Ok(ExtendedColorType::Rgba8),
        other => Err(RowGrayError::unsupported_channels(other)),
    }
}

fn encode_png(buffer: &ImageBuffer) -> EngineResult<Vec<u8>> {
    let color = color_type(buffer.channels())?;
    run_with_panic_policy("encode:png", || {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(buffer.as_raw(), buffer.width(), buffer.height(), color)
            .map_err(|e| RowGrayError::encode_failed("png", e.to_string()))?;
        Ok(out)
    })
}

/// JPEG has no alpha channel; alpha is dropped before encoding.
fn encode_jpeg(buffer: &ImageBuffer, quality: u8) -> EngineResult<Vec<u8>> {
    let (pixels, color) = strip_alpha(buffer)?;
    run_with_panic_policy("encode:jpeg", || {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
            .write_image(&pixels, buffer.width(), buffer.height(), color)
            .map_err(|e| RowGrayError::encode_failed("jpeg", e.to_string()))?;
        Ok(out)
    })
}

fn strip_alpha(buffer: &ImageBuffer) -> EngineResult<(Cow<'_, [u8]>, ExtendedColorType)> {
    let channels = buffer.channels() as usize;
    let (keep, color) = match channels {
        1 => return Ok((Cow::Borrowed(buffer.as_raw()), ExtendedColorType::L8)),
        3 => return Ok((Cow::Borrowed(buffer.as_raw()), ExtendedColorType::Rgb8)),
        2 => (1, ExtendedColorType::L8),
        4 => (3, ExtendedColorType::Rgb8),
        other => return Err(RowGrayError::unsupported_channels(other as u8)),
    };
    let pixel_count = buffer.width() as usize * buffer.height() as usize;
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(pixel_count * keep)
        .map_err(|_| RowGrayError::allocation_failed("jpeg staging buffer", pixel_count * keep))?;
    for px in buffer.as_raw().chunks_exact(channels) {
        pixels.extend_from_slice(&px[..keep]);
    }
    Ok((Cow::Owned(pixels), color))
}
