// src/engine/buffer.rs
//
// Flat, interleaved 8-bit pixel storage shared by the decoder, the executors
// and the encoder.

use crate::error::RowGrayError;
use std::ops::Range;

type BufferResult<T> = std::result::Result<T, RowGrayError>;

/// Owned pixel buffer.
///
/// Invariant: `pixels.len() == width * height * channels`. The length is fixed
/// at construction; only the contents can change afterwards, so executors may
/// hand out disjoint row slices without the storage ever moving under them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    channels: u8,
    pixels: Vec<u8>,
}

impl ImageBuffer {
    /// Wrap decoded pixels, validating shape and length.
    pub fn from_raw(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> BufferResult<Self> {
        validate_shape(width, height, channels)?;
        let expected = byte_len(width, height, channels)?;
        if pixels.len() != expected {
            return Err(RowGrayError::buffer_size_mismatch(
                width,
                height,
                channels,
                expected,
                pixels.len(),
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Allocate a zero-filled buffer. Allocation failure is reported rather
    /// than aborting the process.
    pub fn zeroed(width: u32, height: u32, channels: u8) -> BufferResult<Self> {
        validate_shape(width, height, channels)?;
        let len = byte_len(width, height, channels)?;
        let pixels = alloc_zeroed(len, "image buffer")?;
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes in one row of pixels.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable view of the pixels. A slice, not the Vec: callers can write
    /// pixels but can never resize or reallocate the storage.
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Byte range covering `row_count` rows starting at `first_row`.
    pub fn row_byte_range(&self, first_row: usize, row_count: usize) -> Range<usize> {
        let row_bytes = self.row_bytes();
        first_row * row_bytes..(first_row + row_count) * row_bytes
    }

    /// Pixel at (x, y) as a slice of `channels` bytes.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let channels = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * channels;
        &self.pixels[offset..offset + channels]
    }
}

/// Output channel layout derived from the input channel count.
///
/// Channel 0 of the output always carries luminance. RGBA input gets a second
/// output channel that carries its alpha unchanged; every other input,
/// gray+alpha included, produces a single channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrayscaleChannelPolicy {
    in_channels: u8,
}

impl GrayscaleChannelPolicy {
    pub fn new(in_channels: u8) -> BufferResult<Self> {
        if !(1..=4).contains(&in_channels) {
            return Err(RowGrayError::unsupported_channels(in_channels));
        }
        Ok(Self { in_channels })
    }

    pub fn in_channels(&self) -> u8 {
        self.in_channels
    }

    /// True only for RGBA input, the one layout whose alpha survives.
    pub fn has_alpha(&self) -> bool {
        self.in_channels == 4
    }

    pub fn out_channels(&self) -> u8 {
        if self.has_alpha() {
            2
        } else {
            1
        }
    }
}

fn validate_shape(width: u32, height: u32, channels: u8) -> BufferResult<()> {
    if width == 0 || height == 0 {
        return Err(RowGrayError::invalid_argument(
            "dimensions",
            format!("{width}x{height}"),
            "width and height must be positive",
        ));
    }
    if !(1..=4).contains(&channels) {
        return Err(RowGrayError::unsupported_channels(channels));
    }
    Ok(())
}

fn byte_len(width: u32, height: u32, channels: u8) -> BufferResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(channels as usize))
        .ok_or_else(|| RowGrayError::allocation_failed("image buffer", usize::MAX))
}

/// Zero-filled allocation that surfaces OOM as `AllocationFailed`.
pub(crate) fn alloc_zeroed(len: usize, what: &'static str) -> BufferResult<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| RowGrayError::allocation_failed(what, len))?;
    data.resize(len, 0);
    Ok(data)
}

/// Copy of `src` into freshly allocated memory, with the same OOM handling.
pub(crate) fn alloc_copy(src: &[u8], what: &'static str) -> BufferResult<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(src.len())
        .map_err(|_| RowGrayError::allocation_failed(what, src.len()))?;
    data.extend_from_slice(src);
    Ok(data)
}
