// src/engine/transform.rs
//
// Per-pixel luminance weighting and the row kernel every executor runs.

use crate::engine::buffer::GrayscaleChannelPolicy;

pub const RED_WEIGHT: f64 = 0.3;
pub const GREEN_WEIGHT: f64 = 0.58;
pub const BLUE_WEIGHT: f64 = 0.11;

/// Up to four interleaved channels of one pixel, normalized so that bytes
/// 0..3 are R, G, B and byte 3 is alpha (255 when the source has none).
pub type Pixel = [u8; 4];

/// `floor(0.3 R + 0.58 G + 0.11 B)`.
///
/// The weights sum to 0.99, so the result never exceeds 252 and the
/// float-to-u8 cast only ever truncates.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (r as f64 * RED_WEIGHT + g as f64 * GREEN_WEIGHT + b as f64 * BLUE_WEIGHT) as u8
}

/// Read one source pixel into the fixed RGBA window.
///
/// Gray inputs (1 or 2 channels) are widened to R = G = B = gray so the
/// weighting never reads a neighbouring pixel's bytes.
#[inline]
pub fn load_pixel(src: &[u8], in_channels: u8) -> Pixel {
    match in_channels {
        1 => [src[0], src[0], src[0], u8::MAX],
        2 => [src[0], src[0], src[0], src[1]],
        3 => [src[0], src[1], src[2], u8::MAX],
        _ => [src[0], src[1], src[2], src[3]],
    }
}

/// Map one pixel to its gray output. Channel 1 carries alpha for RGBA input
/// and is zero otherwise; gray+alpha input drops its alpha.
#[inline]
pub fn transform_pixel(pixel: Pixel, in_channels: u8) -> [u8; 2] {
    let gray = luminance(pixel[0], pixel[1], pixel[2]);
    match in_channels {
        4 => [gray, pixel[3]],
        _ => [gray, 0],
    }
}

/// Transform a block of whole rows.
///
/// `src` holds `n` pixels of `policy.in_channels()` bytes and `dst` the same
/// `n` pixels of `policy.out_channels()` bytes. Pixel `i` of the block lives
/// at `i * in_channels` in `src` and `i * out_channels` in `dst`.
pub fn transform_rows(src: &[u8], dst: &mut [u8], policy: GrayscaleChannelPolicy) {
    let in_channels = policy.in_channels();
    let out_channels = policy.out_channels() as usize;
    debug_assert_eq!(
        src.len() / in_channels as usize,
        dst.len() / out_channels,
        "source and destination blocks must hold the same pixel count"
    );

    for (src_px, dst_px) in src
        .chunks_exact(in_channels as usize)
        .zip(dst.chunks_exact_mut(out_channels))
    {
        let out = transform_pixel(load_pixel(src_px, in_channels), in_channels);
        dst_px.copy_from_slice(&out[..out_channels]);
    }
}
