#![no_main]

//! Fuzz target for PNG and JPEG encoding of grayscale output buffers.

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use rowgray::engine::{decoder, encoder, ImageBuffer};
use rowgray::ops::OutputFormat;

#[derive(Arbitrary, Debug)]
struct EncodeSeed {
    jpeg: bool,
    quality: u8,
    width: u8,
    height: u8,
    with_alpha: bool,
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok(seed) = EncodeSeed::arbitrary(&mut unstructured) else {
        return;
    };
    let pixels = unstructured.take_rest();

    // Limit dimensions to avoid OOM
    let w = (seed.width as u32 % 64).max(1);
    let h = (seed.height as u32 % 64).max(1);
    let channels = if seed.with_alpha { 2 } else { 1 };
    let len = w as usize * h as usize * channels as usize;
    let raw = (0..len)
        .map(|i| pixels.get(i % pixels.len().max(1)).copied().unwrap_or(128))
        .collect();
    let Ok(buffer) = ImageBuffer::from_raw(w, h, channels, raw) else {
        return;
    };

    let format = if seed.jpeg {
        OutputFormat::Jpeg {
            quality: seed.quality.clamp(1, 100),
        }
    } else {
        OutputFormat::Png
    };

    let bytes = encoder::encode(&buffer, format).expect("valid buffers always encode");
    let back = decoder::decode_bytes(&bytes).expect("encoded output always decodes");
    assert_eq!(back.dimensions(), (w, h));
    if format == OutputFormat::Png {
        assert_eq!(back, buffer);
    }
});
