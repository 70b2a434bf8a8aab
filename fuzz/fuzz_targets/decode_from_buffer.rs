#![no_main]

//! Fuzz target for the decode collaborator: arbitrary bytes must either
//! decode into a well-formed buffer or fail with an error, never panic.

use libfuzzer_sys::fuzz_target;
use rowgray::engine::{decoder, GrayscaleChannelPolicy};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    if let Ok(buffer) = decoder::decode_bytes(data) {
        let (w, h) = buffer.dimensions();
        assert_eq!(
            buffer.as_raw().len(),
            w as usize * h as usize * buffer.channels() as usize
        );
        assert!(GrayscaleChannelPolicy::new(buffer.channels()).is_ok());
    }
});
