#![no_main]

//! All executors must produce byte-identical output for any buffer and any
//! worker count, including more workers than rows.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rowgray::engine::{run_executor, ImageBuffer};
use rowgray::ops::ExecutorKind;

#[derive(Arbitrary, Debug)]
struct Input {
    width: u8,
    height: u8,
    channels: u8,
    workers: u8,
    pixels: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let w = (input.width as u32 % 32).max(1);
    let h = (input.height as u32 % 32).max(1);
    let channels = input.channels % 4 + 1;
    let workers = (input.workers as usize % 48).max(1);

    let len = w as usize * h as usize * channels as usize;
    let raw = (0..len)
        .map(|i| input.pixels.get(i % input.pixels.len().max(1)).copied().unwrap_or(0))
        .collect();
    let Ok(buffer) = ImageBuffer::from_raw(w, h, channels, raw) else {
        return;
    };

    let reference = run_executor(ExecutorKind::Threads, &buffer, 1).expect("single worker run");
    for kind in [ExecutorKind::Threads, ExecutorKind::Pool, ExecutorKind::Distributed] {
        let out = run_executor(kind, &buffer, workers).expect("executor run");
        assert_eq!(out, reference, "{kind} with {workers} workers");
    }
});
