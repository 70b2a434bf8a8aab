// src/engine.rs
//
// The core of rowgray. A three-phase pipeline:
// 1. Decode the input file into a flat 8-bit buffer
// 2. Convert it to grayscale, split by rows across a worker set
// 3. Encode the result and write it atomically
//
// This file is a facade over the modules in engine/.

use crate::error::{Result, RowGrayError};
use crate::ops::{ExecutorKind, OutputFormat};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod buffer;
mod common;
mod config;
pub mod decoder;
mod distributed;
pub mod encoder;
mod partition;
pub mod pool;
mod shared;
pub mod topology;
mod transform;

pub use buffer::{GrayscaleChannelPolicy, ImageBuffer};
pub use common::run_with_panic_policy;
pub use config::RunConfig;
pub use decoder::check_dimensions;
pub use distributed::{DistributedExecutor, WorkerSlice};
pub use partition::{partition, row_range_for, RowRange};
pub use shared::{SharedMemoryExecutor, SharedSubstrate};
pub use transform::{
    luminance, transform_pixel, transform_rows, BLUE_WEIGHT, GREEN_WEIGHT, RED_WEIGHT,
};

// =============================================================================
// END-TO-END DRIVER
// =============================================================================

/// Everything one conversion needs.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub executor: ExecutorKind,
    /// Required for the shared-memory executors. The distributed executor
    /// falls back to the available parallelism.
    pub worker_count: Option<usize>,
}

/// Summary of a finished conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionReport {
    pub width: u32,
    pub height: u32,
    pub in_channels: u8,
    pub out_channels: u8,
    pub worker_count: usize,
    pub executor: ExecutorKind,
    pub decode_time: Duration,
    pub transform_time: Duration,
    pub encode_time: Duration,
    pub bytes_written: u64,
}

/// Decode `input`, convert it with the chosen executor, write `output`.
///
/// The run config (and with it the partition) is validated right after
/// decoding, so a bad worker count fails before any pixel is transformed
/// and no output file is created.
pub fn convert_file(options: &ConvertOptions) -> Result<ConversionReport> {
    let worker_count = resolve_worker_count(options.executor, options.worker_count)?;

    let started = Instant::now();
    let input = decoder::load(&options.input)?;
    let decode_time = started.elapsed();
    info!(
        path = %options.input.display(),
        width = input.width(),
        height = input.height(),
        channels = input.channels(),
        "loaded image"
    );

    let config = RunConfig::for_buffer(&input, worker_count)?;
    info!(
        width = config.width(),
        height = config.height(),
        channels = config.out_channels(),
        workers = worker_count,
        executor = %options.executor,
        "created grayscale image"
    );

    let started = Instant::now();
    let output = run_executor(options.executor, &input, worker_count)?;
    let transform_time = started.elapsed();

    let started = Instant::now();
    let bytes_written = encoder::write(&options.output, &output, options.format)?;
    let encode_time = started.elapsed();
    info!(
        path = %options.output.display(),
        format = options.format.name(),
        bytes = bytes_written,
        "wrote image"
    );

    Ok(ConversionReport {
        width: config.width(),
        height: config.height(),
        in_channels: config.in_channels(),
        out_channels: config.out_channels(),
        worker_count,
        executor: options.executor,
        decode_time,
        transform_time,
        encode_time,
        bytes_written,
    })
}

/// Run the transform on an in-memory buffer with the chosen executor.
pub fn run_executor(
    kind: ExecutorKind,
    input: &ImageBuffer,
    worker_count: usize,
) -> Result<ImageBuffer> {
    match kind {
        ExecutorKind::Threads => {
            let config = RunConfig::for_buffer(input, worker_count)?;
            SharedMemoryExecutor::new(config, SharedSubstrate::Threads).run(input)
        }
        ExecutorKind::Pool => {
            let config = RunConfig::for_buffer(input, worker_count)?;
            SharedMemoryExecutor::new(config, SharedSubstrate::Pool).run(input)
        }
        ExecutorKind::Distributed => DistributedExecutor::new(worker_count).run(input),
    }
}

fn resolve_worker_count(kind: ExecutorKind, requested: Option<usize>) -> Result<usize> {
    match requested {
        Some(n) => pool::check_worker_count(n),
        None if kind.requires_worker_count() => Err(RowGrayError::usage(format!(
            "the {kind} executor needs an explicit worker count"
        ))),
        None => Ok(pool::default_worker_count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executors_agree_in_memory() {
        let pixels: Vec<u8> = (0..5 * 7 * 3).map(|i| (i * 13 % 256) as u8).collect();
        let input = ImageBuffer::from_raw(5, 7, 3, pixels).unwrap();
        let reference = run_executor(ExecutorKind::Threads, &input, 1).unwrap();
        for kind in [ExecutorKind::Threads, ExecutorKind::Pool, ExecutorKind::Distributed] {
            for workers in [1, 2, 3, 7, 9] {
                assert_eq!(run_executor(kind, &input, workers).unwrap(), reference);
            }
        }
    }

    #[test]
    fn shared_memory_needs_explicit_workers() {
        assert!(matches!(
            resolve_worker_count(ExecutorKind::Threads, None),
            Err(RowGrayError::Usage { .. })
        ));
        assert!(resolve_worker_count(ExecutorKind::Distributed, None).unwrap() >= 1);
        assert_eq!(resolve_worker_count(ExecutorKind::Pool, Some(3)).unwrap(), 3);
    }

    #[test]
    fn zero_workers_fail_before_output_exists() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        let buf = ImageBuffer::from_raw(2, 2, 3, vec![9; 12]).unwrap();
        encoder::write(&input, &buf, OutputFormat::Png).unwrap();

        let err = convert_file(&ConvertOptions {
            input,
            output: output.clone(),
            format: OutputFormat::Png,
            executor: ExecutorKind::Threads,
            worker_count: Some(0),
        })
        .unwrap_err();
        assert!(matches!(err, RowGrayError::InvalidPartition { .. }));
        assert!(!output.exists());
    }
}
