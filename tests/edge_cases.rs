// tests/edge_cases.rs
//
// Edge case tests for rowgray
// Tests the documented scenarios, degenerate partitions and error paths

use rowgray::engine::{
    check_dimensions, convert_file, decoder, encoder, luminance, partition, run_executor,
    transform_pixel, ConvertOptions, DistributedExecutor, ImageBuffer, RowRange, RunConfig,
    MAX_DIMENSION,
};
use rowgray::error::{ErrorCategory, RowGrayError};
use rowgray::ops::{ExecutorKind, OutputFormat};

const EXECUTORS: [ExecutorKind; 3] = [
    ExecutorKind::Threads,
    ExecutorKind::Pool,
    ExecutorKind::Distributed,
];

fn range(first_row: usize, row_count: usize) -> RowRange {
    RowRange {
        first_row,
        row_count,
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn primaries_and_white_use_the_floor_rule() {
    // 0.3*255 = 76.5, 0.58*255 = 147.9, 0.11*255 = 28.05, 0.99*255 = 252.45
    let input = ImageBuffer::from_raw(
        2,
        2,
        3,
        vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
    )
    .unwrap();
    for kind in EXECUTORS {
        let out = run_executor(kind, &input, 2).unwrap();
        assert_eq!(out.channels(), 1);
        assert_eq!(out.as_raw(), &[76, 147, 28, 252], "{kind}");
    }
}

#[test]
fn five_rows_over_three_workers() {
    let ranges = partition(5, 3).unwrap();
    assert_eq!(ranges, vec![range(0, 1), range(1, 1), range(2, 3)]);

    // 1 pixel wide, 5 rows tall
    let input = ImageBuffer::from_raw(1, 5, 3, (0..15).map(|i| i * 10).collect()).unwrap();
    let expected: Vec<u8> = input
        .as_raw()
        .chunks_exact(3)
        .map(|p| luminance(p[0], p[1], p[2]))
        .collect();
    for kind in EXECUTORS {
        assert_eq!(run_executor(kind, &input, 3).unwrap().as_raw(), &expected[..]);
    }
}

#[test]
fn rgba_keeps_alpha_in_second_channel() {
    assert_eq!(transform_pixel([10, 20, 30, 40], 4), [17, 40]);

    let input = ImageBuffer::from_raw(1, 1, 4, vec![10, 20, 30, 40]).unwrap();
    for kind in EXECUTORS {
        let out = run_executor(kind, &input, 1).unwrap();
        assert_eq!(out.channels(), 2);
        assert_eq!(out.as_raw(), &[17, 40]);
    }
}

#[test]
fn gray_alpha_input_produces_one_channel() {
    let input = ImageBuffer::from_raw(1, 1, 2, vec![200, 7]).unwrap();
    for kind in EXECUTORS {
        let out = run_executor(kind, &input, 1).unwrap();
        assert_eq!(out.channels(), 1, "{kind}");
        assert_eq!(out.as_raw(), &[luminance(200, 200, 200)], "{kind}");
    }
    assert_eq!(luminance(200, 200, 200), 198);
    assert_eq!(RunConfig::new(3, 3, 2, 2).unwrap().out_channels(), 1);
}

#[test]
fn more_workers_than_rows_leaves_idle_workers() {
    let ranges = partition(2, 5).unwrap();
    assert_eq!(
        ranges,
        vec![range(0, 0), range(0, 0), range(0, 0), range(0, 0), range(0, 2)]
    );
    assert_eq!(RunConfig::new(4, 2, 3, 5).unwrap().idle_workers(), 4);

    let input = ImageBuffer::from_raw(4, 2, 3, (0..24).map(|i| i * 9).collect()).unwrap();
    let reference = run_executor(ExecutorKind::Threads, &input, 1).unwrap();
    for kind in EXECUTORS {
        assert_eq!(run_executor(kind, &input, 5).unwrap(), reference, "{kind}");
    }
}

#[test]
fn gray_round_trip_darkens_slightly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gray.png");

    let levels: Vec<u8> = (0..=255).collect();
    let gray = ImageBuffer::from_raw(16, 16, 1, levels.clone()).unwrap();
    encoder::write(&path, &gray, OutputFormat::Png).unwrap();
    let decoded = decoder::load(&path).unwrap();
    assert_eq!(decoded, gray);

    let again = run_executor(ExecutorKind::Pool, &decoded, 4).unwrap();
    for (&v, &out) in levels.iter().zip(again.as_raw()) {
        assert_eq!(out, luminance(v, v, v));
        assert!(out <= v);
        // weights sum to 0.99, so at most 1% darker plus truncation
        assert!(v - out <= 3, "{v} -> {out}");
    }
}

// =============================================================================
// DEGENERATE PARTITIONS
// =============================================================================

#[test]
fn zero_workers_is_invalid_partition() {
    assert!(matches!(
        partition(10, 0),
        Err(RowGrayError::InvalidPartition { .. })
    ));
    let input = ImageBuffer::from_raw(1, 1, 3, vec![1, 2, 3]).unwrap();
    for kind in EXECUTORS {
        let err = run_executor(kind, &input, 0).unwrap_err();
        assert!(matches!(err, RowGrayError::InvalidPartition { .. }), "{kind}");
        assert_eq!(err.category(), ErrorCategory::UserError);
    }
}

#[test]
fn zero_rows_is_invalid_partition() {
    assert!(matches!(
        partition(0, 4),
        Err(RowGrayError::InvalidPartition { .. })
    ));
    assert!(RunConfig::new(3, 0, 3, 1).is_err());
}

#[test]
fn single_worker_gets_everything() {
    assert_eq!(partition(7, 1).unwrap(), vec![range(0, 7)]);
}

#[test]
fn distributed_single_rank_is_the_coordinator() {
    let input =
        ImageBuffer::from_raw(2, 3, 2, vec![100, 1, 50, 2, 0, 3, 255, 4, 9, 5, 8, 6]).unwrap();
    let out = DistributedExecutor::new(1).run(&input).unwrap();
    assert_eq!(out.channels(), 1);
    assert_eq!(out.pixel(1, 1), &[luminance(255, 255, 255)]);
}

// =============================================================================
// ERROR PATHS
// =============================================================================

#[test]
fn buffer_length_must_match_shape() {
    let err = ImageBuffer::from_raw(2, 2, 3, vec![0; 11]).unwrap_err();
    assert!(matches!(err, RowGrayError::BufferSizeMismatch { .. }));
}

#[test]
fn unsupported_channel_counts_are_rejected() {
    assert!(matches!(
        RunConfig::new(1, 1, 5, 1),
        Err(RowGrayError::UnsupportedChannels { channels: 5 })
    ));
    assert!(RunConfig::new(1, 1, 0, 1).is_err());
}

#[test]
fn unknown_format_codes_are_usage_errors() {
    for code in [0, 3, 42] {
        let err = OutputFormat::from_code(code).unwrap_err();
        assert!(matches!(err, RowGrayError::InvalidFormatCode { .. }));
        assert_eq!(err.category().exit_code(), 2);
    }
    assert_eq!(OutputFormat::from_code(1).unwrap(), OutputFormat::Png);
    assert!(matches!(
        OutputFormat::from_code(2).unwrap(),
        OutputFormat::Jpeg { quality: 100 }
    ));
}

#[test]
fn corrupt_input_is_a_decode_error() {
    let err = decoder::decode_bytes(&[0x89, b'P', b'N', b'G', 0, 0, 0]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::CodecError);
}

#[test]
fn missing_input_file_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.png");
    let err = convert_file(&ConvertOptions {
        input: dir.path().join("missing.png"),
        output: output.clone(),
        format: OutputFormat::Png,
        executor: ExecutorKind::Threads,
        worker_count: Some(2),
    })
    .unwrap_err();
    assert!(matches!(err, RowGrayError::FileNotFound { .. }));
    assert!(!output.exists());
}

#[test]
fn shared_memory_executors_need_a_worker_count() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    encoder::write(
        &input,
        &ImageBuffer::from_raw(1, 1, 3, vec![1, 2, 3]).unwrap(),
        OutputFormat::Png,
    )
    .unwrap();
    for kind in [ExecutorKind::Threads, ExecutorKind::Pool] {
        let err = convert_file(&ConvertOptions {
            input: input.clone(),
            output: dir.path().join("out.png"),
            format: OutputFormat::Png,
            executor: kind,
            worker_count: None,
        })
        .unwrap_err();
        assert!(matches!(err, RowGrayError::Usage { .. }));
    }
}

#[test]
fn dimension_limits() {
    assert!(check_dimensions(1, 1).is_ok());
    assert!(check_dimensions(MAX_DIMENSION + 1, 1).is_err());
    assert!(check_dimensions(1, MAX_DIMENSION + 1).is_err());
}
