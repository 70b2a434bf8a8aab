// src/error.rs
//
// Unified error handling for rowgray
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Bad arguments or degenerate run shape
// - CodecError: Decode/encode issues
// - ResourceLimit: Memory, dimension and file-system limits
// - InternalBug: Worker or transport failures (should not happen)
//
// Every error is fatal to the run. There is no retry path anywhere in the
// engine; callers report the diagnostic and stop.

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy used for exit codes and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Bad or missing arguments
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Memory/dimension/file-system limits
    ResourceLimit,
    /// Worker, join or transport failures
    InternalBug,
}

impl ErrorCategory {
    /// Get string representation of error category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }

    /// Process exit code used by the CLI for this category.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCategory::UserError => 2,
            ErrorCategory::CodecError
            | ErrorCategory::ResourceLimit
            | ErrorCategory::InternalBug => 1,
        }
    }
}

/// rowgray error types
#[derive(Debug, Error)]
pub enum RowGrayError {
    // Usage Errors
    #[error("{message}")]
    Usage { message: Cow<'static, str> },

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Unknown format code {code}. Expected 1 (PNG) or 2 (JPEG)")]
    InvalidFormatCode { code: u32 },

    // File I/O Errors
    #[error("File not found: {path}")]
    FileNotFound { path: Cow<'static, str> },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Decode Errors
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("Unsupported channel count {channels}. Expected 1, 2, 3 or 4")]
    UnsupportedChannels { channels: u8 },

    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Buffer Errors
    #[error("Failed to allocate {bytes} bytes for {what}")]
    AllocationFailed { what: Cow<'static, str>, bytes: usize },

    #[error(
        "Buffer of {actual} bytes does not match {width}x{height}x{channels} ({expected} bytes)"
    )]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },

    // Partition Errors
    #[error("Cannot partition {total_rows} rows across {worker_count} workers")]
    InvalidPartition { total_rows: usize, worker_count: usize },

    // Encode Errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Executor Errors
    #[error("Failed to spawn worker {worker}: {message}")]
    WorkerSpawnFailed {
        worker: usize,
        message: Cow<'static, str>,
    },

    #[error("Worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("Transport failure on rank {rank} during {phase}: {message}")]
    TransportFailed {
        rank: usize,
        phase: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

impl Clone for RowGrayError {
    fn clone(&self) -> Self {
        match self {
            Self::Usage { message } => Self::Usage {
                message: message.clone(),
            },
            Self::InvalidArgument {
                name,
                value,
                reason,
            } => Self::InvalidArgument {
                name: name.clone(),
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::InvalidFormatCode { code } => Self::InvalidFormatCode { code: *code },
            Self::FileNotFound { path } => Self::FileNotFound { path: path.clone() },
            Self::FileReadFailed { path, source } => Self::FileReadFailed {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Self::FileWriteFailed { path, source } => Self::FileWriteFailed {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Self::DecodeFailed { message } => Self::DecodeFailed {
                message: message.clone(),
            },
            Self::UnsupportedChannels { channels } => Self::UnsupportedChannels {
                channels: *channels,
            },
            Self::DimensionExceedsLimit { dimension, max } => Self::DimensionExceedsLimit {
                dimension: *dimension,
                max: *max,
            },
            Self::PixelCountExceedsLimit { pixels, max } => Self::PixelCountExceedsLimit {
                pixels: *pixels,
                max: *max,
            },
            Self::AllocationFailed { what, bytes } => Self::AllocationFailed {
                what: what.clone(),
                bytes: *bytes,
            },
            Self::BufferSizeMismatch {
                width,
                height,
                channels,
                expected,
                actual,
            } => Self::BufferSizeMismatch {
                width: *width,
                height: *height,
                channels: *channels,
                expected: *expected,
                actual: *actual,
            },
            Self::InvalidPartition {
                total_rows,
                worker_count,
            } => Self::InvalidPartition {
                total_rows: *total_rows,
                worker_count: *worker_count,
            },
            Self::EncodeFailed { format, message } => Self::EncodeFailed {
                format: format.clone(),
                message: message.clone(),
            },
            Self::WorkerSpawnFailed { worker, message } => Self::WorkerSpawnFailed {
                worker: *worker,
                message: message.clone(),
            },
            Self::WorkerPanicked { worker } => Self::WorkerPanicked { worker: *worker },
            Self::TransportFailed {
                rank,
                phase,
                message,
            } => Self::TransportFailed {
                rank: *rank,
                phase: phase.clone(),
                message: message.clone(),
            },
            Self::InternalPanic { message } => Self::InternalPanic {
                message: message.clone(),
            },
        }
    }
}

// Constructor Helpers
impl RowGrayError {
    pub fn usage(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_format_code(code: u32) -> Self {
        Self::InvalidFormatCode { code }
    }

    pub fn file_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn unsupported_channels(channels: u8) -> Self {
        Self::UnsupportedChannels { channels }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn allocation_failed(what: impl Into<Cow<'static, str>>, bytes: usize) -> Self {
        Self::AllocationFailed {
            what: what.into(),
            bytes,
        }
    }

    pub fn buffer_size_mismatch(
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::BufferSizeMismatch {
            width,
            height,
            channels,
            expected,
            actual,
        }
    }

    pub fn invalid_partition(total_rows: usize, worker_count: usize) -> Self {
        Self::InvalidPartition {
            total_rows,
            worker_count,
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn worker_spawn_failed(worker: usize, message: impl Into<Cow<'static, str>>) -> Self {
        Self::WorkerSpawnFailed {
            worker,
            message: message.into(),
        }
    }

    pub fn worker_panicked(worker: usize) -> Self {
        Self::WorkerPanicked { worker }
    }

    pub fn transport_failed(
        rank: usize,
        phase: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::TransportFailed {
            rank,
            phase: phase.into(),
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            // UserError: bad arguments or run shape
            Self::Usage { .. }
            | Self::InvalidArgument { .. }
            | Self::InvalidFormatCode { .. }
            | Self::FileNotFound { .. }
            | Self::InvalidPartition { .. } => ErrorCategory::UserError,

            // CodecError: Format/encoding issues
            Self::DecodeFailed { .. }
            | Self::UnsupportedChannels { .. }
            | Self::EncodeFailed { .. } => ErrorCategory::CodecError,

            // ResourceLimit: memory, dimension and file-system limits
            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::AllocationFailed { .. }
            | Self::FileReadFailed { .. }
            | Self::FileWriteFailed { .. } => ErrorCategory::ResourceLimit,

            // InternalBug: a buffer that breaks its own size invariant, or a
            // worker/transport that died underneath us
            Self::BufferSizeMismatch { .. }
            | Self::WorkerSpawnFailed { .. }
            | Self::WorkerPanicked { .. }
            | Self::TransportFailed { .. }
            | Self::InternalPanic { .. } => ErrorCategory::InternalBug,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, RowGrayError>;
