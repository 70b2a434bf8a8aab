// src/ops.rs
//
// Run-level choices: how the result is encoded and which concurrency
// substrate computes it. Cheap to create and copy.

use crate::error::RowGrayError;
use std::fmt;

/// JPEG quality used when the caller does not pick one.
pub const DEFAULT_JPEG_QUALITY: u8 = 100;

/// Output format for encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    /// Numeric format codes of the command surface: 1 = PNG, 2 = JPEG.
    pub fn from_code(code: u32) -> Result<Self, RowGrayError> {
        match code {
            1 => Ok(Self::Png),
            2 => Ok(Self::Jpeg {
                quality: DEFAULT_JPEG_QUALITY,
            }),
            other => Err(RowGrayError::invalid_format_code(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpeg",
        }
    }
}

/// Concurrency substrate used for the transform phase. Exactly one is used
/// per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExecutorKind {
    /// Scoped OS threads writing into one shared output buffer.
    #[default]
    Threads,
    /// Fixed-size rayon pool; each pool thread takes one row range.
    Pool,
    /// Ranks without shared memory, connected by channels
    /// (broadcast, scatter, gather).
    Distributed,
}

impl ExecutorKind {
    pub fn from_str(name: &str) -> Result<Self, RowGrayError> {
        match name.to_lowercase().as_str() {
            "threads" | "pthreads" => Ok(Self::Threads),
            "pool" | "rayon" => Ok(Self::Pool),
            "distributed" | "ranks" => Ok(Self::Distributed),
            other => Err(RowGrayError::invalid_argument(
                "executor",
                other.to_string(),
                "expected threads, pool or distributed",
            )),
        }
    }

    /// Shared-memory executors need an explicit worker count; the distributed
    /// one can fall back to the machine's parallelism.
    pub fn requires_worker_count(&self) -> bool {
        matches!(self, Self::Threads | Self::Pool)
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Threads => "threads",
            Self::Pool => "pool",
            Self::Distributed => "distributed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_codes_map_to_formats() {
        assert_eq!(OutputFormat::from_code(1).unwrap(), OutputFormat::Png);
        assert_eq!(
            OutputFormat::from_code(2).unwrap(),
            OutputFormat::Jpeg { quality: 100 }
        );
        assert!(matches!(
            OutputFormat::from_code(3),
            Err(RowGrayError::InvalidFormatCode { code: 3 })
        ));
        assert!(OutputFormat::from_code(0).is_err());
    }

    #[test]
    fn format_names_follow_codes() {
        assert_eq!(OutputFormat::from_code(1).unwrap().name(), "png");
        assert_eq!(OutputFormat::from_code(2).unwrap().name(), "jpeg");
    }

    #[test]
    fn executor_kind_parsing() {
        assert_eq!(ExecutorKind::from_str("rayon").unwrap(), ExecutorKind::Pool);
        assert_eq!(
            ExecutorKind::from_str("Distributed").unwrap(),
            ExecutorKind::Distributed
        );
        assert!(ExecutorKind::from_str("gpu").is_err());
        assert!(ExecutorKind::Threads.requires_worker_count());
        assert!(!ExecutorKind::Distributed.requires_worker_count());
        assert_eq!(ExecutorKind::default().to_string(), "threads");
    }
}
