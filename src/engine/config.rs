// src/engine/config.rs
//
// Immutable description of one transform run. Built once, validated once,
// then shared by reference with every worker.

use crate::engine::buffer::{GrayscaleChannelPolicy, ImageBuffer};
use crate::engine::partition::{self, RowRange};
use crate::error::RowGrayError;

type ConfigResult<T> = std::result::Result<T, RowGrayError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunConfig {
    width: u32,
    height: u32,
    policy: GrayscaleChannelPolicy,
    worker_count: usize,
    base_rows: usize,
}

impl RunConfig {
    /// Validates the channel count and the partition before anything moves.
    pub fn new(
        width: u32,
        height: u32,
        in_channels: u8,
        worker_count: usize,
    ) -> ConfigResult<Self> {
        let policy = GrayscaleChannelPolicy::new(in_channels)?;
        if width == 0 {
            return Err(RowGrayError::invalid_argument(
                "width",
                "0",
                "width must be positive",
            ));
        }
        let base_rows = partition::base_rows(height as usize, worker_count)?;
        Ok(Self {
            width,
            height,
            policy,
            worker_count,
            base_rows,
        })
    }

    pub fn for_buffer(buffer: &ImageBuffer, worker_count: usize) -> ConfigResult<Self> {
        Self::new(
            buffer.width(),
            buffer.height(),
            buffer.channels(),
            worker_count,
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn policy(&self) -> GrayscaleChannelPolicy {
        self.policy
    }

    pub fn in_channels(&self) -> u8 {
        self.policy.in_channels()
    }

    pub fn out_channels(&self) -> u8 {
        self.policy.out_channels()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Uniform rows per worker (the last worker adds the remainder).
    pub fn base_rows(&self) -> usize {
        self.base_rows
    }

    pub fn in_row_bytes(&self) -> usize {
        self.width as usize * self.in_channels() as usize
    }

    pub fn out_row_bytes(&self) -> usize {
        self.width as usize * self.out_channels() as usize
    }

    pub fn range(&self, worker: usize) -> RowRange {
        partition::range_from_base(self.height as usize, self.worker_count, self.base_rows, worker)
    }

    pub fn ranges(&self) -> Vec<RowRange> {
        (0..self.worker_count).map(|w| self.range(w)).collect()
    }

    /// Number of workers whose range is empty.
    pub fn idle_workers(&self) -> usize {
        self.ranges().iter().filter(|r| r.is_empty()).count()
    }

    /// Ensure `buffer` is the input this configuration was built for.
    pub(crate) fn check_input(&self, buffer: &ImageBuffer) -> ConfigResult<()> {
        if buffer.dimensions() != (self.width, self.height)
            || buffer.channels() != self.in_channels()
        {
            return Err(RowGrayError::invalid_argument(
                "buffer",
                format!(
                    "{}x{}x{}",
                    buffer.width(),
                    buffer.height(),
                    buffer.channels()
                ),
                format!(
                    "run is configured for {}x{}x{}",
                    self.width,
                    self.height,
                    self.in_channels()
                ),
            ));
        }
        Ok(())
    }
}
