// src/engine/shared.rs
//
// Shared-memory executor: all workers see the same input and output buffers.
//
// Disjointness is the whole synchronization story. The output is split into
// one `&mut [u8]` per row range before any worker starts, so each worker can
// only ever write the bytes of its own rows and no lock is needed. The only
// barrier is the final join.

use crate::engine::buffer::ImageBuffer;
use crate::engine::config::RunConfig;
use crate::engine::partition::RowRange;
use crate::engine::pool;
use crate::engine::transform::transform_rows;
use crate::error::RowGrayError;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tracing::{debug, warn};

type SharedResult<T> = std::result::Result<T, RowGrayError>;

/// Which kind of shared-memory worker set runs the rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SharedSubstrate {
    /// One scoped OS thread per worker.
    Threads,
    /// A rayon pool with exactly `worker_count` threads; every pool thread
    /// picks the range matching its own index.
    Pool,
}

/// One worker's share of the output, handed out before the workers start.
struct WorkerTask<'a> {
    worker: usize,
    out: &'a mut [u8],
}

pub struct SharedMemoryExecutor {
    config: RunConfig,
    substrate: SharedSubstrate,
}

impl SharedMemoryExecutor {
    pub fn new(config: RunConfig, substrate: SharedSubstrate) -> Self {
        Self { config, substrate }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Allocate the output buffer and fill it.
    pub fn run(&self, input: &ImageBuffer) -> SharedResult<ImageBuffer> {
        let mut output = ImageBuffer::zeroed(
            self.config.width(),
            self.config.height(),
            self.config.out_channels(),
        )?;
        self.run_into(input, &mut output)?;
        Ok(output)
    }

    /// Fill a caller-owned output buffer. Returns only after every worker has
    /// finished.
    pub fn run_into(&self, input: &ImageBuffer, output: &mut ImageBuffer) -> SharedResult<()> {
        self.config.check_input(input)?;
        if output.dimensions() != input.dimensions()
            || output.channels() != self.config.out_channels()
        {
            return Err(RowGrayError::invalid_argument(
                "output",
                format!(
                    "{}x{}x{}",
                    output.width(),
                    output.height(),
                    output.channels()
                ),
                "output must match the input dimensions and the gray channel count",
            ));
        }

        let idle = self.config.idle_workers();
        if idle > 0 {
            warn!(
                idle,
                workers = self.config.worker_count(),
                rows = self.config.height(),
                "more workers than rows; idle workers do no work"
            );
        }

        let tasks = split_output(output.as_raw_mut(), &self.config);
        let src = input.as_raw();
        match self.substrate {
            SharedSubstrate::Threads => run_threads(&self.config, src, tasks),
            SharedSubstrate::Pool => run_pool(&self.config, src, tasks),
        }
    }
}

/// Carve the output into disjoint per-worker slices, ordered by worker index.
fn split_output<'a>(out: &'a mut [u8], config: &RunConfig) -> Vec<WorkerTask<'a>> {
    let row_bytes = config.out_row_bytes();
    let mut rest = out;
    let mut consumed = 0usize;
    let mut tasks = Vec::with_capacity(config.worker_count());
    for (worker, range) in config.ranges().into_iter().enumerate() {
        let len = range.row_count * row_bytes;
        debug_assert!(range.is_empty() || range.first_row * row_bytes == consumed);
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
        rest = tail;
        consumed += len;
        tasks.push(WorkerTask { worker, out: head });
    }
    debug_assert!(rest.is_empty());
    tasks
}

/// Body run by every worker: look up its own range and transform it.
fn work(config: &RunConfig, src: &[u8], task: WorkerTask<'_>) {
    let range: RowRange = config.range(task.worker);
    if range.is_empty() {
        return;
    }
    let start = range.first_row * config.in_row_bytes();
    let end = range.end_row() * config.in_row_bytes();
    transform_rows(&src[start..end], task.out, config.policy());
    debug!(
        worker = task.worker,
        first_row = range.first_row,
        rows = range.row_count,
        "worker done"
    );
}

fn run_threads(config: &RunConfig, src: &[u8], tasks: Vec<WorkerTask<'_>>) -> SharedResult<()> {
    thread::scope(|scope| -> SharedResult<()> {
        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let worker = task.worker;
            let handle = thread::Builder::new()
                .name(format!("rowgray-worker-{worker}"))
                .spawn_scoped(scope, move || work(config, src, task))
                .map_err(|e| RowGrayError::worker_spawn_failed(worker, e.to_string()))?;
            handles.push((worker, handle));
        }
        for (worker, handle) in handles {
            handle
                .join()
                .map_err(|_| RowGrayError::worker_panicked(worker))?;
        }
        Ok(())
    })
}

fn run_pool(config: &RunConfig, src: &[u8], tasks: Vec<WorkerTask<'_>>) -> SharedResult<()> {
    let pool = pool::build_pool(config.worker_count())?;
    let slots: Vec<TaskSlot<'_>> = tasks.into_iter().map(|t| Mutex::new(Some(t))).collect();

    let outcomes = pool.broadcast(|ctx| {
        let worker = ctx.index();
        match take_task(&slots, worker) {
            Some(task) => panic::catch_unwind(AssertUnwindSafe(|| work(config, src, task)))
                .map_err(|_| RowGrayError::worker_panicked(worker)),
            None => Err(RowGrayError::worker_spawn_failed(
                worker,
                "pool thread has no row range assigned",
            )),
        }
    });

    outcomes.into_iter().collect()
}

type TaskSlot<'a> = Mutex<Option<WorkerTask<'a>>>;

/// Each slot is taken exactly once, by the pool thread with that index.
fn take_task<'a>(slots: &[TaskSlot<'a>], worker: usize) -> Option<WorkerTask<'a>> {
    slots.get(worker).and_then(|slot| slot.lock().take())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::transform::luminance;

    fn gradient(width: u32, height: u32, channels: u8) -> ImageBuffer {
        let len = width as usize * height as usize * channels as usize;
        let pixels = (0..len).map(|i| (i * 7 % 251) as u8).collect();
        ImageBuffer::from_raw(width, height, channels, pixels).unwrap()
    }

    fn sequential(input: &ImageBuffer) -> ImageBuffer {
        let cfg = RunConfig::for_buffer(input, 1).unwrap();
        let mut out =
            ImageBuffer::zeroed(input.width(), input.height(), cfg.out_channels()).unwrap();
        transform_rows(input.as_raw(), out.as_raw_mut(), cfg.policy());
        out
    }

    #[test]
    fn threads_match_sequential() {
        let input = gradient(13, 11, 3);
        let cfg = RunConfig::for_buffer(&input, 4).unwrap();
        let out = SharedMemoryExecutor::new(cfg, SharedSubstrate::Threads)
            .run(&input)
            .unwrap();
        assert_eq!(out, sequential(&input));
    }

    #[test]
    fn pool_matches_sequential() {
        let input = gradient(9, 10, 4);
        let cfg = RunConfig::for_buffer(&input, 3).unwrap();
        let out = SharedMemoryExecutor::new(cfg, SharedSubstrate::Pool)
            .run(&input)
            .unwrap();
        assert_eq!(out.channels(), 2);
        assert_eq!(out, sequential(&input));
    }

    #[test]
    fn tolerates_idle_workers() {
        let input = gradient(3, 2, 3);
        let cfg = RunConfig::for_buffer(&input, 5).unwrap();
        for substrate in [SharedSubstrate::Threads, SharedSubstrate::Pool] {
            let out = SharedMemoryExecutor::new(cfg, substrate).run(&input).unwrap();
            assert_eq!(out, sequential(&input));
        }
    }

    #[test]
    fn slot_survives_a_panic_while_locked() {
        let cfg = RunConfig::new(2, 4, 1, 2).unwrap();
        let mut out = vec![0u8; 8];
        let slots: Vec<TaskSlot<'_>> = split_output(&mut out, &cfg)
            .into_iter()
            .map(|t| Mutex::new(Some(t)))
            .collect();

        let held = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = slots[1].lock();
            panic!("worker died holding the slot");
        }));
        assert!(held.is_err());

        let task = take_task(&slots, 1).expect("slot is still readable after the panic");
        assert_eq!((task.worker, task.out.len()), (1, 4));
        assert!(take_task(&slots, 1).is_none());
        assert!(take_task(&slots, 2).is_none());
    }

    #[test]
    fn pool_with_one_row_per_worker() {
        let input = gradient(1, 16, 3);
        let cfg = RunConfig::for_buffer(&input, 16).unwrap();
        let out = SharedMemoryExecutor::new(cfg, SharedSubstrate::Pool)
            .run(&input)
            .unwrap();
        assert_eq!(out, sequential(&input));
    }

    #[test]
    fn split_output_is_disjoint_and_complete() {
        let cfg = RunConfig::new(4, 10, 3, 3).unwrap();
        let mut out = vec![0u8; 40];
        let tasks = split_output(&mut out, &cfg);
        let lens: Vec<usize> = tasks.iter().map(|t| t.out.len()).collect();
        assert_eq!(lens, vec![12, 12, 16]);
    }

    #[test]
    fn run_into_rejects_wrong_output_shape() {
        let input = gradient(2, 2, 3);
        let cfg = RunConfig::for_buffer(&input, 2).unwrap();
        let mut wrong = ImageBuffer::zeroed(2, 2, 2).unwrap();
        let err = SharedMemoryExecutor::new(cfg, SharedSubstrate::Threads)
            .run_into(&input, &mut wrong)
            .unwrap_err();
        assert!(matches!(err, RowGrayError::InvalidArgument { .. }));
    }

    #[test]
    fn writes_expected_values() {
        let input = ImageBuffer::from_raw(1, 2, 3, vec![255, 0, 0, 1, 2, 3]).unwrap();
        let cfg = RunConfig::for_buffer(&input, 2).unwrap();
        let out = SharedMemoryExecutor::new(cfg, SharedSubstrate::Threads)
            .run(&input)
            .unwrap();
        assert_eq!(out.as_raw(), &[76, luminance(1, 2, 3)]);
    }
}
