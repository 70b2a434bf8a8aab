// src/engine/pool.rs
//
// Worker-count defaults and rayon pool construction.
//
// Unlike a long-lived global pool, the work-sharing substrate needs a pool
// whose size equals the run's worker count exactly: pool thread `i` is
// worker `i`. The pool is built per run and dropped after the join.
//
// Thread count detection uses std::thread::available_parallelism(), which
// respects cgroup/CPU quota; the fallback is MIN_WORKERS when detection fails.

use crate::error::RowGrayError;
use rayon::ThreadPool;

/// Minimum worker count to ensure at least some progress
const MIN_WORKERS: usize = 1;

/// Upper bound on worker count accepted from the command line.
pub const MAX_WORKERS: usize = 1024;

/// Worker count used when the execution environment decides (the
/// distributed model without an explicit count).
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_WORKERS)
        .max(MIN_WORKERS)
}

/// Validate a user-supplied worker count against the upper bound. Zero is
/// left to the partitioner, which reports it as an invalid partition.
pub fn check_worker_count(worker_count: usize) -> Result<usize, RowGrayError> {
    if worker_count > MAX_WORKERS {
        return Err(RowGrayError::invalid_argument(
            "worker_count",
            worker_count.to_string(),
            format!("must be at most {MAX_WORKERS}"),
        ));
    }
    Ok(worker_count)
}

/// Build a pool with exactly `worker_count` threads.
pub fn build_pool(worker_count: usize) -> Result<ThreadPool, RowGrayError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("rowgray-pool-{i}"))
        .build()
        .map_err(|e| RowGrayError::worker_spawn_failed(0, format!("rayon pool: {e}")))
}
