// src/engine/distributed.rs
//
// Distributed executor: ranks share no memory and cooperate only through the
// star topology in `topology.rs`.
//
// Every rank, the coordinator included, runs the same body:
//   1. broadcast  - the coordinator's RunConfig (shape, channels, base rows)
//   2. scatter    - each rank receives an owned copy of its input rows
//   3. compute    - transform the private slice
//   4. gather     - the coordinator places every slice at its row offset
//
// Any failure (allocation, transport, a dead rank) fails the whole run.

use crate::engine::buffer::{alloc_copy, alloc_zeroed, ImageBuffer};
use crate::engine::config::RunConfig;
use crate::engine::partition::RowRange;
use crate::engine::topology::{self, Endpoint};
use crate::engine::transform::transform_rows;
use crate::error::RowGrayError;
use std::thread;
use tracing::{debug, warn};

type DistributedResult<T> = std::result::Result<T, RowGrayError>;

/// A rank's private copy of its rows, input and output. Created when the
/// scatter arrives, consumed by the gather.
#[derive(Debug)]
pub struct WorkerSlice {
    pub range: RowRange,
    pub input: Vec<u8>,
    pub output: Vec<u8>,
}

impl WorkerSlice {
    fn compute(config: &RunConfig, range: RowRange, input: Vec<u8>) -> DistributedResult<Self> {
        let output = alloc_zeroed(range.row_count * config.out_row_bytes(), "worker output slice")?;
        let mut slice = Self {
            range,
            input,
            output,
        };
        transform_rows(&slice.input, &mut slice.output, config.policy());
        Ok(slice)
    }
}

pub struct DistributedExecutor {
    worker_count: usize,
}

impl DistributedExecutor {
    pub fn new(worker_count: usize) -> Self {
        Self { worker_count }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run all ranks and return the coordinator's assembled output.
    pub fn run(&self, input: &ImageBuffer) -> DistributedResult<ImageBuffer> {
        // Partition problems surface here, before any rank starts.
        let config = RunConfig::for_buffer(input, self.worker_count)?;
        let idle = config.idle_workers();
        if idle > 0 {
            warn!(
                idle,
                ranks = self.worker_count,
                rows = config.height(),
                "more ranks than rows; idle ranks do no work"
            );
        }

        let mut endpoints = topology::star::<RunConfig>(self.worker_count).into_iter();
        let coordinator = endpoints
            .next()
            .ok_or_else(|| RowGrayError::invalid_partition(config.height() as usize, 0))?;

        thread::scope(|scope| -> DistributedResult<ImageBuffer> {
            let mut handles = Vec::with_capacity(self.worker_count.saturating_sub(1));
            for endpoint in endpoints {
                let rank = endpoint.rank();
                // On failure the closure, and with it the endpoint, is dropped,
                // so ranks already running see a hang-up instead of waiting.
                let handle = thread::Builder::new()
                    .name(format!("rowgray-rank-{rank}"))
                    .spawn_scoped(scope, move || run_rank(&endpoint, None))
                    .map_err(|e| RowGrayError::worker_spawn_failed(rank, e.to_string()))?;
                handles.push((rank, handle));
            }

            let coordinator_result = run_rank(&coordinator, Some((input, config)));
            drop(coordinator);

            let mut first_error: Option<RowGrayError> = None;
            for (rank, handle) in handles {
                let outcome = handle
                    .join()
                    .map_err(|_| RowGrayError::worker_panicked(rank))
                    .and_then(|r| r);
                if let Err(err) = outcome {
                    first_error = Some(prefer_root_cause(first_error, err));
                }
            }

            match (coordinator_result, first_error) {
                (Ok(Some(output)), None) => Ok(output),
                (Ok(_), Some(err)) => Err(err),
                (Err(err), None) => Err(err),
                (Err(coord), Some(worker)) => Err(prefer_root_cause(Some(coord), worker)),
                (Ok(None), None) => Err(RowGrayError::transport_failed(
                    topology::COORDINATOR,
                    "gather",
                    "coordinator produced no output",
                )),
            }
        })
    }
}

/// A hang-up is usually the echo of a failure elsewhere; report the failure.
fn prefer_root_cause(current: Option<RowGrayError>, next: RowGrayError) -> RowGrayError {
    let Some(current) = current else {
        return next;
    };
    let current_is_echo = matches!(current, RowGrayError::TransportFailed { .. });
    let next_is_echo = matches!(next, RowGrayError::TransportFailed { .. });
    if current_is_echo && !next_is_echo {
        next
    } else {
        current
    }
}

/// The body every rank runs. Only the coordinator passes the input (and its
/// validated config) and only the coordinator gets an image back.
fn run_rank(
    endpoint: &Endpoint<RunConfig>,
    coordinator_input: Option<(&ImageBuffer, RunConfig)>,
) -> DistributedResult<Option<ImageBuffer>> {
    let rank = endpoint.rank();

    // 1. broadcast
    let config = endpoint.broadcast(coordinator_input.map(|(_, cfg)| cfg))?;
    if config.worker_count() != endpoint.size() {
        return Err(RowGrayError::transport_failed(
            rank,
            "broadcast",
            format!(
                "config is for {} ranks but topology has {}",
                config.worker_count(),
                endpoint.size()
            ),
        ));
    }
    let range = config.range(rank);

    // 2. scatter
    let chunks = match coordinator_input {
        Some((input, _)) => Some(split_input(input, &config)?),
        None => None,
    };
    let rows = endpoint.scatter(chunks)?;
    let expected = range.row_count * config.in_row_bytes();
    if rows.len() != expected {
        return Err(RowGrayError::transport_failed(
            rank,
            "scatter",
            format!("received {} bytes, expected {expected}", rows.len()),
        ));
    }

    // 3. compute
    let slice = WorkerSlice::compute(&config, range, rows)?;
    debug!(
        rank,
        first_row = range.first_row,
        rows = range.row_count,
        "rank computed its slice"
    );

    // 4. gather
    match endpoint.gather(slice.output)? {
        Some(parts) => assemble(&config, parts).map(Some),
        None => Ok(None),
    }
}

/// Owned per-rank copies of the input rows, in rank order.
fn split_input(input: &ImageBuffer, config: &RunConfig) -> DistributedResult<Vec<Vec<u8>>> {
    config
        .ranges()
        .into_iter()
        .map(|range| {
            let bytes = input.row_byte_range(range.first_row, range.row_count);
            alloc_copy(&input.as_raw()[bytes], "worker input slice")
        })
        .collect()
}

/// Place each rank's output at its own row offset.
fn assemble(config: &RunConfig, parts: Vec<Vec<u8>>) -> DistributedResult<ImageBuffer> {
    let mut output = ImageBuffer::zeroed(config.width(), config.height(), config.out_channels())?;
    let row_bytes = config.out_row_bytes();
    for (rank, part) in parts.into_iter().enumerate() {
        let range = config.range(rank);
        let start = range.first_row * row_bytes;
        let end = range.end_row() * row_bytes;
        if part.len() != end - start {
            return Err(RowGrayError::transport_failed(
                rank,
                "gather",
                format!("slice has {} bytes, expected {}", part.len(), end - start),
            ));
        }
        output.as_raw_mut()[start..end].copy_from_slice(&part);
    }
    Ok(output)
}
