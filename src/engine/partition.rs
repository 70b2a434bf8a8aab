// src/engine/partition.rs
//
// Whole-row partitioning shared by every executor.
//
// Every worker gets `total_rows / worker_count` rows; the last worker also
// takes the remainder. The split is deliberately uneven in favor of a rule
// that each worker can evaluate on its own from three scalars.

use crate::error::RowGrayError;

/// Contiguous block of rows owned by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowRange {
    pub first_row: usize,
    pub row_count: usize,
}

impl RowRange {
    /// One past the last row.
    pub fn end_row(&self) -> usize {
        self.first_row + self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn overlaps(&self, other: &RowRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.first_row < other.end_row()
            && other.first_row < self.end_row()
    }
}

/// Rows per worker before the remainder is added to the last one.
pub fn base_rows(total_rows: usize, worker_count: usize) -> Result<usize, RowGrayError> {
    check(total_rows, worker_count)?;
    Ok(total_rows / worker_count)
}

/// Range for a single worker. Pure, so every worker can call it with its own
/// index and get the same answer the coordinator would.
pub fn row_range_for(
    total_rows: usize,
    worker_count: usize,
    worker: usize,
) -> Result<RowRange, RowGrayError> {
    let base = base_rows(total_rows, worker_count)?;
    if worker >= worker_count {
        return Err(RowGrayError::invalid_argument(
            "worker",
            worker.to_string(),
            format!("worker index must be below {worker_count}"),
        ));
    }
    Ok(range_from_base(total_rows, worker_count, base, worker))
}

/// All ranges, ordered by worker index.
///
/// When `worker_count > total_rows` the base is zero: every worker except the
/// last receives an empty range and the last one takes all rows. Empty ranges
/// are valid and their workers do nothing.
pub fn partition(total_rows: usize, worker_count: usize) -> Result<Vec<RowRange>, RowGrayError> {
    let base = base_rows(total_rows, worker_count)?;
    Ok((0..worker_count)
        .map(|worker| range_from_base(total_rows, worker_count, base, worker))
        .collect())
}

/// Same rule as [`partition`] but starting from a broadcast base row count.
/// Used by ranks that only know the scalars, not the coordinator's ranges.
pub(crate) fn range_from_base(
    total_rows: usize,
    worker_count: usize,
    base: usize,
    worker: usize,
) -> RowRange {
    let row_count = if worker + 1 == worker_count {
        base + total_rows % worker_count
    } else {
        base
    };
    RowRange {
        first_row: worker * base,
        row_count,
    }
}

fn check(total_rows: usize, worker_count: usize) -> Result<(), RowGrayError> {
    if total_rows == 0 || worker_count == 0 {
        return Err(RowGrayError::invalid_partition(total_rows, worker_count));
    }
    Ok(())
}
