//! Batch planning and windowed concurrent fetching.

use futures::future::join_all;

use crate::error::{Error, Result};
use crate::fetcher::FetchWorker;
use crate::types::{FetchOutcome, ProductId, ProductRecord};

/// A batch of pending identifiers bound to its output unit
#[derive(Clone, Debug, PartialEq)]
pub(super) struct PlannedBatch {
    /// 0-based batch index; the unit is `products_<index + 1>.json`
    pub(super) index: u32,
    pub(super) ids: Vec<ProductId>,
}

impl PlannedBatch {
    /// 1-based batch number as used in file names
    pub(super) fn number(&self) -> u32 {
        self.index + 1
    }
}

/// Split `pending` into consecutive batches of `batch_size`, numbered from
/// `first_index`.
///
/// Fails when a batch number would not fit in `u32`, which only happens when the
/// output directory already holds a unit numbered near `u32::MAX`.
pub(super) fn plan_batches(
    pending: Vec<ProductId>,
    batch_size: usize,
    first_index: u32,
) -> Result<Vec<PlannedBatch>> {
    pending
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(offset, ids)| {
            let index = u32::try_from(offset)
                .ok()
                .and_then(|offset| first_index.checked_add(offset))
                .filter(|index| *index < u32::MAX)
                .ok_or_else(|| {
                    Error::Other(format!(
                        "batch numbers exhausted: cannot number a unit after products_{first_index}.json"
                    ))
                })?;
            Ok(PlannedBatch {
                index,
                ids: ids.to_vec(),
            })
        })
        .collect()
}

/// Fetch every identifier of a batch, `concurrency` at a time.
///
/// Each window runs fully in parallel and is awaited as a whole before the next one
/// starts. Successful records are returned in input order; failures are already
/// recorded in the tracker by the worker.
pub(super) async fn fetch_batch(
    worker: &FetchWorker,
    ids: &[ProductId],
    concurrency: usize,
) -> Vec<ProductRecord> {
    let mut records = Vec::with_capacity(ids.len());

    for (window_index, window) in ids.chunks(concurrency.max(1)).enumerate() {
        let outcomes = join_all(window.iter().map(|id| worker.fetch(id))).await;

        let before = records.len();
        records.extend(outcomes.into_iter().filter_map(FetchOutcome::into_record));
        tracing::debug!(
            window = window_index + 1,
            size = window.len(),
            fetched = records.len() - before,
            "Window complete"
        );
    }

    records
}
