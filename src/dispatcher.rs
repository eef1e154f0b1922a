//! Write dispatcher (C6): drains a list of [`PlacementJob`]s against a
//! [`SubArrayStore`] with bounded concurrency, collecting per-job failures
//! instead of aborting the batch.
//!
//! Uses this crate's own codec-concurrency convention (`rayon` +
//! `rayon_iter_concurrent_limit::iter_concurrent_limit!`, as used
//! throughout the array read/write paths) rather than a hand-rolled
//! thread pool or channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;
use tracing::{info, warn};

use crate::error::JobFailure;
use crate::planner::PlacementJob;
use crate::store::SubArrayStore;

/// A cooperative cancellation signal, checked between jobs. Setting this
/// does not interrupt an in-flight write; it only stops new jobs from
/// starting.
pub type CancellationFlag = Arc<AtomicBool>;

/// The outcome of draining one batch of jobs.
#[derive(Debug)]
pub struct DispatchSummary {
    /// The number of jobs submitted.
    pub total: usize,
    /// The number of jobs that wrote successfully.
    pub succeeded: usize,
    /// Jobs that failed, in no particular order (concurrent completion).
    pub failed: Vec<JobFailure>,
    /// Whether the batch was cut short by cancellation.
    pub cancelled: bool,
}

impl DispatchSummary {
    /// Whether every submitted job succeeded and the batch ran to completion.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }
}

/// Drains [`PlacementJob`]s against a [`SubArrayStore`] with a fixed upper
/// bound on in-flight writes.
pub struct WriteDispatcher {
    parallelism: usize,
}

impl WriteDispatcher {
    /// Build a dispatcher bounded to `parallelism` concurrent writes. Values
    /// below `1` are clamped to `1` — parallelism is always at least
    /// sequential, never zero.
    #[must_use]
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    /// Run `jobs` to completion (or until `cancel` is observed set),
    /// returning a summary that never itself fails — per-job errors are
    /// collected as values.
    pub fn run(
        &self,
        jobs: Vec<PlacementJob>,
        store: &dyn SubArrayStore,
        cancel: &CancellationFlag,
    ) -> DispatchSummary {
        let total = jobs.len();
        info!(total, parallelism = self.parallelism, "dispatching placement jobs");

        let results: Vec<Result<(), JobFailure>> = iter_concurrent_limit!(
            self.parallelism,
            jobs.into_par_iter(),
            map,
            |job: PlacementJob| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(JobFailure {
                        destination: job.destination.full_path(),
                        cause: "cancelled before dispatch".to_string(),
                    });
                }
                store
                    .write_sub_array(&job.destination, &job.view)
                    .map_err(|cause| {
                        warn!(destination = %job.destination, %cause, "write failed");
                        JobFailure {
                            destination: job.destination.full_path(),
                            cause,
                        }
                    })
            }
        )
        .collect();

        let failed: Vec<JobFailure> = results.into_iter().filter_map(Result::err).collect();
        let succeeded = total - failed.len();
        let cancelled = cancel.load(Ordering::Relaxed);

        info!(succeeded, failed = failed.len(), cancelled, "batch complete");

        DispatchSummary {
            total,
            succeeded,
            failed,
            cancelled,
        }
    }
}
