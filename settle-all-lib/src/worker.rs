//! Workers: loops that drain a shared work source.
//!
//! A worker repeatedly claims the next item, runs it through the task runner,
//! and keeps the settled record together with the item's index. When the
//! source is exhausted the worker stops and hands everything it settled back
//! to the orchestrator as a [`WorkerReport`].

use crate::runner::run_task;
use crate::source::WorkQueue;
use crate::types::Settled;
use std::future::Future;
use std::time::{Duration, Instant};

/// Everything one worker settled, keyed by original input index.
#[derive(Debug)]
pub struct WorkerReport<R, E> {
    /// Worker number within its run (0-based)
    pub worker_id: usize,

    /// Settled records paired with the index they belong to
    pub settled: Vec<(usize, Settled<R, E>)>,

    /// Wall time from first claim attempt to exhaustion
    pub elapsed: Duration,
}

impl<R, E> WorkerReport<R, E> {
    /// Number of items this worker processed.
    pub fn processed(&self) -> usize {
        self.settled.len()
    }
}

/// Drain `source` through `transform` until it is exhausted.
///
/// A worker that finds the source already empty returns an empty report.
pub async fn drain<Q, F, Fut, R, E>(worker_id: usize, source: &Q, transform: &F) -> WorkerReport<R, E>
where
    Q: WorkQueue + ?Sized,
    F: Fn(Q::Value, usize, Q::Input) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let started = Instant::now();
    let mut settled = Vec::new();

    while let Some(item) = source.take_next() {
        let index = item.index;
        tracing::trace!(worker = worker_id, index, "claimed item");

        let task_started = Instant::now();
        let outcome = run_task(item, transform).await;
        tracing::debug!(
            worker = worker_id,
            index,
            status = outcome.status(),
            elapsed_ms = task_started.elapsed().as_millis() as u64,
            "item settled"
        );

        settled.push((index, outcome));
    }

    let elapsed = started.elapsed();
    tracing::debug!(
        worker = worker_id,
        items = settled.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "worker drained source"
    );

    WorkerReport {
        worker_id,
        settled,
        elapsed,
    }
}
