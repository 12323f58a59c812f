//! Bounded settle-all orchestration.
//!
//! This module launches a fixed number of workers over one shared work source,
//! waits for all of them, and assembles their settled records into a result
//! with exactly one entry per input, in input order.
//!
//! Two flavors are provided:
//!
//! - [`settle_all_bounded`] polls its workers concurrently inside the calling
//!   task. The input is borrowed and the transform needs no `Send` or `'static`.
//! - [`settle_all_bounded_spawned`] runs each worker as its own Tokio task, so
//!   workers execute in parallel on a multi-thread runtime.

use crate::slate::ResultSlate;
use crate::source::{SharedWorkSource, WorkSource};
use crate::types::{ConcurrencyLimit, SettleConfig, Settled};
use crate::worker::drain;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Map `transform` over `input` with at most `limit` transforms in flight.
///
/// Every input gets a [`Settled`] record at its own index: `Fulfilled` when the
/// transform returned `Ok`, `Rejected` with the untouched error otherwise. One
/// failing input never stops the others, and the call itself cannot fail.
///
/// `limit` is clamped into `[1, input.len()]`; pass [`ConcurrencyLimit::Unbounded`]
/// (or `None`) for one worker per input. Empty input returns immediately without
/// calling `transform`.
///
/// # Example
///
/// ```rust
/// use settle_all_lib::{settle_all_bounded, Settled};
///
/// # tokio_test::block_on(async {
/// let input = [10, 20, 30];
/// let results = settle_all_bounded(&input, |x, _, _| async move { Ok::<_, String>(x * 2) }, 2).await;
///
/// assert_eq!(results[1], Settled::Fulfilled { value: 40 });
/// # });
/// ```
pub async fn settle_all_bounded<'a, T, F, Fut, R, E>(
    input: &'a [T],
    transform: F,
    limit: impl Into<ConcurrencyLimit>,
) -> Vec<Settled<R, E>>
where
    F: Fn(&'a T, usize, &'a [T]) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    run_cooperative(input, &transform, limit.into(), None).await
}

/// Like [`settle_all_bounded`], but each worker runs as a spawned Tokio task.
///
/// The input is shared behind an `Arc` and each transform call receives an owned
/// clone of its value. A panic inside the transform is resumed on the caller.
///
/// Must be called from within a Tokio runtime.
pub async fn settle_all_bounded_spawned<T, F, Fut, R, E>(
    input: impl Into<Arc<[T]>>,
    transform: F,
    limit: impl Into<ConcurrencyLimit>,
) -> Vec<Settled<R, E>>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T, usize, Arc<[T]>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    run_spawned(input.into(), Arc::new(transform), limit.into(), None).await
}

async fn run_cooperative<'a, T, F, Fut, R, E>(
    input: &'a [T],
    transform: &F,
    limit: ConcurrencyLimit,
    label: Option<&str>,
) -> Vec<Settled<R, E>>
where
    F: Fn(&'a T, usize, &'a [T]) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    if input.is_empty() {
        return Vec::new();
    }

    let started = Instant::now();
    let worker_count = limit.clamp(input.len());
    tracing::debug!(
        run = label.unwrap_or("settle"),
        inputs = input.len(),
        workers = worker_count,
        "launching cooperative workers"
    );

    let source = WorkSource::new(input);
    let workers: Vec<_> = (0..worker_count)
        .map(|worker_id| drain(worker_id, &source, transform))
        .collect();

    let mut slate = ResultSlate::new(input.len());
    for report in futures::future::join_all(workers).await {
        slate.absorb(report);
    }

    finish(slate, label, started)
}

async fn run_spawned<T, F, Fut, R, E>(
    input: Arc<[T]>,
    transform: Arc<F>,
    limit: ConcurrencyLimit,
    label: Option<&str>,
) -> Vec<Settled<R, E>>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T, usize, Arc<[T]>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    if input.is_empty() {
        return Vec::new();
    }

    let started = Instant::now();
    let len = input.len();
    let worker_count = limit.clamp(len);
    tracing::debug!(
        run = label.unwrap_or("settle"),
        inputs = len,
        workers = worker_count,
        "launching spawned workers"
    );

    let source = Arc::new(SharedWorkSource::new(input));
    let mut workers = JoinSet::new();
    for worker_id in 0..worker_count {
        let source = Arc::clone(&source);
        let transform = Arc::clone(&transform);
        workers.spawn(async move { drain(worker_id, source.as_ref(), transform.as_ref()).await });
    }

    let mut slate = ResultSlate::new(len);
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(report) => slate.absorb(report),
            Err(err) => match err.try_into_panic() {
                Ok(payload) => std::panic::resume_unwind(payload),
                // Workers are never aborted here; this only happens on runtime shutdown
                Err(err) => panic!("settle worker did not finish: {}", err),
            },
        }
    }

    finish(slate, label, started)
}

fn finish<R, E>(slate: ResultSlate<R, E>, label: Option<&str>, started: Instant) -> Vec<Settled<R, E>> {
    let results = slate.into_results();
    let rejected = results.iter().filter(|s| s.is_rejected()).count();
    tracing::debug!(
        run = label.unwrap_or("settle"),
        fulfilled = results.len() - rejected,
        rejected,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "all inputs settled"
    );
    results
}

/// Bounded settle-all runner holding a [`SettleConfig`].
///
/// # Example
///
/// ```rust
/// use settle_all_lib::{SettleConfig, Settler};
///
/// # tokio_test::block_on(async {
/// let settler = Settler::with_config(SettleConfig::default().with_concurrency(2usize));
/// let input = ["1", "x", "3"];
/// let results = settler.settle(&input, |s, _, _| async move { s.parse::<u32>() }).await;
///
/// assert!(results[0].is_fulfilled());
/// assert!(results[1].is_rejected());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Settler {
    config: SettleConfig,
}

impl Settler {
    /// Create a settler with an unbounded concurrency limit.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SettleConfig) -> Self {
        Self { config }
    }

    /// Settle every input with workers polled inside the calling task.
    ///
    /// See [`settle_all_bounded`].
    pub async fn settle<'a, T, F, Fut, R, E>(&self, input: &'a [T], transform: F) -> Vec<Settled<R, E>>
    where
        F: Fn(&'a T, usize, &'a [T]) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        run_cooperative(
            input,
            &transform,
            self.config.concurrency,
            self.config.label.as_deref(),
        )
        .await
    }

    /// Settle every input with workers spawned as Tokio tasks.
    ///
    /// See [`settle_all_bounded_spawned`].
    pub async fn settle_spawned<T, F, Fut, R, E>(
        &self,
        input: impl Into<Arc<[T]>>,
        transform: F,
    ) -> Vec<Settled<R, E>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T, usize, Arc<[T]>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        run_spawned(
            input.into(),
            Arc::new(transform),
            self.config.concurrency,
            self.config.label.as_deref(),
        )
        .await
    }

    /// Number of workers a run over `len` inputs would launch.
    pub fn worker_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.config.concurrency.clamp(len)
        }
    }

    pub fn config(&self) -> &SettleConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SettleConfig) {
        self.config = config;
    }
}
