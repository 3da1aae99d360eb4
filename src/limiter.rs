//! Throttled batch runner.
//!
//! Takes a list of deferred tasks (closures that build a future when called)
//! and runs them with a bounded number in flight, spacing consecutive starts
//! by a minimum delay. The output is index-aligned with the input no matter
//! which order the tasks complete in.
//!
//! A failing task is logged and recorded at its index; it never aborts the
//! rest of the batch. Nothing is retried.

use futures::stream::{self, StreamExt};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// How hard a batch may hit the remote site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    /// Maximum tasks in flight. Values below 1 are treated as 1.
    pub concurrency: usize,
    /// Minimum gap between two consecutive task starts.
    pub delay: Duration,
}

impl Throttle {
    pub fn new(concurrency: usize, delay: Duration) -> Self {
        Self { concurrency, delay }
    }
}

/// Why a slot in the output holds no value.
#[derive(Debug)]
pub enum TaskError<E> {
    /// The task ran and returned an error.
    Failed(E),
    /// The batch was cancelled before the task finished.
    Cancelled,
}

impl<E: fmt::Display> fmt::Display for TaskError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Failed(e) => write!(f, "task failed: {e}"),
            TaskError::Cancelled => write!(f, "task cancelled"),
        }
    }
}

/// Serialises task starts so that two starts are at least `delay` apart.
///
/// The tokio mutex is FIFO, so starts follow admission order.
struct StartGate {
    delay: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl StartGate {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_start: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let mut last = self.last_start.lock().await;
        if let Some(prev) = *last {
            if !self.delay.is_zero() {
                sleep_until(prev + self.delay).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Run every task under `throttle`, returning one entry per task in input order.
#[instrument(level = "debug", skip_all, fields(tasks = tasks.len(), concurrency = throttle.concurrency, delay_ms = throttle.delay.as_millis() as u64))]
pub async fn run_throttled<T, E, F, Fut>(
    tasks: Vec<F>,
    throttle: Throttle,
    cancel: &CancellationToken,
) -> Vec<Result<T, TaskError<E>>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let concurrency = throttle.concurrency.max(1);
    let gate = StartGate::new(throttle.delay);
    let gate = &gate;

    let mut indexed: Vec<(usize, Result<T, TaskError<E>>)> = stream::iter(tasks.into_iter().enumerate())
        .map(move |(index, task)| async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TaskError::Cancelled),
                res = async {
                    gate.wait_turn().await;
                    debug!(index, "task starting");
                    task().await
                } => res.map_err(TaskError::Failed),
            };

            match &outcome {
                Err(TaskError::Failed(e)) => {
                    warn!(index, error = %e, "Task failed; continuing with the rest of the batch")
                }
                Err(TaskError::Cancelled) => debug!(index, "task cancelled"),
                Ok(_) => {}
            }
            (index, outcome)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, outcome)| outcome).collect()
}
