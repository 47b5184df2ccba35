//! Bounded-concurrency worker pool.
//!
//! Jobs go into a shared `async_channel` queue that a fixed number of tokio
//! tasks drain. Results are handed back to the calling task in completion
//! order, so the result callback needs neither `Send` nor `'static`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between a caller and a running load.
///
/// Once cancelled, workers finish the job they hold and stop taking new
/// ones; the jobs left in the queue are reported as skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Run `work` over `jobs` with at most `concurrency` jobs in flight.
///
/// `on_result` receives every job exactly once: with `Some(output)` when a
/// worker ran it, or `None` when it was still queued at cancellation.
/// Returns after every job has been reported.
pub(crate) async fn run_pool<J, T, W, Fut, R>(
    jobs: Vec<J>,
    concurrency: usize,
    cancel: &CancelToken,
    work: W,
    mut on_result: R,
) where
    J: Clone + Send + 'static,
    T: Send + 'static,
    W: Fn(J) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    R: FnMut(J, Option<T>),
{
    if jobs.is_empty() {
        return;
    }

    let workers = concurrency.clamp(1, jobs.len());
    let (job_tx, job_rx) = async_channel::unbounded();
    for job in jobs {
        // The receiver is alive, so the unbounded send cannot fail.
        let _ = job_tx.try_send(job);
    }
    job_tx.close();

    let (result_tx, result_rx) = async_channel::unbounded();
    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let jobs = job_rx.clone();
        let results = result_tx.clone();
        let work = work.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            while !cancel.is_cancelled() {
                let Ok(job) = jobs.recv().await else {
                    break;
                };
                let output = work(job.clone()).await;
                if results.send((job, output)).await.is_err() {
                    break;
                }
            }
            tracing::trace!(worker, "worker finished");
        }));
    }
    drop(result_tx);

    while let Ok((job, output)) = result_rx.recv().await {
        on_result(job, Some(output));
    }

    for handle in handles {
        if let Err(error) = handle.await {
            tracing::error!(%error, "worker task failed");
        }
    }

    while let Ok(job) = job_rx.try_recv() {
        on_result(job, None);
    }
}
