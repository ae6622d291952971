//! Stage executor
//!
//! Turns one pipeline (reader + writer) into a running concurrent process:
//!
//! - a single dispatcher task drains the reader's record stream into a
//!   bounded work queue (capacity = workers × multiplier); when the queue is
//!   full the dispatcher blocks, which is the system's backpressure against
//!   the durable log;
//! - a fixed pool of workers pops jobs, applies the stage transform under a
//!   per-job deadline, and writes the output record through the sink;
//! - a single result sink drains per-job outcomes, logging failures. There
//!   is no retry or requeue at this layer: a failed job surfaces only as a
//!   stuck artifact status.
//!
//! A single job's failure never stops the pool or the dispatcher. Only a
//! reader-level broker failure or cancellation stops the executor; on
//! cancellation in-flight jobs finish and remaining results are drained.
//!
//! Workers run concurrently, so downstream write order is not input order.
//! Consumers must not rely on cross-record ordering.

pub mod sink;
pub mod transform;

pub use sink::RecordSink;
pub use transform::Transform;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::{Pipeline, Writer};
use crate::config::StageConfig;
use crate::error::{Error, Result};
use crate::records::Record;

/// Per-stage job counters, shared with the result sink.
#[derive(Debug, Default)]
pub struct StageMetrics {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl StageMetrics {
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Outcome of one job, reported to the result sink.
struct JobOutcome {
    uuid: Uuid,
    result: Result<()>,
}

/// Dispatcher + worker pool + result sink for one processing stage.
pub struct StageExecutor<F, S>
where
    F: Transform,
    S: RecordSink<F::Out>,
{
    config: StageConfig,
    transform: Arc<F>,
    sink: Arc<S>,
    metrics: Arc<StageMetrics>,
}

impl<F, S> StageExecutor<F, S>
where
    F: Transform,
    S: RecordSink<F::Out>,
{
    pub fn new(config: StageConfig, transform: Arc<F>, sink: Arc<S>) -> Self {
        StageExecutor {
            config,
            transform,
            sink,
            metrics: Arc::new(StageMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<StageMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the stage until the record stream ends, the reader reports a
    /// terminal error, or `cancel` fires. Returns after the work queue and
    /// results are fully drained.
    pub async fn run(
        &self,
        records: mpsc::Receiver<F::In>,
        errors: mpsc::Receiver<Error>,
        cancel: CancellationToken,
    ) {
        let capacity = self.config.queue_capacity();
        let (jobs_tx, jobs_rx) = mpsc::channel::<F::In>(capacity);
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        let (results_tx, results_rx) = mpsc::channel::<JobOutcome>(capacity);

        let dispatcher = tokio::spawn(dispatch(
            records,
            errors,
            jobs_tx,
            cancel,
            Arc::clone(&self.metrics),
        ));

        let workers: Vec<JoinHandle<()>> = (0..self.config.workers.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&jobs_rx),
                    Arc::clone(&self.transform),
                    Arc::clone(&self.sink),
                    results_tx.clone(),
                    self.config.job_timeout(),
                ))
            })
            .collect();
        drop(results_tx);

        let result_sink = tokio::spawn(drain_results(results_rx, Arc::clone(&self.metrics)));

        let _ = dispatcher.await;
        for worker in workers {
            let _ = worker.await;
        }
        let _ = result_sink.await;
    }
}

impl<F: Transform> StageExecutor<F, Writer<F::Out>> {
    /// Wire a `Pipeline` into a running executor.
    pub async fn run_pipeline(
        config: StageConfig,
        transform: Arc<F>,
        pipeline: Pipeline<F::In, F::Out>,
        cancel: CancellationToken,
    ) -> Arc<StageMetrics> {
        let Pipeline { reader, writer } = pipeline;
        let (records, errors) = reader.messages(cancel.clone());
        let executor = StageExecutor::new(config, transform, Arc::new(writer));
        let metrics = executor.metrics();
        executor.run(records, errors, cancel).await;
        metrics
    }
}

/// Single task feeding the bounded work queue from the reader streams.
async fn dispatch<T: Record>(
    mut records: mpsc::Receiver<T>,
    mut errors: mpsc::Receiver<Error>,
    jobs_tx: mpsc::Sender<T>,
    cancel: CancellationToken,
    metrics: Arc<StageMetrics>,
) {
    let mut errors_closed = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("dispatcher cancelled, closing work queue");
                break;
            }
            err = errors.recv(), if !errors_closed => match err {
                Some(e) => {
                    error!(error = %e, "reader failed, stopping stage");
                    break;
                }
                None => errors_closed = true,
            },
            rec = records.recv() => match rec {
                Some(record) => {
                    // Blocks while the queue is full: backpressure against
                    // the durable log.
                    if jobs_tx.send(record).await.is_err() {
                        break;
                    }
                    metrics.dispatched.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    debug!("record stream closed, closing work queue");
                    break;
                }
            },
        }
    }
    // Dropping jobs_tx closes the queue; workers drain what is left.
}

/// One worker: pop a job, transform under deadline, write downstream,
/// report the outcome.
async fn worker_loop<F, S>(
    id: usize,
    jobs_rx: Arc<Mutex<mpsc::Receiver<F::In>>>,
    transform: Arc<F>,
    sink: Arc<S>,
    results_tx: mpsc::Sender<JobOutcome>,
    job_timeout: std::time::Duration,
) where
    F: Transform,
    S: RecordSink<F::Out>,
{
    debug!(worker = id, "worker listening");
    loop {
        let job = {
            let mut rx = jobs_rx.lock().await;
            rx.recv().await
        };
        let Some(input) = job else {
            debug!(worker = id, "work queue closed, worker exiting");
            break;
        };

        let uuid = input.uuid();
        let result = process_job(&*transform, &*sink, input, job_timeout).await;
        if results_tx
            .send(JobOutcome { uuid, result })
            .await
            .is_err()
        {
            break;
        }
    }
}

async fn process_job<F, S>(
    transform: &F,
    sink: &S,
    input: F::In,
    job_timeout: std::time::Duration,
) -> Result<()>
where
    F: Transform,
    S: RecordSink<F::Out>,
{
    let output = match tokio::time::timeout(job_timeout, transform.apply(input)).await {
        Err(_) => return Err(Error::TransformTimeout(job_timeout)),
        Ok(Err(e)) => return Err(e),
        Ok(Ok(output)) => output,
    };
    sink.write(&output).await
}

/// Single task observing per-job outcomes. Failures are logged and counted;
/// there is no retry or requeue.
async fn drain_results(mut results: mpsc::Receiver<JobOutcome>, metrics: Arc<StageMetrics>) {
    while let Some(outcome) = results.recv().await {
        match outcome.result {
            Ok(()) => {
                metrics.succeeded.fetch_add(1, Ordering::Relaxed);
                debug!(uuid = %outcome.uuid, "job completed");
            }
            Err(e) => {
                metrics.failed.fetch_add(1, Ordering::Relaxed);
                warn!(uuid = %outcome.uuid, error = %e, "job failed");
            }
        }
    }
    info!(
        dispatched = metrics.dispatched(),
        succeeded = metrics.succeeded(),
        failed = metrics.failed(),
        "stage drained"
    );
}
