//! Status consistency enforcer
//!
//! Three forwarder tasks (one per stage topic) feed a single bounded job
//! queue; a worker pool applies exactly one consistency-checked transition
//! per record to the metadata store; a result sink observes outcomes.
//!
//! Consistency violations (duplicate insert, stale status) are routine under
//! at-least-once redelivery: they are logged at warn and never escalated.
//! A duplicate text insert still proceeds to the status raise, so a crash
//! between the insert and the status update is healed when the record is
//! redelivered.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use murmur_common::error::{Error, Result};
use murmur_common::records::{Record, Status, SummarizedRecord, TranscribedRecord, UploadedRecord};
use murmur_common::store::MetadataStore;

use crate::config::PoolConfig;

/// One record from any of the three stage topics. Dispatch is by explicit
/// variant, matched exhaustively; there is no open-ended type inspection.
#[derive(Debug, Clone)]
pub enum StageRecord {
    Uploaded(UploadedRecord),
    Transcribed(TranscribedRecord),
    Summarized(SummarizedRecord),
}

impl StageRecord {
    pub fn uuid(&self) -> Uuid {
        match self {
            StageRecord::Uploaded(r) => r.uuid,
            StageRecord::Transcribed(r) => r.uuid,
            StageRecord::Summarized(r) => r.uuid,
        }
    }
}

/// Record and error streams for one stage topic, as produced by
/// `Reader::messages`.
pub type TopicStreams<T> = (mpsc::Receiver<T>, mpsc::Receiver<Error>);

/// Apply one record's transition to the store.
///
/// Duplicate-insert violations on the text tables are swallowed (logged)
/// because they mark a redelivered record; the status raise still runs.
/// Transient store errors propagate to the result sink.
pub async fn apply(store: &MetadataStore, record: StageRecord) -> Result<()> {
    match record {
        StageRecord::Uploaded(rec) => store.add_file(&rec).await,
        StageRecord::Transcribed(rec) => {
            match store.add_transcription(&rec).await {
                Ok(()) => {}
                Err(e) if e.is_consistency_violation() => {
                    warn!(uuid = %rec.uuid, error = %e, "transcription already stored, redelivery assumed");
                }
                Err(e) => return Err(e),
            }
            raise_status(store, rec.uuid, Status::Transcribed).await
        }
        StageRecord::Summarized(rec) => {
            match store.add_summarization(&rec).await {
                Ok(()) => {}
                Err(e) if e.is_consistency_violation() => {
                    warn!(uuid = %rec.uuid, error = %e, "summary already stored, redelivery assumed");
                }
                Err(e) => return Err(e),
            }
            raise_status(store, rec.uuid, Status::Summarized).await
        }
    }
}

async fn raise_status(store: &MetadataStore, uuid: Uuid, status: Status) -> Result<()> {
    match store.update_status(uuid, status).await {
        Err(e) if e.is_consistency_violation() => {
            warn!(%uuid, error = %e, "stale status transition rejected");
            Ok(())
        }
        other => other,
    }
}

/// Run the enforcer until all three topics stop (cancellation or reader
/// failure). Returns after the job queue and results are drained.
pub async fn run(
    store: Arc<MetadataStore>,
    uploaded: TopicStreams<UploadedRecord>,
    transcribed: TopicStreams<TranscribedRecord>,
    summarized: TopicStreams<SummarizedRecord>,
    pool: &PoolConfig,
    cancel: CancellationToken,
) {
    let capacity = pool.queue_capacity();
    let (jobs_tx, jobs_rx) = mpsc::channel::<StageRecord>(capacity);
    let jobs_rx = Arc::new(Mutex::new(jobs_rx));
    let (results_tx, mut results_rx) = mpsc::channel::<Result<Uuid>>(capacity);

    let forwarders = vec![
        tokio::spawn(forward(
            uploaded,
            jobs_tx.clone(),
            cancel.clone(),
            StageRecord::Uploaded,
        )),
        tokio::spawn(forward(
            transcribed,
            jobs_tx.clone(),
            cancel.clone(),
            StageRecord::Transcribed,
        )),
        tokio::spawn(forward(
            summarized,
            jobs_tx.clone(),
            cancel.clone(),
            StageRecord::Summarized,
        )),
    ];
    drop(jobs_tx);

    let workers: Vec<JoinHandle<()>> = (0..pool.workers.max(1))
        .map(|id| {
            let store = Arc::clone(&store);
            let jobs_rx = Arc::clone(&jobs_rx);
            let results_tx = results_tx.clone();
            tokio::spawn(async move {
                debug!(worker = id, "enforcer worker listening");
                loop {
                    let job = {
                        let mut rx = jobs_rx.lock().await;
                        rx.recv().await
                    };
                    let Some(record) = job else { break };
                    let uuid = record.uuid();
                    let result = apply(&store, record).await.map(|()| uuid);
                    if results_tx.send(result).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(results_tx);

    let result_sink = tokio::spawn(async move {
        let mut applied: u64 = 0;
        let mut failed: u64 = 0;
        while let Some(result) = results_rx.recv().await {
            match result {
                Ok(uuid) => {
                    applied += 1;
                    debug!(%uuid, "transition applied");
                }
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "transition failed");
                }
            }
        }
        info!(applied, failed, "enforcer drained");
    });

    for forwarder in forwarders {
        let _ = forwarder.await;
    }
    for worker in workers {
        let _ = worker.await;
    }
    let _ = result_sink.await;
}

/// Drain one topic's streams into the shared job queue.
async fn forward<T: Record>(
    streams: TopicStreams<T>,
    jobs: mpsc::Sender<StageRecord>,
    cancel: CancellationToken,
    wrap: fn(T) -> StageRecord,
) {
    let (mut records, mut errors) = streams;
    let mut errors_closed = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("forwarder cancelled");
                break;
            }
            err = errors.recv(), if !errors_closed => match err {
                Some(e) => {
                    error!(error = %e, "reader failed, forwarder stopping");
                    break;
                }
                None => errors_closed = true,
            },
            rec = records.recv() => match rec {
                Some(record) => {
                    if jobs.send(wrap(record)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}
