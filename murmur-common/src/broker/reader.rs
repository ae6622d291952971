//! Durable-queue reader
//!
//! Consumes one topic through a named consumer group and exposes the decoded
//! records as a channel pair, mirroring the dispatcher's select loop shape:
//! one channel of records, one channel of terminal errors.
//!
//! At-least-once delivery: the offset for a message is stored only after the
//! decoded record has been handed off downstream, and stored offsets are
//! committed on the configured interval. A crash between hand-off and commit
//! redelivers the record on restart; it is never lost.

use std::marker::PhantomData;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::broker::decode::{self, DecodePolicy, SkipAndLog};
use crate::config::{ReaderConfig, StartOffset};
use crate::error::{Error, Result};
use crate::records::Record;

/// Probe deadline for `check_alive`.
const ALIVE_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Generic consumer for one topic.
pub struct Reader<T: Record> {
    consumer: StreamConsumer,
    topic: String,
    policy: Box<dyn DecodePolicy>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Record> Reader<T> {
    pub fn new(cfg: &ReaderConfig) -> Result<Self> {
        let start_offset = match cfg.start_offset {
            StartOffset::Earliest => "earliest",
            StartOffset::Latest => "latest",
        };

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", cfg.brokers.join(","))
            .set("group.id", &cfg.group_id)
            .set("fetch.min.bytes", cfg.min_bytes.to_string())
            .set("fetch.max.bytes", cfg.max_bytes.to_string())
            .set("auto.offset.reset", start_offset)
            // Offsets are stored manually after hand-off; the interval only
            // drives how often stored offsets are flushed to the broker.
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", cfg.commit_interval_ms.to_string())
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false")
            .create()?;

        consumer.subscribe(&[cfg.topic.as_str()])?;

        Ok(Reader {
            consumer,
            topic: cfg.topic.clone(),
            policy: Box::new(SkipAndLog),
            _kind: PhantomData,
        })
    }

    /// Replace the malformed-record policy (e.g. with a dead-letter producer).
    pub fn with_decode_policy(mut self, policy: Box<dyn DecodePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Bounded-timeout connectivity probe against the broker.
    pub fn check_alive(&self) -> Result<()> {
        self.consumer
            .fetch_metadata(None, ALIVE_PROBE_TIMEOUT)
            .map(|_| ())
            .map_err(Error::from)
    }

    /// Start consuming. Returns the record stream and the error stream; both
    /// close when `cancel` fires or the broker connection fails
    /// unrecoverably.
    pub fn messages(
        self,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<T>, mpsc::Receiver<Error>) {
        // Capacity 1 keeps the hand-off tight: the offset for a record is
        // stored as soon as the downstream has taken it, not earlier.
        let (record_tx, record_rx) = mpsc::channel::<T>(1);
        let (err_tx, err_rx) = mpsc::channel::<Error>(1);

        let Reader {
            consumer,
            topic,
            policy,
            ..
        } = self;

        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(topic, "reader cancelled");
                        break;
                    }
                    res = consumer.recv() => match res {
                        Ok(m) => m,
                        Err(e) => {
                            error!(topic, error = %e, "broker consume failed");
                            let _ = err_tx.send(e.into()).await;
                            break;
                        }
                    },
                };

                let payload = message.payload().unwrap_or_default();
                let record = match decode::decode::<T>(payload) {
                    Ok(record) => record,
                    Err(e) => {
                        policy.on_malformed(&topic, &e);
                        continue;
                    }
                };

                if record_tx.send(record).await.is_err() {
                    // Downstream hung up; stop without storing the offset so
                    // the record is redelivered.
                    break;
                }

                if let Err(e) = consumer.store_offset_from_message(&message) {
                    error!(topic, error = %e, "failed to store offset");
                    let _ = err_tx.send(e.into()).await;
                    break;
                }
            }
        });

        (record_rx, err_rx)
    }
}
