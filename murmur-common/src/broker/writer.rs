//! Durable-queue writer
//!
//! Produces one record kind to one topic. Writes are fire-and-forget: the
//! call enqueues into the producer's buffer and returns immediately, leaving
//! transient failures to the producer's internal retry policy. Only definite
//! failures (serialization, size violation, full local queue) surface
//! synchronously; delivery failures after retries are logged by an observer
//! task.

use std::marker::PhantomData;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::warn;

use crate::config::WriterConfig;
use crate::error::{Error, Result};
use crate::records::Record;

const ALIVE_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Generic producer for one topic.
pub struct Writer<T: Record> {
    producer: FutureProducer,
    topic: String,
    _kind: PhantomData<fn(T)>,
}

impl<T: Record> Writer<T> {
    pub fn new(cfg: &WriterConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", cfg.brokers.join(","))
            .set("client.id", &cfg.client_id)
            .set("message.send.max.retries", cfg.retries.to_string())
            .set("message.max.bytes", cfg.max_message_bytes.to_string())
            .set("acks", cfg.acks.as_broker_str())
            .set("compression.codec", cfg.compression.as_broker_str())
            .set("message.timeout.ms", cfg.timeout_ms.to_string())
            .create()?;

        Ok(Writer {
            producer,
            topic: cfg.topic.clone(),
            _kind: PhantomData,
        })
    }

    /// Bounded-timeout connectivity probe against the broker.
    pub fn check_alive(&self) -> Result<()> {
        self.producer
            .client()
            .fetch_metadata(None, ALIVE_PROBE_TIMEOUT)
            .map(|_| ())
            .map_err(Error::from)
    }

    /// Enqueue one record. Messages are sent unkeyed so the partitioner
    /// spreads them across partitions.
    pub fn write(&self, record: &T) -> Result<()> {
        let payload = serde_json::to_vec(record)
            .map_err(|e| Error::Internal(format!("encode record: {e}")))?;

        let message = FutureRecord::<(), _>::to(&self.topic).payload(&payload);

        match self.producer.send_result(message) {
            Ok(delivery) => {
                let topic = self.topic.clone();
                let uuid = record.uuid();
                tokio::spawn(async move {
                    match delivery.await {
                        Ok(Ok(_)) => {}
                        Ok(Err((e, _))) => {
                            warn!(topic, %uuid, error = %e, "record delivery failed");
                        }
                        Err(_) => {
                            warn!(topic, %uuid, "record delivery cancelled");
                        }
                    }
                });
                Ok(())
            }
            Err((e, _)) => Err(e.into()),
        }
    }
}
