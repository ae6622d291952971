//! Common error types for the murmur pipeline services

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Common result type for murmur operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the murmur services
#[derive(Error, Debug)]
pub enum Error {
    /// Broker connectivity or produce/consume failure (wraps rdkafka errors)
    #[error("Broker error: {0}")]
    Broker(#[from] rdkafka::error::KafkaError),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record with this UUID already exists at the targeted stage
    #[error("Duplicate record: {0}")]
    DuplicateRecord(Uuid),

    /// Status regression attempt; the store is left unchanged
    #[error("Stale status for {uuid}: stored {current}, requested {requested}")]
    StaleStatus {
        uuid: Uuid,
        current: i64,
        requested: i64,
    },

    /// Record payload failed to decode against the topic schema
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// External transform dependency (blob gateway, ASR, LLM) failed
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Stage transform exceeded its configured deadline
    #[error("Transform timed out after {0:?}")]
    TransformTimeout(Duration),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Duplicate inserts and stale status transitions are routine outcomes
    /// under at-least-once redelivery and are logged rather than escalated.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            Error::DuplicateRecord(_) | Error::StaleStatus { .. }
        )
    }
}
