//! # Murmur Common Library
//!
//! Shared code for the murmur pipeline services including:
//! - Record types carried on the durable log (RecordKind per topic)
//! - Durable-queue reader/writer/pipeline (Kafka-backed)
//! - Stage executor (dispatcher + bounded worker pool + result sink)
//! - Metadata store with consistency-checked status transitions
//! - Configuration loading
//! - Common error types

pub mod broker;
pub mod config;
pub mod error;
pub mod records;
pub mod stage;
pub mod store;

pub use error::{Error, Result};
pub use records::{Record, Status, SummarizedRecord, TranscribedRecord, UploadedRecord};
