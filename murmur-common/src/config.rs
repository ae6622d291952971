//! Configuration loading
//!
//! Each service deserializes its own TOML config file into explicit structs
//! that are passed into components at construction. The config path comes
//! from a CLI flag or the `CONFIG_PATH` environment variable (clap handles
//! the precedence); there are no process-wide configuration singletons.

use std::path::Path;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize};

use crate::error::{Error, Result};

/// Load and deserialize a TOML config file.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
    toml::from_str(&raw).map_err(|e| Error::Config(format!("parse {}: {e}", path.display())))
}

/// Where a new consumer group starts reading a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOffset {
    Earliest,
    Latest,
}

/// Producer acknowledgment level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Acks {
    #[serde(rename = "0")]
    None,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "all")]
    All,
}

impl Acks {
    pub(crate) fn as_broker_str(self) -> &'static str {
        match self {
            Acks::None => "0",
            Acks::One => "1",
            Acks::All => "all",
        }
    }
}

/// Producer compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    pub(crate) fn as_broker_str(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }
}

/// Durable-queue consumer configuration for one topic.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub group_id: String,
    /// Minimum fetch size in bytes
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u32,
    /// Maximum fetch size in bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u32,
    /// How often stored offsets are committed back to the broker
    #[serde(default = "default_commit_interval_ms")]
    pub commit_interval_ms: u64,
    #[serde(default = "default_start_offset")]
    pub start_offset: StartOffset,
}

/// Durable-queue producer configuration for one topic.
#[derive(Debug, Clone, Deserialize)]
pub struct WriterConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub client_id: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: u32,
    #[serde(default = "default_acks")]
    pub acks: Acks,
    #[serde(default = "default_compression")]
    pub compression: Compression,
    #[serde(default = "default_write_timeout_ms")]
    pub timeout_ms: u64,
}

/// Stage executor tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Worker pool size
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Work-queue capacity = workers * queue_multiplier
    #[serde(default = "default_queue_multiplier")]
    pub queue_multiplier: usize,
    /// Per-job deadline for the stage transform, in seconds
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

impl StageConfig {
    pub fn queue_capacity(&self) -> usize {
        self.workers.max(1) * self.queue_multiplier.max(1)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        StageConfig {
            workers: default_workers(),
            queue_multiplier: default_queue_multiplier(),
            job_timeout_secs: default_job_timeout_secs(),
        }
    }
}

/// Metadata store location.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub path: std::path::PathBuf,
}

fn default_min_bytes() -> u32 {
    1
}

fn default_max_bytes() -> u32 {
    1024 * 1024
}

fn default_commit_interval_ms() -> u64 {
    1000
}

fn default_start_offset() -> StartOffset {
    StartOffset::Latest
}

fn default_retries() -> u32 {
    5
}

fn default_max_message_bytes() -> u32 {
    1024 * 1024
}

fn default_acks() -> Acks {
    Acks::All
}

fn default_compression() -> Compression {
    Compression::Lz4
}

fn default_write_timeout_ms() -> u64 {
    5000
}

fn default_workers() -> usize {
    4
}

fn default_queue_multiplier() -> usize {
    10
}

fn default_job_timeout_secs() -> u64 {
    300
}
