//! murmur-updater configuration

use serde::Deserialize;

use murmur_common::config::{ReaderConfig, StartOffset, StorageConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub pool: PoolConfig,
}

/// One consumer group across the three stage topics.
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub group_id: String,
    #[serde(default)]
    pub topics: Topics,
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u32,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u32,
    #[serde(default = "default_commit_interval_ms")]
    pub commit_interval_ms: u64,
    #[serde(default = "default_start_offset")]
    pub start_offset: StartOffset,
}

impl KafkaConfig {
    /// Reader config for one of the three stage topics.
    pub fn reader_for(&self, topic: &str) -> ReaderConfig {
        ReaderConfig {
            brokers: self.brokers.clone(),
            topic: topic.to_string(),
            group_id: self.group_id.clone(),
            min_bytes: self.min_bytes,
            max_bytes: self.max_bytes,
            commit_interval_ms: self.commit_interval_ms,
            start_offset: self.start_offset,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topics {
    #[serde(default = "default_uploaded_topic")]
    pub uploaded: String,
    #[serde(default = "default_transcribed_topic")]
    pub transcribed: String,
    #[serde(default = "default_summarized_topic")]
    pub summarized: String,
}

impl Default for Topics {
    fn default() -> Self {
        Topics {
            uploaded: default_uploaded_topic(),
            transcribed: default_transcribed_topic(),
            summarized: default_summarized_topic(),
        }
    }
}

/// Worker pool tuning for the enforcer.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_multiplier")]
    pub queue_multiplier: usize,
}

impl PoolConfig {
    pub fn queue_capacity(&self) -> usize {
        self.workers.max(1) * self.queue_multiplier.max(1)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            workers: default_workers(),
            queue_multiplier: default_queue_multiplier(),
        }
    }
}

fn default_uploaded_topic() -> String {
    "uploaded".to_string()
}

fn default_transcribed_topic() -> String {
    "transcribed".to_string()
}

fn default_summarized_topic() -> String {
    "summarized".to_string()
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
    StartOffset::Earliest
}

fn default_workers() -> usize {
    8
}

fn default_queue_multiplier() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [storage]
            path = "/var/lib/murmur/murmur.db"

            [kafka]
            brokers = ["localhost:9092"]
            group_id = "murmur-updater"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.kafka.topics.uploaded, "uploaded");
        assert_eq!(cfg.kafka.topics.summarized, "summarized");
        assert_eq!(cfg.pool.workers, 8);
        assert_eq!(cfg.pool.queue_capacity(), 80);

        let reader = cfg.kafka.reader_for(&cfg.kafka.topics.transcribed);
        assert_eq!(reader.topic, "transcribed");
        assert_eq!(reader.group_id, "murmur-updater");
    }
}
