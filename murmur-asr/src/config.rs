//! murmur-asr configuration

use serde::Deserialize;

use murmur_common::config::{ReaderConfig, StageConfig, WriterConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Consumer side: the `uploaded` topic
    pub reader: ReaderConfig,
    /// Producer side: the `transcribed` topic
    pub writer: WriterConfig,
    #[serde(default = "default_stage")]
    pub stage: StageConfig,
    pub whisper: WhisperConfig,
}

/// External speech-to-text service and blob gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct WhisperConfig {
    /// Transcription endpoint, POSTed `{ id, audio_url }`
    pub api_url: String,
    /// Base URL the service uses to fetch audio objects
    /// (`{base}/{bucket}/{object}`)
    pub blob_base_url: String,
}

fn default_stage() -> StageConfig {
    // Transcription is CPU-heavy on the service side; a small pool avoids
    // overloading it.
    StageConfig {
        workers: 4,
        ..StageConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses() {
        let cfg: Config = toml::from_str(
            r#"
            [reader]
            brokers = ["localhost:9092"]
            topic = "uploaded"
            group_id = "murmur-asr"

            [writer]
            brokers = ["localhost:9092"]
            topic = "transcribed"
            client_id = "murmur-asr"

            [whisper]
            api_url = "http://localhost:8000/transcribe"
            blob_base_url = "http://localhost:9000"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.stage.workers, 4);
        assert_eq!(cfg.reader.topic, "uploaded");
        assert_eq!(cfg.writer.topic, "transcribed");
    }
}
