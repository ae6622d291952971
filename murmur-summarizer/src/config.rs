//! murmur-summarizer configuration

use serde::Deserialize;

use murmur_common::config::{ReaderConfig, StageConfig, WriterConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Consumer side: the `transcribed` topic
    pub reader: ReaderConfig,
    /// Producer side: the `summarized` topic
    pub writer: WriterConfig,
    #[serde(default = "default_stage")]
    pub stage: StageConfig,
    pub llm: LlmConfig,
}

/// External chat-completion service.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint
    pub api_url: String,
    pub model: String,
    /// Bearer token, if the endpoint requires one
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_stage() -> StageConfig {
    // LLM calls are I/O-dominated; a large pool keeps throughput up.
    StageConfig {
        workers: 16,
        ..StageConfig::default()
    }
}

fn default_system_prompt() -> String {
    "Summarize the following transcript concisely, keeping key decisions and action items."
        .to_string()
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
            topic = "transcribed"
            group_id = "murmur-summarizer"

            [writer]
            brokers = ["localhost:9092"]
            topic = "summarized"
            client_id = "murmur-summarizer"

            [llm]
            api_url = "https://api.openai.com/v1/chat/completions"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.stage.workers, 16);
        assert!(cfg.llm.api_key.is_none());
        assert!(cfg.llm.system_prompt.contains("Summarize"));
    }
}
