//! Summarization transform
//!
//! External collaborator for the summarizer stage: sends the transcript to a
//! chat-completion endpoint and wraps the first choice as a
//! `SummarizedRecord`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use murmur_common::error::{Error, Result};
use murmur_common::stage::Transform;
use murmur_common::{SummarizedRecord, TranscribedRecord};

use crate::config::LlmConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

pub struct LlmSummarizer {
    http: reqwest::Client,
    cfg: LlmConfig,
}

impl LlmSummarizer {
    pub fn new(cfg: &LlmConfig) -> Self {
        LlmSummarizer {
            http: reqwest::Client::new(),
            cfg: cfg.clone(),
        }
    }
}

#[async_trait]
impl Transform for LlmSummarizer {
    type In = TranscribedRecord;
    type Out = SummarizedRecord;

    async fn apply(&self, input: TranscribedRecord) -> Result<SummarizedRecord> {
        let request = ChatRequest {
            model: &self.cfg.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.cfg.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &input.text,
                },
            ],
        };
        debug!(uuid = %input.uuid, chars = input.text.len(), "requesting summary");

        let mut builder = self.http.post(&self.cfg.api_url).json(&request);
        if let Some(key) = &self.cfg.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("llm request: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "llm returned {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("llm response: {e}")))?;

        let summary = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::ExternalService("llm returned no choices".to_string()))?;

        Ok(SummarizedRecord {
            uuid: input.uuid,
            text: summary,
        })
    }
}
