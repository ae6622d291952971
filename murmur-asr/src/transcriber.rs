//! Transcription transform
//!
//! External collaborator for the ASR stage: builds the audio object URL
//! from the blob gateway base, POSTs it to the speech-to-text service and
//! turns the response into a `TranscribedRecord`. No shared state is
//! touched here; the output record goes downstream via the stage writer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use murmur_common::error::{Error, Result};
use murmur_common::stage::Transform;
use murmur_common::{TranscribedRecord, UploadedRecord};

use crate::config::WhisperConfig;

#[derive(Debug, Serialize)]
struct TranscribeRequest {
    id: Uuid,
    audio_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    language: String,
}

pub struct WhisperTranscriber {
    http: reqwest::Client,
    api_url: String,
    blob_base_url: String,
}

impl WhisperTranscriber {
    pub fn new(cfg: &WhisperConfig) -> Self {
        WhisperTranscriber {
            http: reqwest::Client::new(),
            api_url: cfg.api_url.clone(),
            blob_base_url: cfg.blob_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Audio objects are stored under the artifact UUID plus the original
    /// extension.
    fn audio_url(&self, record: &UploadedRecord) -> String {
        format!(
            "{}/{}/{}{}",
            self.blob_base_url, record.bucket, record.uuid, record.update.og_extension
        )
    }
}

#[async_trait]
impl Transform for WhisperTranscriber {
    type In = UploadedRecord;
    type Out = TranscribedRecord;

    async fn apply(&self, input: UploadedRecord) -> Result<TranscribedRecord> {
        let request = TranscribeRequest {
            id: input.uuid,
            audio_url: self.audio_url(&input),
        };
        debug!(uuid = %input.uuid, url = %request.audio_url, "requesting transcription");

        let response = self
            .http
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("whisper request: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "whisper returned {}",
                response.status()
            )));
        }

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("whisper response: {e}")))?;

        Ok(TranscribedRecord {
            uuid: input.uuid,
            text: body.text,
            language: body.language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_common::records::UploadUpdate;

    #[test]
    fn audio_url_joins_gateway_bucket_and_object() {
        let transcriber = WhisperTranscriber::new(&WhisperConfig {
            api_url: "http://asr/transcribe".to_string(),
            blob_base_url: "http://blobs:9000/".to_string(),
        });
        let uuid = Uuid::new_v4();
        let record = UploadedRecord {
            uuid,
            bucket: "audio-input".to_string(),
            update: UploadUpdate {
                user_id: 1,
                og_file_name: "talk".to_string(),
                og_extension: ".wav".to_string(),
                status: 0,
            },
        };
        assert_eq!(
            transcriber.audio_url(&record),
            format!("http://blobs:9000/audio-input/{uuid}.wav")
        );
    }

    #[test]
    fn transcribe_request_wire_shape() {
        let req = TranscribeRequest {
            id: Uuid::nil(),
            audio_url: "http://blobs/b/o.wav".to_string(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("id").is_some());
        assert!(value.get("audio_url").is_some());
    }
}
