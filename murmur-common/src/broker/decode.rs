//! Record decoding and the malformed-record policy
//!
//! Malformed payloads are dropped, not dead-lettered. The drop behavior
//! lives behind `DecodePolicy` so a dead-letter producer can replace
//! `SkipAndLog` without touching the reader loop.

use tracing::warn;

use crate::error::{Error, Result};
use crate::records::Record;

/// Decode one payload against the topic schema.
pub fn decode<T: Record>(payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(|e| Error::MalformedRecord(e.to_string()))
}

/// What the reader does with a payload that fails to decode.
pub trait DecodePolicy: Send + Sync + 'static {
    fn on_malformed(&self, topic: &str, error: &Error);
}

/// Default policy: log the record and keep consuming.
pub struct SkipAndLog;

impl DecodePolicy for SkipAndLog {
    fn on_malformed(&self, topic: &str, error: &Error) {
        warn!(topic, %error, "dropping malformed record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TranscribedRecord;

    #[test]
    fn decode_valid_payload() {
        let payload = br#"{"uuid":"550e8400-e29b-41d4-a716-446655440000","text":"hi","language":"en"}"#;
        let rec: TranscribedRecord = decode(payload).unwrap();
        assert_eq!(rec.text, "hi");
        assert_eq!(rec.language, "en");
    }

    #[test]
    fn decode_malformed_payload() {
        let err = decode::<TranscribedRecord>(b"not json").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
    }

    #[test]
    fn decode_wrong_schema() {
        // Valid JSON, wrong fields for the topic
        let err = decode::<TranscribedRecord>(br#"{"foo": 1}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
    }
}
