//! Record types carried on the durable log
//!
//! One record kind per topic, all keyed by the UUID assigned at upload time.
//! The set is closed: the `Record` trait is sealed so the reader/writer
//! generics cannot be instantiated with arbitrary types.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::UploadedRecord {}
    impl Sealed for super::TranscribedRecord {}
    impl Sealed for super::SummarizedRecord {}
}

/// Marker for the closed set of wire record kinds.
pub trait Record:
    sealed::Sealed + Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static
{
    /// Artifact UUID this record belongs to.
    fn uuid(&self) -> Uuid;
}

/// Per-artifact processing progress. Monotonically non-decreasing in the
/// metadata store. Carried on the wire only as the raw integer inside
/// `UploadUpdate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i64)]
pub enum Status {
    Uploaded = 0,
    Transcribed = 1,
    Summarized = 2,
}

impl Status {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for Status {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::Uploaded),
            1 => Ok(Status::Transcribed),
            2 => Ok(Status::Summarized),
            other => Err(Error::Internal(format!("unknown status value {other}"))),
        }
    }
}

/// Mutable file metadata attached to an upload announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadUpdate {
    pub user_id: i64,
    /// Original file name without extension
    pub og_file_name: String,
    /// Original extension including the dot (".mp4")
    pub og_extension: String,
    pub status: i64,
}

/// Announcement on the `uploaded` topic: a new artifact landed in blob
/// storage and is ready for transcription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedRecord {
    pub uuid: Uuid,
    /// Blob-storage bucket holding the converted audio object
    pub bucket: String,
    pub update: UploadUpdate,
}

/// Announcement on the `transcribed` topic: transcription output for an
/// artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscribedRecord {
    pub uuid: Uuid,
    pub text: String,
    pub language: String,
}

/// Announcement on the `summarized` topic: summary output for an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizedRecord {
    pub uuid: Uuid,
    pub text: String,
}

impl Record for UploadedRecord {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl Record for TranscribedRecord {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl Record for SummarizedRecord {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded() -> UploadedRecord {
        UploadedRecord {
            uuid: Uuid::new_v4(),
            bucket: "audio-input".to_string(),
            update: UploadUpdate {
                user_id: 42,
                og_file_name: "lecture-03".to_string(),
                og_extension: ".mp4".to_string(),
                status: 0,
            },
        }
    }

    #[test]
    fn uploaded_round_trip() {
        let rec = uploaded();
        let bytes = serde_json::to_vec(&rec).unwrap();
        let back: UploadedRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rec, back);
    }

    #[test]
    fn uploaded_wire_shape_is_nested() {
        let rec = uploaded();
        let value: serde_json::Value = serde_json::to_value(&rec).unwrap();
        assert!(value.get("uuid").is_some());
        assert!(value.get("bucket").is_some());
        let update = value.get("update").expect("nested update object");
        assert_eq!(update.get("user_id").unwrap(), 42);
        assert_eq!(update.get("og_file_name").unwrap(), "lecture-03");
        assert_eq!(update.get("og_extension").unwrap(), ".mp4");
        assert_eq!(update.get("status").unwrap(), 0);
    }

    #[test]
    fn transcribed_round_trip() {
        let rec = TranscribedRecord {
            uuid: Uuid::new_v4(),
            text: "hello world".to_string(),
            language: "en".to_string(),
        };
        let bytes = serde_json::to_vec(&rec).unwrap();
        let back: TranscribedRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rec, back);
    }

    #[test]
    fn summarized_round_trip() {
        let rec = SummarizedRecord {
            uuid: Uuid::new_v4(),
            text: "tl;dr".to_string(),
        };
        let bytes = serde_json::to_vec(&rec).unwrap();
        let back: SummarizedRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(rec, back);
    }

    #[test]
    fn status_ordering_is_monotonic() {
        assert!(Status::Uploaded < Status::Transcribed);
        assert!(Status::Transcribed < Status::Summarized);
        assert_eq!(Status::try_from(1).unwrap(), Status::Transcribed);
        assert!(Status::try_from(3).is_err());
    }
}
