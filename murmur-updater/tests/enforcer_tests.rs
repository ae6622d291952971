//! Integration tests for the status consistency enforcer
//!
//! Feeds records through in-memory topic streams into the enforcer's
//! forwarders / worker pool and asserts the metadata store transitions.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use murmur_common::error::Error;
use murmur_common::records::{
    Status, SummarizedRecord, TranscribedRecord, UploadUpdate, UploadedRecord,
};
use murmur_common::store::MetadataStore;
use murmur_updater::config::PoolConfig;
use murmur_updater::enforcer::{self, StageRecord};

fn uploaded(uuid: Uuid) -> UploadedRecord {
    UploadedRecord {
        uuid,
        bucket: "audio-input".to_string(),
        update: UploadUpdate {
            user_id: 1,
            og_file_name: "standup".to_string(),
            og_extension: ".mp3".to_string(),
            status: 0,
        },
    }
}

fn transcribed(uuid: Uuid) -> TranscribedRecord {
    TranscribedRecord {
        uuid,
        text: "we discussed the roadmap".to_string(),
        language: "en".to_string(),
    }
}

fn summarized(uuid: Uuid) -> SummarizedRecord {
    SummarizedRecord {
        uuid,
        text: "roadmap discussion".to_string(),
    }
}

async fn open_store(dir: &TempDir) -> Arc<MetadataStore> {
    Arc::new(
        MetadataStore::open(&dir.path().join("murmur.db"))
            .await
            .expect("open store"),
    )
}

async fn wait_for_status(store: &MetadataStore, uuid: Uuid, expected: Status) {
    for _ in 0..200 {
        if let Ok(status) = store.status(uuid).await {
            if status == expected {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("uuid {uuid} never reached status {expected:?}");
}

#[tokio::test]
async fn full_lifecycle_through_the_pool() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let uuid = Uuid::new_v4();

    let (up_tx, up_rx) = mpsc::channel(4);
    let (_up_err_tx, up_err_rx) = mpsc::channel(1);
    let (tr_tx, tr_rx) = mpsc::channel(4);
    let (_tr_err_tx, tr_err_rx) = mpsc::channel(1);
    let (sm_tx, sm_rx) = mpsc::channel(4);
    let (_sm_err_tx, sm_err_rx) = mpsc::channel(1);

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let store = Arc::clone(&store);
        let cancel = cancel.clone();
        async move {
            enforcer::run(
                store,
                (up_rx, up_err_rx),
                (tr_rx, tr_err_rx),
                (sm_rx, sm_err_rx),
                &PoolConfig::default(),
                cancel,
            )
            .await
        }
    });

    up_tx.send(uploaded(uuid)).await.unwrap();
    wait_for_status(&store, uuid, Status::Uploaded).await;

    tr_tx.send(transcribed(uuid)).await.unwrap();
    wait_for_status(&store, uuid, Status::Transcribed).await;

    // Redelivered transcription must not regress or duplicate anything
    tr_tx.send(transcribed(uuid)).await.unwrap();

    sm_tx.send(summarized(uuid)).await.unwrap();
    wait_for_status(&store, uuid, Status::Summarized).await;

    drop(up_tx);
    drop(tr_tx);
    drop(sm_tx);
    run.await.unwrap();

    assert_eq!(store.status(uuid).await.unwrap(), Status::Summarized);
}

#[tokio::test]
async fn apply_rejects_duplicate_upload() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let uuid = Uuid::new_v4();

    enforcer::apply(&store, StageRecord::Uploaded(uploaded(uuid)))
        .await
        .unwrap();
    let err = enforcer::apply(&store, StageRecord::Uploaded(uploaded(uuid)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateRecord(u) if u == uuid));
}

#[tokio::test]
async fn redelivery_heals_missed_status_update() {
    // Simulates a crash between the text insert and the status raise: the
    // text row exists but files.status is still 0. Redelivering the record
    // must raise the status instead of aborting on the duplicate insert.
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let uuid = Uuid::new_v4();

    store.add_file(&uploaded(uuid)).await.unwrap();
    store.add_transcription(&transcribed(uuid)).await.unwrap();
    assert_eq!(store.status(uuid).await.unwrap(), Status::Uploaded);

    enforcer::apply(&store, StageRecord::Transcribed(transcribed(uuid)))
        .await
        .unwrap();
    assert_eq!(store.status(uuid).await.unwrap(), Status::Transcribed);
}

#[tokio::test]
async fn stale_transition_is_logged_not_escalated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let uuid = Uuid::new_v4();

    store.add_file(&uploaded(uuid)).await.unwrap();
    enforcer::apply(&store, StageRecord::Summarized(summarized(uuid)))
        .await
        .unwrap();
    assert_eq!(store.status(uuid).await.unwrap(), Status::Summarized);

    // A late transcription record arrives after summarization: the text
    // insert succeeds, the status raise is stale and swallowed.
    enforcer::apply(&store, StageRecord::Transcribed(transcribed(uuid)))
        .await
        .unwrap();
    assert_eq!(store.status(uuid).await.unwrap(), Status::Summarized);
}
