//! Metadata store
//!
//! Consistency-checked status tracking per artifact. The store is the single
//! source of truth for "how far along is artifact X": one `files` row per
//! upload plus one text row per completed stage.
//!
//! Invariants enforced here:
//! - a UUID is inserted at most once per table (`Error::DuplicateRecord`,
//!   atomic — a rejected insert leaves no partial row);
//! - `files.status` is monotonically non-decreasing; a regression attempt is
//!   rejected with `Error::StaleStatus` inside the same transaction that
//!   read the current value, leaving the store unchanged. Equal status is
//!   accepted so redelivered records stay idempotent.

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::records::{Status, SummarizedRecord, TranscribedRecord, UploadedRecord};

pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    /// Open (or create) the store at `path` and ensure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let newly_created = !path.exists();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
        // WAL allows the three consumer paths to write concurrently
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        create_schema(&pool).await?;

        if newly_created {
            info!("Initialized new metadata store: {}", path.display());
        } else {
            info!("Opened metadata store: {}", path.display());
        }

        Ok(MetadataStore { pool })
    }

    /// Insert the initial row for a freshly uploaded artifact (status 0).
    pub async fn add_file(&self, rec: &UploadedRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO files (uuid, user_id, og_filename, og_extension, status) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(rec.uuid.to_string())
        .bind(rec.update.user_id)
        .bind(&rec.update.og_file_name)
        .bind(&rec.update.og_extension)
        .bind(Status::Uploaded.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_err(rec.uuid, e))?;
        Ok(())
    }

    /// Insert transcription text for an artifact.
    pub async fn add_transcription(&self, rec: &TranscribedRecord) -> Result<()> {
        sqlx::query("INSERT INTO transcribed (uuid, text, language) VALUES (?, ?, ?)")
            .bind(rec.uuid.to_string())
            .bind(&rec.text)
            .bind(&rec.language)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_err(rec.uuid, e))?;
        Ok(())
    }

    /// Insert summary text for an artifact.
    pub async fn add_summarization(&self, rec: &SummarizedRecord) -> Result<()> {
        sqlx::query("INSERT INTO summarized (uuid, text) VALUES (?, ?)")
            .bind(rec.uuid.to_string())
            .bind(&rec.text)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_err(rec.uuid, e))?;
        Ok(())
    }

    /// Raise an artifact's status. Read-then-compare-then-write in one
    /// transaction; a request below the stored value is rejected and the
    /// store is left unchanged.
    pub async fn update_status(&self, uuid: Uuid, status: Status) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64,)> = sqlx::query_as("SELECT status FROM files WHERE uuid = ?")
            .bind(uuid.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some((current,)) = row else {
            return Err(Error::NotFound(uuid.to_string()));
        };

        if current > status.as_i64() {
            return Err(Error::StaleStatus {
                uuid,
                current,
                requested: status.as_i64(),
            });
        }

        sqlx::query("UPDATE files SET status = ? WHERE uuid = ?")
            .bind(status.as_i64())
            .bind(uuid.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Current status of an artifact.
    pub async fn status(&self, uuid: Uuid) -> Result<Status> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT status FROM files WHERE uuid = ?")
            .bind(uuid.to_string())
            .fetch_optional(&self.pool)
            .await?;
        let Some((status,)) = row else {
            return Err(Error::NotFound(uuid.to_string()));
        };
        Status::try_from(status)
    }
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS files (
            uuid TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            og_filename TEXT NOT NULL,
            og_extension TEXT NOT NULL,
            status INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS transcribed (
            uuid TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            language TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS summarized (
            uuid TEXT PRIMARY KEY,
            text TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn map_insert_err(uuid: Uuid, e: sqlx::Error) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::DuplicateRecord(uuid),
        _ => Error::Database(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::UploadUpdate;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> MetadataStore {
        MetadataStore::open(&dir.path().join("murmur.db"))
            .await
            .expect("open store")
    }

    fn uploaded(uuid: Uuid) -> UploadedRecord {
        UploadedRecord {
            uuid,
            bucket: "audio-input".to_string(),
            update: UploadUpdate {
                user_id: 7,
                og_file_name: "talk".to_string(),
                og_extension: ".wav".to_string(),
                status: 0,
            },
        }
    }

    #[tokio::test]
    async fn duplicate_file_insert_is_rejected_atomically() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let uuid = Uuid::new_v4();

        store.add_file(&uploaded(uuid)).await.unwrap();

        let mut second = uploaded(uuid);
        second.update.og_file_name = "other".to_string();
        let err = store.add_file(&second).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord(u) if u == uuid));

        // No partial row: still exactly one row, original fields intact
        let (count, name): (i64, String) = sqlx::query_as(
            "SELECT COUNT(*), MAX(og_filename) FROM files WHERE uuid = ?",
        )
        .bind(uuid.to_string())
        .fetch_one(&store.pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
        assert_eq!(name, "talk");
    }

    #[tokio::test]
    async fn status_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let uuid = Uuid::new_v4();
        store.add_file(&uploaded(uuid)).await.unwrap();

        store.update_status(uuid, Status::Transcribed).await.unwrap();
        assert_eq!(store.status(uuid).await.unwrap(), Status::Transcribed);

        // Regression attempt rejected, store unchanged
        let err = store.update_status(uuid, Status::Uploaded).await.unwrap_err();
        assert!(matches!(err, Error::StaleStatus { current: 1, requested: 0, .. }));
        assert_eq!(store.status(uuid).await.unwrap(), Status::Transcribed);

        // Equal status accepted (idempotent redelivery)
        store.update_status(uuid, Status::Transcribed).await.unwrap();

        store.update_status(uuid, Status::Summarized).await.unwrap();
        assert_eq!(store.status(uuid).await.unwrap(), Status::Summarized);
    }

    #[tokio::test]
    async fn update_status_for_unknown_uuid_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let err = store
            .update_status(Uuid::new_v4(), Status::Transcribed)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn redelivery_scenario() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let uuid = Uuid::new_v4();

        store.add_file(&uploaded(uuid)).await.unwrap();

        let transcription = TranscribedRecord {
            uuid,
            text: "lecture transcript".to_string(),
            language: "en".to_string(),
        };
        store.add_transcription(&transcription).await.unwrap();
        store.update_status(uuid, Status::Transcribed).await.unwrap();

        // Redelivered transcription: insert rejected as duplicate
        let err = store.add_transcription(&transcription).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord(u) if u == uuid));

        // Stale status message: rejected, status stays at Transcribed
        let err = store.update_status(uuid, Status::Uploaded).await.unwrap_err();
        assert!(matches!(err, Error::StaleStatus { .. }));
        assert_eq!(store.status(uuid).await.unwrap(), Status::Transcribed);
    }
}
