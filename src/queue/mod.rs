//! Persistent job queue backed by SQLite.
//!
//! Job records move through their lifecycle (pending → processing →
//! done/failed) under caller control; the queue never inspects payloads
//! to decide transitions. A single persisted pause flag gates dequeue
//! for the whole store.
//!
//! # Overview
//!
//! - [`Queue`] - Main interface for queue operations
//! - [`JobRecord`] / [`JobPayload`] - Stored rows and their typed payloads
//! - [`JobStatus`] - Record lifecycle states
//! - [`JobStore`] - Data-access seam for orchestration code
//! - [`QueueError`] - Operation error types
//!
//! # Example
//!
//! ```ignore
//! use easel_core::queue::{JobPayload, Queue};
//! use easel_core::Database;
//!
//! let db = Database::new_in_memory().await?;
//! let queue = Queue::new(db);
//!
//! let id = queue
//!     .enqueue(&JobPayload::Generate {
//!         prompt: "a cat".into(),
//!         model: None,
//!         steps: 20,
//!     })
//!     .await?;
//!
//! if let Some(record) = queue.dequeue().await? {
//!     // ... run the job ...
//!     queue.mark_done(record.id).await?;
//! }
//! ```

mod error;
mod item;
mod store;

pub use error::QueueError;
pub use item::{JobPayload, JobRecord, JobStatus};
pub use store::JobStore;

use crate::db::Database;
use sqlx::Row;
use tracing::instrument;

/// Returns `Ok(())` if at least one row was affected; otherwise [`QueueError::ItemNotFound`].
fn check_affected(id: i64, rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(QueueError::ItemNotFound(id))
    } else {
        Ok(())
    }
}

/// Metadata key holding the persisted pause flag.
const PAUSED_KEY: &str = "paused";

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Queue manager for job records.
///
/// Holds the storage handle explicitly; all pause state lives in the
/// database rather than in process-wide globals, so any number of `Queue`
/// values over the same store observe the same gate.
#[derive(Debug, Clone)]
pub struct Queue {
    db: Database,
}

impl Queue {
    /// Creates a new queue manager over the given database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Appends a new pending job.
    ///
    /// # Returns
    ///
    /// The ID of the newly created record.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Payload`] if the payload cannot be serialized
    /// and [`QueueError::Database`] if the insert fails.
    #[instrument(skip(self, payload))]
    pub async fn enqueue(&self, payload: &JobPayload) -> Result<i64> {
        let stored = payload.to_stored()?;
        let result = sqlx::query(
            r"INSERT INTO jobs (payload, status)
              VALUES (?, ?)
              RETURNING id",
        )
        .bind(stored)
        .bind(JobStatus::Pending.as_str())
        .fetch_one(self.db.pool())
        .await?;

        Ok(result.get("id"))
    }

    /// Retrieves and claims the oldest pending job.
    ///
    /// The claim is a single atomic UPDATE...RETURNING statement that also
    /// checks the pause flag, so two workers sharing the store cannot both
    /// claim the same record. Returns `None` when the queue is paused or
    /// has no pending jobs. Selection is strict FIFO by ID.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn dequeue(&self) -> Result<Option<JobRecord>> {
        let record = sqlx::query_as::<_, JobRecord>(
            r"UPDATE jobs
              SET status = ?, updated_at = datetime('now')
              WHERE id = (
                  SELECT id FROM jobs
                  WHERE status = ?
                    AND NOT EXISTS (
                        SELECT 1 FROM metadata WHERE key = ? AND value = 'true'
                    )
                  ORDER BY id ASC
                  LIMIT 1
              )
              RETURNING *",
        )
        .bind(JobStatus::Processing.as_str())
        .bind(JobStatus::Pending.as_str())
        .bind(PAUSED_KEY)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(record)
    }

    /// Marks a job as done.
    ///
    /// The overwrite is unconditional: no check is made that the prior
    /// status was `processing`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ItemNotFound`] if no record exists with the
    /// given ID and [`QueueError::Database`] if the update fails.
    #[instrument(skip(self))]
    pub async fn mark_done(&self, id: i64) -> Result<()> {
        self.set_status(id, JobStatus::Done).await
    }

    /// Marks a job as failed. The overwrite is unconditional.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ItemNotFound`] if no record exists with the
    /// given ID and [`QueueError::Database`] if the update fails.
    #[instrument(skip(self))]
    pub async fn mark_failed(&self, id: i64) -> Result<()> {
        self.set_status(id, JobStatus::Failed).await
    }

    /// Returns a job to pending status for another attempt.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ItemNotFound`] if no record exists with the
    /// given ID and [`QueueError::Database`] if the update fails.
    #[instrument(skip(self))]
    pub async fn retry_item(&self, id: i64) -> Result<()> {
        self.set_status(id, JobStatus::Pending).await
    }

    async fn set_status(&self, id: i64, status: JobStatus) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE jobs
              SET status = ?, updated_at = datetime('now')
              WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        check_affected(id, result.rows_affected())
    }

    /// Deletes all records in terminal states (done or failed).
    ///
    /// Pending and processing records are preserved.
    ///
    /// # Returns
    ///
    /// The number of records removed.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Database`] if the delete fails.
    #[instrument(skip(self))]
    pub async fn purge_completed(&self) -> Result<u64> {
        let result = sqlx::query(r"DELETE FROM jobs WHERE status IN (?, ?)")
            .bind(JobStatus::Done.as_str())
            .bind(JobStatus::Failed.as_str())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }

    /// Sets the persisted pause flag.
    ///
    /// While set, [`dequeue`](Self::dequeue) yields nothing regardless of
    /// pending jobs.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Database`] if the upsert fails.
    #[instrument(skip(self))]
    pub async fn set_paused(&self, paused: bool) -> Result<()> {
        sqlx::query(
            r"INSERT INTO metadata (key, value) VALUES (?, ?)
              ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(PAUSED_KEY)
        .bind(if paused { "true" } else { "false" })
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    /// Reads the persisted pause flag.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn is_paused(&self) -> Result<bool> {
        let row = sqlx::query(r"SELECT value FROM metadata WHERE key = ?")
            .bind(PAUSED_KEY)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.is_some_and(|r| r.get::<String, _>("value") == "true"))
    }

    /// Lists records, optionally filtered by status, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn list_items(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>> {
        let records = match status {
            Some(status) => {
                sqlx::query_as::<_, JobRecord>(
                    r"SELECT * FROM jobs WHERE status = ? ORDER BY id ASC",
                )
                .bind(status.as_str())
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, JobRecord>(r"SELECT * FROM jobs ORDER BY id ASC")
                    .fetch_all(self.db.pool())
                    .await?
            }
        };

        Ok(records)
    }

    /// Gets a job record by ID.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<JobRecord>> {
        let record = sqlx::query_as::<_, JobRecord>(r"SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(record)
    }

    /// Counts records by status.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count_by_status(&self, status: JobStatus) -> Result<i64> {
        let result = sqlx::query(r"SELECT COUNT(*) as count FROM jobs WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(self.db.pool())
            .await?;

        Ok(result.get("count"))
    }
}
