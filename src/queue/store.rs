//! Data-access seam for queue persistence.
//!
//! This trait keeps the concrete `Queue` API intact while letting
//! higher-level code (diagnostics export, command flows) depend on an
//! abstract store boundary.

use async_trait::async_trait;

use super::{JobPayload, JobRecord, JobStatus, Queue, Result};

/// Data-access contract for job queue operations.
#[async_trait]
pub trait JobStore {
    /// Appends a new pending job and returns its ID.
    async fn enqueue(&self, payload: &JobPayload) -> Result<i64>;

    /// Claims the oldest pending job, honoring the pause flag.
    async fn dequeue(&self) -> Result<Option<JobRecord>>;

    /// Marks a job done.
    async fn mark_done(&self, id: i64) -> Result<()>;

    /// Marks a job failed.
    async fn mark_failed(&self, id: i64) -> Result<()>;

    /// Returns a job to pending for another attempt.
    async fn retry_item(&self, id: i64) -> Result<()>;

    /// Deletes all terminal-state jobs; returns the count removed.
    async fn purge_completed(&self) -> Result<u64>;

    /// Sets the persisted pause flag.
    async fn set_paused(&self, paused: bool) -> Result<()>;

    /// Reads the persisted pause flag.
    async fn is_paused(&self) -> Result<bool>;

    /// Lists jobs, optionally filtered by status, ordered by ID.
    async fn list_items(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>>;
}

#[async_trait]
impl JobStore for Queue {
    async fn enqueue(&self, payload: &JobPayload) -> Result<i64> {
        Queue::enqueue(self, payload).await
    }

    async fn dequeue(&self) -> Result<Option<JobRecord>> {
        Queue::dequeue(self).await
    }

    async fn mark_done(&self, id: i64) -> Result<()> {
        Queue::mark_done(self, id).await
    }

    async fn mark_failed(&self, id: i64) -> Result<()> {
        Queue::mark_failed(self, id).await
    }

    async fn retry_item(&self, id: i64) -> Result<()> {
        Queue::retry_item(self, id).await
    }

    async fn purge_completed(&self) -> Result<u64> {
        Queue::purge_completed(self).await
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        Queue::set_paused(self, paused).await
    }

    async fn is_paused(&self) -> Result<bool> {
        Queue::is_paused(self).await
    }

    async fn list_items(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>> {
        Queue::list_items(self, status).await
    }
}
