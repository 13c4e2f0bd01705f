//! Job record store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use toolhub_core::result::AppResult;
use toolhub_core::types::id::JobId;
use toolhub_entity::job::{Job, JobUpdate};

/// Persistent storage for command job records.
///
/// Implementations must be safe to share across the dispatcher, the API
/// handlers, and the cleanup engine. Failures surface as
/// `ErrorKind::Database` errors.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new job record and return its ID.
    async fn insert(&self, job: &Job) -> AppResult<JobId>;

    /// Overwrite the fields present in `update`.
    ///
    /// Returns `false` when no record with `id` exists.
    async fn update_fields(&self, id: JobId, update: &JobUpdate) -> AppResult<bool>;

    /// Look up a single job.
    async fn find_one(&self, id: JobId) -> AppResult<Option<Job>>;

    /// Return every job, newest first.
    async fn find_all(&self) -> AppResult<Vec<Job>>;

    /// Terminal jobs whose `completed_at` lies before `cutoff`, oldest first.
    async fn find_completed_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Job>>;

    /// Atomically mark a job as started.
    ///
    /// Succeeds only while the job is unstarted and non-terminal, so at most
    /// one caller wins for a given ID.
    async fn claim(&self, id: JobId, started_at: DateTime<Utc>) -> AppResult<bool>;
}
