//! In-memory job store for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use toolhub_core::error::AppError;
use toolhub_core::result::AppResult;
use toolhub_core::types::id::JobId;
use toolhub_entity::job::{Job, JobUpdate};

use crate::store::JobStore;

/// A [`JobStore`] backed by a concurrent hash map.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: DashMap<JobId, Job>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &Job) -> AppResult<JobId> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(_) => Err(AppError::database(format!(
                "Command {} already exists",
                job.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(job.clone());
                Ok(job.id)
            }
        }
    }

    async fn update_fields(&self, id: JobId, update: &JobUpdate) -> AppResult<bool> {
        match self.jobs.get_mut(&id) {
            Some(mut entry) => {
                update.apply(entry.value_mut());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_one(&self, id: JobId) -> AppResult<Option<Job>> {
        Ok(self.jobs.get(&id).map(|r| r.value().clone()))
    }

    async fn find_all(&self) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|r| r.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn find_completed_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|r| r.value().completed_before(cutoff))
            .map(|r| r.value().clone())
            .collect();
        jobs.sort_by_key(|j| j.completed_at);
        Ok(jobs)
    }

    async fn claim(&self, id: JobId, started_at: DateTime<Utc>) -> AppResult<bool> {
        let Some(mut entry) = self.jobs.get_mut(&id) else {
            return Ok(false);
        };
        let job = entry.value_mut();
        if job.is_started() || job.is_terminal() {
            return Ok(false);
        }
        job.started_at = Some(started_at);
        Ok(true)
    }
}
