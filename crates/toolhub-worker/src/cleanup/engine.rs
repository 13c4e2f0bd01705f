//! Garbage collection of temporary blobs by age and by job status.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing;

use toolhub_core::result::AppResult;
use toolhub_core::types::id::BlobId;
use toolhub_database::store::JobStore;
use toolhub_entity::blob::{BlobMeta, bytes_to_mb};
use toolhub_storage::blob::BlobStore;

use super::report::{
    AgeHistogram, BlobSummary, CleanupPhase, CleanupPreview, CleanupReport, CleanupStats,
    FullCleanupReport, OrphanReport, Tally,
};

/// Blobs of a finished job are kept this long after `completed_at`.
pub const COMMAND_GRACE_PERIOD_HOURS: i64 = 1;

/// Deletes temporary blobs that are old or belong to finished jobs.
#[derive(Debug, Clone)]
pub struct CleanupEngine {
    jobs: Arc<dyn JobStore>,
    blobs: Arc<dyn BlobStore>,
}

impl CleanupEngine {
    /// Create an engine over the given stores.
    pub fn new(jobs: Arc<dyn JobStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { jobs, blobs }
    }

    /// Delete blobs uploaded more than `max_age_hours` ago. `0` deletes all.
    pub async fn cleanup_old_files(&self, max_age_hours: u32) -> CleanupReport {
        self.cleanup_old_files_at(Utc::now(), max_age_hours).await
    }

    /// [`Self::cleanup_old_files`] against an explicit clock.
    pub async fn cleanup_old_files_at(&self, now: DateTime<Utc>, max_age_hours: u32) -> CleanupReport {
        self.time_pass(now, max_age_hours, &mut HashSet::new()).await
    }

    /// Delete blobs referenced by jobs that finished more than the grace
    /// period ago.
    pub async fn cleanup_by_command_status(&self) -> CleanupReport {
        self.cleanup_by_command_status_at(Utc::now()).await
    }

    /// [`Self::cleanup_by_command_status`] against an explicit clock.
    pub async fn cleanup_by_command_status_at(&self, now: DateTime<Utc>) -> CleanupReport {
        self.command_pass(now, &mut HashSet::new()).await
    }

    /// Run the time pass then the command pass. Each blob is counted once.
    pub async fn full_cleanup(&self, max_age_hours: u32) -> FullCleanupReport {
        self.full_cleanup_at(Utc::now(), max_age_hours).await
    }

    /// [`Self::full_cleanup`] against an explicit clock.
    pub async fn full_cleanup_at(&self, now: DateTime<Utc>, max_age_hours: u32) -> FullCleanupReport {
        tracing::info!(max_age_hours, "Starting full cleanup");
        let mut deleted = HashSet::new();
        let time_based = self.time_pass(now, max_age_hours, &mut deleted).await;
        let command_based = self.command_pass(now, &mut deleted).await;
        let report = FullCleanupReport::combine(time_based, command_based);
        tracing::info!(
            total_deleted = report.total_deleted_files,
            size_freed_mb = report.total_size_freed_mb,
            success = report.success,
            "Full cleanup finished"
        );
        report
    }

    /// Delete every blob regardless of age.
    pub async fn emergency_cleanup(&self) -> CleanupReport {
        tracing::warn!("Emergency cleanup: deleting all temporary files");
        self.cleanup_old_files(0).await
    }

    /// Blobs not referenced by any job. Never deletes.
    pub async fn find_orphans(&self) -> AppResult<OrphanReport> {
        let blobs = self.blobs.enumerate().await?;
        let referenced = self.referenced_ids().await?;
        let orphans = blobs
            .iter()
            .filter(|b| !referenced.contains(&b.id))
            .map(BlobSummary::from)
            .collect();
        Ok(OrphanReport::new(orphans))
    }

    /// What a full cleanup with `max_age_hours` would delete now.
    pub async fn preview(&self, max_age_hours: u32) -> AppResult<CleanupPreview> {
        self.preview_at(Utc::now(), max_age_hours).await
    }

    /// [`Self::preview`] against an explicit clock.
    pub async fn preview_at(&self, now: DateTime<Utc>, max_age_hours: u32) -> AppResult<CleanupPreview> {
        let blobs = self.blobs.enumerate().await?;
        let jobs_referenced = self.referenced_ids().await?;
        let by_id: HashMap<BlobId, &BlobMeta> = blobs.iter().map(|b| (b.id, b)).collect();

        let time_based: Vec<BlobSummary> = select_by_age(&blobs, now, max_age_hours)
            .into_iter()
            .map(BlobSummary::from)
            .collect();
        let command_based: Vec<BlobSummary> = self
            .finished_job_references(now)
            .await?
            .into_iter()
            .filter_map(|id| by_id.get(&id).map(|meta| BlobSummary::from(*meta)))
            .collect();

        let mut unique = HashSet::new();
        let mut total_size_bytes = 0;
        for summary in time_based.iter().chain(command_based.iter()) {
            if unique.insert(summary.id) {
                total_size_bytes += summary.size_bytes;
            }
        }

        let orphans = blobs
            .iter()
            .filter(|b| !jobs_referenced.contains(&b.id))
            .map(BlobSummary::from)
            .collect();

        Ok(CleanupPreview {
            max_age_hours,
            time_based,
            command_based,
            total_unique: unique.len(),
            total_size_bytes,
            total_size_mb: bytes_to_mb(total_size_bytes),
            orphans: OrphanReport::new(orphans),
        })
    }

    /// Count, size, and age histogram of every stored blob.
    pub async fn get_cleanup_stats(&self) -> AppResult<CleanupStats> {
        self.get_cleanup_stats_at(Utc::now()).await
    }

    /// [`Self::get_cleanup_stats`] against an explicit clock.
    pub async fn get_cleanup_stats_at(&self, now: DateTime<Utc>) -> AppResult<CleanupStats> {
        let blobs = self.blobs.enumerate().await?;
        let mut files_by_age = AgeHistogram::default();
        let mut total_size_bytes = 0;
        for blob in &blobs {
            files_by_age.add(blob.age_at(now));
            total_size_bytes += blob.size_bytes;
        }
        Ok(CleanupStats {
            total_files: blobs.len(),
            total_size_bytes,
            total_size_mb: bytes_to_mb(total_size_bytes),
            files_by_age,
        })
    }

    async fn time_pass(
        &self,
        now: DateTime<Utc>,
        max_age_hours: u32,
        deleted: &mut HashSet<BlobId>,
    ) -> CleanupReport {
        log_phase("time", CleanupPhase::Scanning);
        let blobs = match self.blobs.enumerate().await {
            Ok(blobs) => blobs,
            Err(e) => return fail_before_delete("time", e.to_string()),
        };

        log_phase("time", CleanupPhase::Classifying);
        let candidates = select_by_age(&blobs, now, max_age_hours)
            .into_iter()
            .map(|b| (b.id, b.size_bytes))
            .collect::<Vec<_>>();
        tracing::debug!(candidates = candidates.len(), scanned = blobs.len(), max_age_hours, "Selected blobs by age");

        self.delete_candidates("time", candidates, deleted).await
    }

    async fn command_pass(&self, now: DateTime<Utc>, deleted: &mut HashSet<BlobId>) -> CleanupReport {
        log_phase("command", CleanupPhase::Scanning);
        let sizes: HashMap<BlobId, i64> = match self.blobs.enumerate().await {
            Ok(blobs) => blobs.into_iter().map(|b| (b.id, b.size_bytes)).collect(),
            Err(e) => return fail_before_delete("command", e.to_string()),
        };

        log_phase("command", CleanupPhase::Classifying);
        let referenced = match self.finished_job_references(now).await {
            Ok(ids) => ids,
            Err(e) => return fail_before_delete("command", e.to_string()),
        };
        let candidates = referenced
            .into_iter()
            .map(|id| (id, sizes.get(&id).copied().unwrap_or(0)))
            .collect::<Vec<_>>();

        self.delete_candidates("command", candidates, deleted).await
    }

    /// Blob IDs referenced by terminal jobs whose grace period has passed,
    /// deduplicated in first-seen order.
    async fn finished_job_references(&self, now: DateTime<Utc>) -> AppResult<Vec<BlobId>> {
        let cutoff = now - Duration::hours(COMMAND_GRACE_PERIOD_HOURS);
        let jobs = self.jobs.find_completed_before(cutoff).await?;

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for job in &jobs {
            let raw = job.file_ids();
            let parsed = job.referenced_blob_ids();
            if parsed.len() < raw.len() {
                tracing::debug!(
                    job_id = %job.id,
                    skipped = raw.len() - parsed.len(),
                    "Skipping malformed file references"
                );
            }
            ids.extend(parsed.into_iter().filter(|id| seen.insert(*id)));
        }
        tracing::debug!(finished_jobs = jobs.len(), referenced = ids.len(), "Collected references of finished commands");
        Ok(ids)
    }

    async fn referenced_ids(&self) -> AppResult<HashSet<BlobId>> {
        let jobs = self.jobs.find_all().await?;
        Ok(jobs.iter().flat_map(|j| j.referenced_blob_ids()).collect())
    }

    /// Delete each candidate not already in `deleted`. Missing blobs are
    /// skipped; a store error stops the pass and keeps the partial totals.
    async fn delete_candidates(
        &self,
        pass: &str,
        candidates: Vec<(BlobId, i64)>,
        deleted: &mut HashSet<BlobId>,
    ) -> CleanupReport {
        log_phase(pass, CleanupPhase::Deleting);
        let mut tally = Tally::default();
        let mut error = None;

        for (id, size_bytes) in candidates {
            if deleted.contains(&id) {
                continue;
            }
            match self.blobs.delete(id).await {
                Ok(true) => {
                    deleted.insert(id);
                    tally.record(id, size_bytes);
                }
                Ok(false) => {
                    tracing::debug!(blob_id = %id, "Blob already gone");
                }
                Err(e) => {
                    tracing::error!(blob_id = %id, error = %e, "Failed to delete blob");
                    error = Some(e.to_string());
                    break;
                }
            }
        }

        let report = tally.finish(error);
        log_phase(pass, CleanupPhase::Reported);
        tracing::info!(
            pass,
            deleted = report.deleted_count,
            size_freed_mb = report.size_freed_mb,
            success = report.success,
            "Cleanup pass finished"
        );
        report
    }
}

fn select_by_age(blobs: &[BlobMeta], now: DateTime<Utc>, max_age_hours: u32) -> Vec<&BlobMeta> {
    if max_age_hours == 0 {
        return blobs.iter().collect();
    }
    // A cutoff before the representable range means nothing is that old.
    match now.checked_sub_signed(Duration::hours(i64::from(max_age_hours))) {
        Some(cutoff) => blobs.iter().filter(|b| b.upload_date < cutoff).collect(),
        None => Vec::new(),
    }
}

fn log_phase(pass: &str, phase: CleanupPhase) {
    tracing::debug!(pass, %phase, "Cleanup phase");
}

fn fail_before_delete(pass: &str, error: String) -> CleanupReport {
    tracing::error!(pass, error = %error, "Cleanup pass aborted");
    CleanupReport::failed(error)
}
