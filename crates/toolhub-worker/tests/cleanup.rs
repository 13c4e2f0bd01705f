//! Cleanup engine behaviour against the in-memory stores.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value, json};

use toolhub_core::error::AppError;
use toolhub_core::result::AppResult;
use toolhub_core::types::id::BlobId;
use toolhub_database::{JobStore, MemoryJobStore};
use toolhub_entity::blob::{BlobMeta, NewBlob, StoredBlob};
use toolhub_entity::job::Job;
use toolhub_storage::{BlobStore, MemoryBlobStore};
use toolhub_worker::CleanupEngine;

struct Fixture {
    now: DateTime<Utc>,
    jobs: Arc<MemoryJobStore>,
    blobs: Arc<MemoryBlobStore>,
    engine: CleanupEngine,
}

impl Fixture {
    fn new() -> Self {
        let jobs = Arc::new(MemoryJobStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let engine = CleanupEngine::new(
            jobs.clone() as Arc<dyn JobStore>,
            blobs.clone() as Arc<dyn BlobStore>,
        );
        Self {
            now: Utc::now(),
            jobs,
            blobs,
            engine,
        }
    }

    fn blob(&self, age: Duration, size: usize) -> BlobId {
        self.blobs
            .store_at(NewBlob::new("input.pdf", vec![0u8; size]), self.now - age)
    }

    /// Insert a job referencing `file_ids`. `finished_ago` of `None` leaves
    /// it running.
    async fn job(&self, file_ids: Vec<String>, finished_ago: Option<Duration>) -> Job {
        self.job_exiting(file_ids, 0, finished_ago).await
    }

    /// Like [`Fixture::job`], recording `exit_state` when finished.
    async fn job_exiting(
        &self,
        file_ids: Vec<String>,
        exit_state: i32,
        finished_ago: Option<Duration>,
    ) -> Job {
        let mut arguments = Map::new();
        arguments.insert("file_ids".into(), json!(file_ids));
        let mut job = Job::new("MergePdfs", arguments, self.now - Duration::hours(48));
        if let Some(ago) = finished_ago {
            job.exit_state = exit_state;
            job.started_at = Some(job.created_at);
            job.completed_at = Some(self.now - ago);
        }
        self.jobs.insert(&job).await.unwrap();
        job
    }
}

fn ids(list: &[BlobId]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_zero_max_age_deletes_everything() {
    let f = Fixture::new();
    f.blob(Duration::minutes(1), 10);
    f.blob(Duration::hours(5), 20);
    f.blob(Duration::days(30), 30);
    let before = f.blobs.len();

    let report = f.engine.cleanup_old_files_at(f.now, 0).await;
    assert!(report.success);
    assert_eq!(report.deleted_count, before);
    assert_eq!(report.size_freed_bytes, 60);
    assert!(f.blobs.is_empty());
}

#[tokio::test]
async fn test_time_based_keeps_recent_blobs() {
    let f = Fixture::new();
    let fresh = f.blob(Duration::hours(2), 10);
    let stale = f.blob(Duration::hours(25), 1_048_576);

    let report = f.engine.cleanup_old_files_at(f.now, 24).await;
    assert_eq!(report.deleted_ids, vec![stale]);
    assert_eq!(report.size_freed_mb, 1.0);
    assert!(f.blobs.contains(fresh));
    assert!(!f.blobs.contains(stale));
}

#[tokio::test]
async fn test_huge_age_threshold_selects_nothing() {
    let f = Fixture::new();
    let ancient = f.blob(Duration::days(36_500), 10);

    let report = f.engine.cleanup_old_files_at(f.now, u32::MAX).await;
    assert!(report.success);
    assert_eq!(report.deleted_count, 0);

    let preview = f.engine.preview_at(f.now, u32::MAX).await.unwrap();
    assert!(preview.time_based.is_empty());

    let full = f.engine.full_cleanup_at(f.now, u32::MAX).await;
    assert!(full.success);
    assert_eq!(full.total_deleted_files, 0);
    assert!(f.blobs.contains(ancient));
}

#[tokio::test]
async fn test_command_based_collects_failed_jobs() {
    let f = Fixture::new();
    let handler_failed = f.blob(Duration::hours(3), 10);
    let dispatch_failed = f.blob(Duration::hours(3), 10);
    let rejected = f.blob(Duration::hours(3), 10);
    let recent_failure = f.blob(Duration::hours(3), 10);

    f.job_exiting(ids(&[handler_failed]), 1, Some(Duration::hours(2))).await;
    f.job_exiting(ids(&[dispatch_failed]), 2, Some(Duration::hours(2))).await;
    f.job_exiting(ids(&[rejected]), 137, Some(Duration::hours(5))).await;
    f.job_exiting(ids(&[recent_failure]), 1, Some(Duration::minutes(10))).await;

    let report = f.engine.cleanup_by_command_status_at(f.now).await;
    assert!(report.success);
    let deleted: HashSet<BlobId> = report.deleted_ids.iter().copied().collect();
    assert_eq!(deleted, HashSet::from([handler_failed, dispatch_failed, rejected]));
    assert!(f.blobs.contains(recent_failure));
}

#[tokio::test]
async fn test_command_based_respects_status_and_grace_period() {
    let f = Fixture::new();
    let done_a = f.blob(Duration::hours(3), 10);
    let done_b = f.blob(Duration::hours(3), 10);
    let running = f.blob(Duration::hours(3), 10);
    let recent = f.blob(Duration::hours(3), 10);
    let unrelated = f.blob(Duration::hours(3), 10);

    let mut finished = ids(&[done_a, done_b]);
    finished.push("not-an-id".into());
    finished.push(BlobId::new().to_string());
    f.job(finished, Some(Duration::hours(2))).await;
    f.job(ids(&[running]), None).await;
    f.job(ids(&[recent]), Some(Duration::minutes(30))).await;

    let report = f.engine.cleanup_by_command_status_at(f.now).await;
    assert!(report.success);
    let deleted: HashSet<BlobId> = report.deleted_ids.iter().copied().collect();
    assert_eq!(deleted, HashSet::from([done_a, done_b]));
    assert_eq!(report.deleted_count, 2);

    for kept in [running, recent, unrelated] {
        assert!(f.blobs.contains(kept));
    }
}

#[tokio::test]
async fn test_full_cleanup_counts_union() {
    let f = Fixture::new();
    let old_and_referenced = f.blob(Duration::hours(30), 100);
    let old_only = f.blob(Duration::hours(30), 100);
    let referenced_only = f.blob(Duration::hours(2), 100);
    let kept = f.blob(Duration::hours(2), 100);

    f.job(ids(&[old_and_referenced, referenced_only]), Some(Duration::hours(3)))
        .await;
    f.job(ids(&[referenced_only]), Some(Duration::hours(4))).await;

    let report = f.engine.full_cleanup_at(f.now, 24).await;
    assert!(report.success);
    assert_eq!(report.time_based.deleted_count, 2);
    assert_eq!(report.command_based.deleted_count, 1);
    assert_eq!(report.total_deleted_files, 3);
    assert_eq!(report.total_size_freed_bytes, 300);

    let all: HashSet<BlobId> = report
        .time_based
        .deleted_ids
        .iter()
        .chain(report.command_based.deleted_ids.iter())
        .copied()
        .collect();
    assert_eq!(all, HashSet::from([old_and_referenced, old_only, referenced_only]));
    assert!(f.blobs.contains(kept));
}

#[tokio::test]
async fn test_double_delete_is_idempotent() {
    let f = Fixture::new();
    let id = f.blob(Duration::hours(1), 1);

    assert!(f.blobs.delete(id).await.unwrap());
    assert!(!f.blobs.delete(id).await.unwrap());
}

#[tokio::test]
async fn test_stats_buckets_partition_all_blobs() {
    let f = Fixture::new();
    // Deterministic spread of ages from a few minutes in the future to ~30 days.
    let mut seed: u64 = 42;
    for _ in 0..200 {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let minutes = (seed >> 33) as i64 % (30 * 24 * 60) - 10;
        f.blob(Duration::minutes(minutes), 1);
    }
    f.blob(Duration::hours(1), 1);
    f.blob(Duration::hours(24), 1);
    f.blob(Duration::days(7), 1);

    let stats = f.engine.get_cleanup_stats_at(f.now).await.unwrap();
    assert_eq!(stats.total_files, 203);
    assert_eq!(stats.files_by_age.total(), stats.total_files);
    assert_eq!(stats.total_size_bytes, 203);
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let f = Fixture::new();
    let stats = f.engine.get_cleanup_stats_at(f.now).await.unwrap();
    assert_eq!(stats.total_files, 0);
    assert_eq!(stats.total_size_mb, 0.0);
}

#[tokio::test]
async fn test_find_orphans_does_not_delete() {
    let f = Fixture::new();
    let referenced = f.blob(Duration::hours(1), 5);
    let orphan = f.blob(Duration::hours(1), 7);
    f.job(ids(&[referenced]), None).await;

    let report = f.engine.find_orphans().await.unwrap();
    assert_eq!(report.count, 1);
    assert_eq!(report.files[0].id, orphan);
    assert_eq!(report.size_bytes, 7);
    assert_eq!(f.blobs.len(), 2);
}

#[tokio::test]
async fn test_preview_matches_full_cleanup() {
    let f = Fixture::new();
    let old = f.blob(Duration::hours(30), 10);
    let referenced = f.blob(Duration::hours(2), 10);
    f.blob(Duration::hours(2), 10);
    f.job(ids(&[old, referenced]), Some(Duration::hours(3))).await;

    let preview = f.engine.preview_at(f.now, 24).await.unwrap();
    assert_eq!(preview.time_based.len(), 1);
    assert_eq!(preview.command_based.len(), 2);
    assert_eq!(preview.total_unique, 2);
    assert_eq!(preview.total_size_bytes, 20);
    assert_eq!(f.blobs.len(), 3);

    let report = f.engine.full_cleanup_at(f.now, 24).await;
    assert_eq!(report.total_deleted_files, preview.total_unique);
}

#[tokio::test]
async fn test_emergency_cleanup_empties_store() {
    let f = Fixture::new();
    f.blob(Duration::minutes(-5), 1);
    f.blob(Duration::seconds(1), 1);

    let report = f.engine.emergency_cleanup().await;
    assert_eq!(report.deleted_count, 2);
    assert!(f.blobs.is_empty());
}

/// Blob store whose deletes start failing after a fixed number of calls.
#[derive(Debug)]
struct FlakyBlobs {
    inner: MemoryBlobStore,
    deletes_before_failure: usize,
    deletes: AtomicUsize,
}

#[async_trait]
impl BlobStore for FlakyBlobs {
    async fn store(&self, blob: NewBlob) -> AppResult<BlobId> {
        self.inner.store(blob).await
    }

    async fn fetch(&self, id: BlobId) -> AppResult<Option<StoredBlob>> {
        self.inner.fetch(id).await
    }

    async fn delete(&self, id: BlobId) -> AppResult<bool> {
        if self.deletes.fetch_add(1, Ordering::SeqCst) >= self.deletes_before_failure {
            return Err(AppError::storage("storage backend unavailable"));
        }
        self.inner.delete(id).await
    }

    async fn enumerate(&self) -> AppResult<Vec<BlobMeta>> {
        self.inner.enumerate().await
    }
}

#[tokio::test]
async fn test_storage_error_aborts_with_partial_counts() {
    let now = Utc::now();
    let inner = MemoryBlobStore::new();
    for _ in 0..4 {
        inner.store_at(NewBlob::new("x.pdf", vec![1u8; 10]), now - Duration::days(2));
    }
    let blobs = Arc::new(FlakyBlobs {
        inner,
        deletes_before_failure: 2,
        deletes: AtomicUsize::new(0),
    });
    let engine = CleanupEngine::new(
        Arc::new(MemoryJobStore::new()),
        blobs.clone() as Arc<dyn BlobStore>,
    );

    let report = engine.cleanup_old_files_at(now, 24).await;
    assert!(!report.success);
    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.size_freed_bytes, 20);
    assert!(report.error.unwrap().contains("storage backend unavailable"));
    assert_eq!(blobs.inner.len(), 2);
}

#[tokio::test]
async fn test_report_serializes_expected_fields() {
    let f = Fixture::new();
    f.blob(Duration::days(2), 10);
    let report = f.engine.cleanup_old_files_at(f.now, 24).await;

    let value: Value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["deleted_count"], 1);
    assert!(value.get("size_freed_mb").is_some());
    assert!(value.get("error").is_none());
}
