//! Cleanup reports, previews, and statistics.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use toolhub_core::types::id::BlobId;
use toolhub_entity::blob::{BlobMeta, bytes_to_mb};

/// Stage of one cleanup invocation. Logged, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    Scanning,
    Classifying,
    Deleting,
    Reported,
}

impl fmt::Display for CleanupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scanning => "scanning",
            Self::Classifying => "classifying",
            Self::Deleting => "deleting",
            Self::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// Result of one deletion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub success: bool,
    pub deleted_count: usize,
    pub size_freed_bytes: i64,
    pub size_freed_mb: f64,
    pub deleted_ids: Vec<BlobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CleanupReport {
    /// A report for a pass that failed before deleting anything.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Running totals for a deletion pass.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    deleted_ids: Vec<BlobId>,
    size_freed_bytes: i64,
}

impl Tally {
    pub(crate) fn record(&mut self, id: BlobId, size_bytes: i64) {
        self.deleted_ids.push(id);
        self.size_freed_bytes += size_bytes;
    }

    pub(crate) fn finish(self, error: Option<String>) -> CleanupReport {
        CleanupReport {
            success: error.is_none(),
            deleted_count: self.deleted_ids.len(),
            size_freed_bytes: self.size_freed_bytes,
            size_freed_mb: bytes_to_mb(self.size_freed_bytes),
            deleted_ids: self.deleted_ids,
            error,
        }
    }
}

/// Result of running both passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullCleanupReport {
    pub success: bool,
    pub time_based: CleanupReport,
    pub command_based: CleanupReport,
    /// Size of the union of both passes' deleted IDs.
    pub total_deleted_files: usize,
    pub total_size_freed_bytes: i64,
    pub total_size_freed_mb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FullCleanupReport {
    pub(crate) fn combine(time_based: CleanupReport, command_based: CleanupReport) -> Self {
        let total_size_freed_bytes = time_based.size_freed_bytes + command_based.size_freed_bytes;
        let error = time_based
            .error
            .clone()
            .or_else(|| command_based.error.clone());
        Self {
            success: time_based.success && command_based.success,
            total_deleted_files: time_based.deleted_count + command_based.deleted_count,
            total_size_freed_bytes,
            total_size_freed_mb: bytes_to_mb(total_size_freed_bytes),
            time_based,
            command_based,
            error,
        }
    }
}

/// Short description of a blob for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlobSummary {
    pub id: BlobId,
    pub filename: String,
    pub size_bytes: i64,
    pub upload_date: DateTime<Utc>,
}

impl From<&BlobMeta> for BlobSummary {
    fn from(meta: &BlobMeta) -> Self {
        Self {
            id: meta.id,
            filename: meta.filename.clone(),
            size_bytes: meta.size_bytes,
            upload_date: meta.upload_date,
        }
    }
}

/// Blobs referenced by no job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanReport {
    pub count: usize,
    pub size_bytes: i64,
    pub size_mb: f64,
    pub files: Vec<BlobSummary>,
}

impl OrphanReport {
    pub(crate) fn new(files: Vec<BlobSummary>) -> Self {
        let size_bytes = files.iter().map(|f| f.size_bytes).sum();
        Self {
            count: files.len(),
            size_bytes,
            size_mb: bytes_to_mb(size_bytes),
            files,
        }
    }
}

/// What a full cleanup would delete right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupPreview {
    pub max_age_hours: u32,
    pub time_based: Vec<BlobSummary>,
    pub command_based: Vec<BlobSummary>,
    /// Distinct blobs across both passes.
    pub total_unique: usize,
    pub total_size_bytes: i64,
    pub total_size_mb: f64,
    pub orphans: OrphanReport,
}

/// Blob counts by age. Intervals are half-open and together cover every
/// age; uploads dated in the future count as `under_1h`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgeHistogram {
    pub under_1h: usize,
    #[serde(rename = "1h_to_24h")]
    pub one_to_24h: usize,
    #[serde(rename = "1d_to_7d")]
    pub one_to_7d: usize,
    pub over_7d: usize,
}

impl AgeHistogram {
    /// Count one blob of the given age.
    pub fn add(&mut self, age: chrono::Duration) {
        if age < chrono::Duration::hours(1) {
            self.under_1h += 1;
        } else if age < chrono::Duration::hours(24) {
            self.one_to_24h += 1;
        } else if age < chrono::Duration::days(7) {
            self.one_to_7d += 1;
        } else {
            self.over_7d += 1;
        }
    }

    /// Sum of all buckets.
    pub fn total(&self) -> usize {
        self.under_1h + self.one_to_24h + self.one_to_7d + self.over_7d
    }
}

/// Snapshot of temporary storage usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupStats {
    pub total_files: usize,
    pub total_size_bytes: i64,
    pub total_size_mb: f64,
    pub files_by_age: AgeHistogram,
}
