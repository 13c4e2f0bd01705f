//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use toolhub_core::types::id::{BlobId, JobId};

use super::exit_state::{self, JobState};

/// Argument key holding the blob IDs a job consumes.
pub const FILE_IDS_ARG: &str = "file_ids";

/// A command job.
///
/// `exit_state == -1` exactly when `completed_at` is `None`; every write
/// that ends a job sets both in the same update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Key into the handler registry (e.g., `"MergePdfs"`).
    pub command_name: String,
    /// Handler arguments as an ordered JSON object.
    #[sqlx(json)]
    pub arguments: Map<String, Value>,
    /// `-1` running, `0` success, `1` handler failure, `2` dispatch failure,
    /// any other positive value is a subprocess exit code.
    pub exit_state: i32,
    /// Serialized handler result on success.
    pub stdout: Option<String>,
    /// Error description on failure.
    pub stderr: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When dispatch claimed the job.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a fresh, not-yet-started job.
    pub fn new(
        command_name: impl Into<String>,
        arguments: Map<String, Value>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::new(),
            command_name: command_name.into(),
            arguments,
            exit_state: exit_state::RUNNING,
            stdout: None,
            stderr: None,
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    /// Typed reading of `exit_state`.
    pub fn state(&self) -> JobState {
        JobState::from_code(self.exit_state)
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.exit_state != exit_state::RUNNING
    }

    /// Whether the job has been claimed by a dispatcher.
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Raw `file_ids` strings, skipping non-string entries.
    pub fn file_ids(&self) -> Vec<&str> {
        self.arguments
            .get(FILE_IDS_ARG)
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Referenced blob IDs. Entries that are not valid IDs are dangling
    /// references and are dropped.
    pub fn referenced_blob_ids(&self) -> Vec<BlobId> {
        self.file_ids()
            .into_iter()
            .filter_map(BlobId::parse)
            .collect()
    }

    /// Whether the job is terminal and finished strictly before `cutoff`.
    pub fn completed_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.is_terminal() && self.completed_at.is_some_and(|at| at < cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_job_is_running_with_null_timestamps() {
        let job = Job::new("MergePdfs", Map::new(), Utc::now());
        assert_eq!(job.exit_state, -1);
        assert!(!job.is_terminal());
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.stdout.is_none() && job.stderr.is_none());
    }

    #[test]
    fn test_referenced_blob_ids_drops_dangling_entries() {
        let good = BlobId::new();
        let job = Job::new(
            "MergePdfs",
            args(json!({ "file_ids": [good.to_string(), "b2", 42] })),
            Utc::now(),
        );
        assert_eq!(job.file_ids(), vec![good.to_string().as_str(), "b2"]);
        assert_eq!(job.referenced_blob_ids(), vec![good]);
    }

    #[test]
    fn test_missing_file_ids_is_empty() {
        let job = Job::new("Noop", args(json!({ "file_ids": "not-a-list" })), Utc::now());
        assert!(job.file_ids().is_empty());
    }

    #[test]
    fn test_completed_before_requires_terminal_state() {
        let now = Utc::now();
        let mut job = Job::new("Noop", Map::new(), now - Duration::hours(3));
        assert!(!job.completed_before(now));

        job.exit_state = 0;
        job.completed_at = Some(now - Duration::hours(2));
        assert!(job.completed_before(now - Duration::hours(1)));
        assert!(!job.completed_before(now - Duration::hours(2)));
    }
}
