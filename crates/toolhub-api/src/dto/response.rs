//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use toolhub_core::types::id::{BlobId, JobId};
use toolhub_entity::job::Job;
use toolhub_worker::cleanup::{CleanupReport, FullCleanupReport};

use super::request::CleanupMode;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// One stored upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub file_id: BlobId,
}

/// Reply to a tool submission.
#[derive(Debug, Clone, Serialize)]
pub struct CommandStartedResponse {
    pub success: bool,
    /// ID to poll at `/api/commands/{id}`.
    pub command_id: JobId,
    pub message: String,
    pub uploaded_files: Vec<UploadedFile>,
}

/// A job as returned to pollers.
#[derive(Debug, Clone, Serialize)]
pub struct CommandView {
    pub id: JobId,
    pub command_name: String,
    pub arguments: Map<String, Value>,
    pub exit_state: i32,
    /// `running`, `succeeded`, `handler_failed`, `dispatch_failed`, `exited`.
    pub status: &'static str,
    /// The handler result parsed as JSON when possible.
    pub result: Option<Value>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for CommandView {
    fn from(job: Job) -> Self {
        let result = job
            .stdout
            .as_deref()
            .filter(|_| job.state().is_success())
            .and_then(|s| serde_json::from_str(s).ok());
        Self {
            status: job.state().as_str(),
            result,
            id: job.id,
            command_name: job.command_name,
            arguments: job.arguments,
            exit_state: job.exit_state,
            stdout: job.stdout,
            stderr: job.stderr,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// Outcome of an admin-triggered cleanup.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CleanupOutcome {
    Pass(CleanupReport),
    Full(FullCleanupReport),
}

impl CleanupOutcome {
    /// Whether the cleanup finished without a storage error.
    pub fn success(&self) -> bool {
        match self {
            Self::Pass(r) => r.success,
            Self::Full(r) => r.success,
        }
    }
}

/// Reply to POST /api/admin/cleanup.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupRunResponse {
    pub success: bool,
    pub mode: CleanupMode,
    pub result: CleanupOutcome,
}

/// Liveness reply.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
