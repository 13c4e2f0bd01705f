//! Partial updates applied to a job record.

use chrono::{DateTime, Utc};

use super::exit_state;
use super::model::Job;

/// Stderr recorded when a subprocess exits non-zero without writing anything.
pub const NO_ERROR_OUTPUT: &str = "Command failed with no error output";

/// A set of fields to overwrite on a job record.
///
/// `None` leaves the field untouched. For the nullable text columns,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub exit_state: Option<i32>,
    pub stdout: Option<Option<String>>,
    pub stderr: Option<Option<String>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Sets `completed_at` only when it is still null.
    pub completed_at_if_unset: Option<DateTime<Utc>>,
}

impl JobUpdate {
    /// Record a handler result.
    pub fn succeeded(stdout: String, at: DateTime<Utc>) -> Self {
        Self {
            exit_state: Some(exit_state::SUCCESS),
            stdout: Some(Some(stdout)),
            stderr: Some(None),
            completed_at: Some(at),
            ..Self::default()
        }
    }

    /// Record a handler failure.
    pub fn handler_failed(stderr: String, at: DateTime<Utc>) -> Self {
        Self {
            exit_state: Some(exit_state::HANDLER_FAILURE),
            stdout: Some(None),
            stderr: Some(Some(stderr)),
            completed_at: Some(at),
            ..Self::default()
        }
    }

    /// Record a non-zero subprocess exit. Blank stderr is replaced with a
    /// fixed message so failures always carry a description.
    pub fn process_failed(code: i32, stderr: &str, at: DateTime<Utc>) -> Self {
        let stderr = if stderr.trim().is_empty() {
            NO_ERROR_OUTPUT.to_string()
        } else {
            stderr.to_string()
        };
        Self {
            exit_state: Some(code),
            stderr: Some(Some(stderr)),
            completed_at: Some(at),
            ..Self::default()
        }
    }

    /// Record that the subprocess could not be run to completion.
    pub fn dispatch_failed(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            exit_state: Some(exit_state::DISPATCH_FAILURE),
            stderr: Some(Some(reason.into())),
            completed_at: Some(at),
            ..Self::default()
        }
    }

    /// Backfill `completed_at` after a clean exit.
    pub fn complete_if_unset(at: DateTime<Utc>) -> Self {
        Self {
            completed_at_if_unset: Some(at),
            ..Self::default()
        }
    }

    /// Whether the update would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the update to an in-memory record.
    pub fn apply(&self, job: &mut Job) {
        if let Some(code) = self.exit_state {
            job.exit_state = code;
        }
        if let Some(stdout) = &self.stdout {
            job.stdout = stdout.clone();
        }
        if let Some(stderr) = &self.stderr {
            job.stderr = stderr.clone();
        }
        if let Some(at) = self.started_at {
            job.started_at = Some(at);
        }
        if let Some(at) = self.completed_at {
            job.completed_at = Some(at);
        }
        if let Some(at) = self.completed_at_if_unset {
            job.completed_at.get_or_insert(at);
        }
    }
}
