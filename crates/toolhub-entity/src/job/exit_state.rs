//! Job exit-state codes and their interpretation.
//!
//! The stored value is a plain integer because subprocess exit codes are
//! recorded verbatim; [`JobState`] is the typed reading of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Not started yet, or still running.
pub const RUNNING: i32 = -1;

/// The handler returned a result.
pub const SUCCESS: i32 = 0;

/// The handler raised; the executor recorded the error.
pub const HANDLER_FAILURE: i32 = 1;

/// The subprocess could not be run to completion at all.
pub const DISPATCH_FAILURE: i32 = 2;

/// Typed view of a job's `exit_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// `exit_state == -1`.
    Running,
    /// `exit_state == 0`.
    Succeeded,
    /// `exit_state == 1`.
    HandlerFailed,
    /// `exit_state == 2`.
    DispatchFailed,
    /// Any other positive code reported by the subprocess.
    Exited(i32),
}

impl JobState {
    /// Interpret a stored exit state.
    pub fn from_code(code: i32) -> Self {
        match code {
            RUNNING => Self::Running,
            SUCCESS => Self::Succeeded,
            HANDLER_FAILURE => Self::HandlerFailed,
            DISPATCH_FAILURE => Self::DispatchFailed,
            other => Self::Exited(other),
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Check if the job finished successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::HandlerFailed => "handler_failed",
            Self::DispatchFailed => "dispatch_failed",
            Self::Exited(_) => "exited",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited({code})"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
