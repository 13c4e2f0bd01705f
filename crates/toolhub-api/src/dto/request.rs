//! Request DTOs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Word an operator must type to run an emergency cleanup.
pub const EMERGENCY_CONFIRMATION: &str = "YES";

/// Which cleanup to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupMode {
    /// Delete blobs older than `max_age_hours`.
    Time,
    /// Delete blobs of finished commands.
    Commands,
    /// Both passes.
    Full,
    /// Delete every blob.
    Emergency,
}

impl fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Time => "time",
            Self::Commands => "commands",
            Self::Full => "full",
            Self::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

/// POST /api/admin/cleanup body.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupRequest {
    /// Cleanup to run.
    pub mode: CleanupMode,
    /// Age threshold for `time` and `full`; defaults to the configured value.
    #[serde(default)]
    pub max_age_hours: Option<u32>,
    /// Must equal `"YES"` for any run that deletes every blob.
    #[serde(default)]
    pub confirm: Option<String>,
}

impl CleanupRequest {
    /// Whether the emergency confirmation word was supplied.
    pub fn is_confirmed(&self) -> bool {
        self.confirm.as_deref() == Some(EMERGENCY_CONFIRMATION)
    }

    /// Whether this run deletes every blob when `max_age_hours` is the
    /// effective age threshold.
    pub fn deletes_everything(&self, max_age_hours: u32) -> bool {
        match self.mode {
            CleanupMode::Emergency => true,
            CleanupMode::Time | CleanupMode::Full => max_age_hours == 0,
            CleanupMode::Commands => false,
        }
    }
}

/// Query for GET /api/admin/cleanup/preview.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewQuery {
    /// Age threshold; defaults to the configured value.
    pub max_age_hours: Option<u32>,
}
