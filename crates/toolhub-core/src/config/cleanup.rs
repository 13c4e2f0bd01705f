//! Temporary file cleanup configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Scheduled cleanup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Whether the cron-driven full cleanup is registered.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (seconds first).
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Age after which a temporary blob is deleted regardless of references.
    /// Must be at least 1; a zero threshold is only accepted from an
    /// operator who confirms it.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            schedule: default_schedule(),
            max_age_hours: default_max_age_hours(),
        }
    }
}

impl CleanupConfig {
    /// Reject settings that would make the scheduled run delete every blob.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_age_hours == 0 {
            return Err(AppError::configuration(
                "cleanup.max_age_hours must be at least 1; a zero threshold deletes every temporary file",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    "0 0 * * * *".to_string()
}

fn default_max_age_hours() -> u32 {
    24
}
