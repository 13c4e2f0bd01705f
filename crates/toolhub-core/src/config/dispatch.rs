//! Command dispatch configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for launching the command executor subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Path of the executor binary, resolved through `PATH` when bare.
    #[serde(default = "default_executor_path")]
    pub executor_path: String,
    /// Extra arguments placed before the job ID.
    #[serde(default)]
    pub executor_args: Vec<String>,
    /// Working directory for the executor (inherits when unset).
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Upper bound on one executor run before it is killed.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            executor_path: default_executor_path(),
            executor_args: Vec::new(),
            working_dir: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl DispatchConfig {
    /// The subprocess timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_executor_path() -> String {
    "toolhub-exec".to_string()
}

fn default_timeout() -> u64 {
    600
}
