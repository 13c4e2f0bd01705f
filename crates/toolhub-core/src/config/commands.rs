//! Command handler configuration.

use serde::{Deserialize, Serialize};

/// Settings for the built-in command handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// `MergePdfs` handler settings.
    #[serde(default)]
    pub merge_pdfs: MergePdfsConfig,
}

/// External tool used by the `MergePdfs` handler.
///
/// `{inputs}` expands to one argument per input file, `{output}` to the
/// output path. qpdf exits 3 on recoverable warnings, so the default
/// template maps that to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePdfsConfig {
    /// Merge tool executable.
    #[serde(default = "default_program")]
    pub program: String,
    /// Argument template.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Timeout for one merge run.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for MergePdfsConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_program() -> String {
    "qpdf".to_string()
}

fn default_args() -> Vec<String> {
    [
        "--warning-exit-0",
        "--empty",
        "--pages",
        "{inputs}",
        "--",
        "{output}",
    ]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timeout() -> u64 {
    120
}
