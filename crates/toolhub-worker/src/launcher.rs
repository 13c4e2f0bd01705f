//! Ways of running the command executor for one job.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing;

use toolhub_core::config::{CONFIG_PATH_ENV, DispatchConfig};
use toolhub_core::types::id::JobId;

use crate::executor::CommandExecutor;

/// Errors from starting or waiting on the executor
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The executor process could not be started
    #[error("Failed to start executor '{program}': {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the executor failed after it started
    #[error("Failed to wait for executor: {0}")]
    Wait(#[source] std::io::Error),
}

/// How the executor terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Exit code, or `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

/// Runs the command executor for a job and reports how it ended.
#[async_trait]
pub trait CommandLauncher: Send + Sync + std::fmt::Debug + 'static {
    /// Run the executor for `job_id` and wait for it to finish.
    async fn launch(&self, job_id: JobId) -> Result<LaunchOutcome, LaunchError>;
}

/// Launches the executor as a child process.
///
/// The child receives only the job ID as its final argument. It is killed
/// if the returned future is dropped, which is how dispatch timeouts stop it.
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    config_path: Option<String>,
}

impl SubprocessLauncher {
    /// Create a launcher for `program` with no extra arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            config_path: None,
        }
    }

    /// Build a launcher from dispatch settings.
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            program: config.executor_path.clone(),
            args: config.executor_args.clone(),
            working_dir: config.working_dir.as_ref().map(PathBuf::from),
            config_path: None,
        }
    }

    /// Arguments placed before the job ID.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Configuration file the child should load.
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }
}

#[async_trait]
impl CommandLauncher for SubprocessLauncher {
    async fn launch(&self, job_id: JobId) -> Result<LaunchOutcome, LaunchError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(job_id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        if let Some(path) = &self.config_path {
            cmd.env(CONFIG_PATH_ENV, path);
        }

        tracing::debug!(
            job_id = %job_id,
            program = %self.program,
            args = ?self.args,
            "Spawning executor"
        );

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let output = child.wait_with_output().await.map_err(LaunchError::Wait)?;

        Ok(LaunchOutcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Runs the executor on the current runtime instead of a child process.
#[derive(Debug, Clone)]
pub struct InProcessLauncher {
    executor: Arc<CommandExecutor>,
}

impl InProcessLauncher {
    /// Create a launcher around an executor.
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl CommandLauncher for InProcessLauncher {
    async fn launch(&self, job_id: JobId) -> Result<LaunchOutcome, LaunchError> {
        let report = self.executor.run(&job_id.to_string()).await;
        Ok(LaunchOutcome {
            code: Some(report.exit.code()),
            stdout: report.stdout,
            stderr: report.stderr,
        })
    }
}
