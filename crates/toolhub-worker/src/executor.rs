//! Command executor: loads one job, runs its handler, records the outcome.
//!
//! The executor is the body of the `toolhub-exec` binary. It is also driven
//! in-process by [`crate::launcher::InProcessLauncher`] so tests can exercise
//! the full lifecycle without a second executable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing;

use toolhub_core::error::AppError;
use toolhub_core::types::id::JobId;
use toolhub_database::store::JobStore;
use toolhub_entity::job::JobUpdate;
use toolhub_storage::blob::BlobStore;

/// Everything a handler may touch while running one job.
pub struct CommandContext<'a> {
    /// The job being executed.
    pub job_id: JobId,
    /// The job's arguments, unvalidated.
    pub arguments: &'a Map<String, Value>,
    /// Job record store.
    pub jobs: &'a dyn JobStore,
    /// Temporary blob store.
    pub blobs: &'a dyn BlobStore,
}

/// Trait for command implementations
#[async_trait]
pub trait CommandHandler: Send + Sync + fmt::Debug {
    /// Registry key (e.g., `"MergePdfs"`).
    fn name(&self) -> &str;

    /// Run the command. Handlers validate their own argument shape.
    async fn handle(&self, ctx: CommandContext<'_>) -> Result<Value, HandlerError>;
}

/// Error from a command handler
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The arguments do not have the shape the handler expects
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// The command ran and failed
    #[error("{0}")]
    Failed(String),

    /// A store or I/O error surfaced while running
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl HandlerError {
    /// Text recorded in the job's `stderr`: the message plus every cause.
    pub fn describe(&self) -> String {
        match self {
            Self::Internal(e) => format!("Command failed: {}", e.chain()),
            other => format!("Command failed: {other}"),
        }
    }
}

/// Immutable mapping from command name to handler.
///
/// Built once at process start and shared by reference; there is no way to
/// add handlers after construction.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a registry with `handler` added under its own name.
    pub fn with(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        let name = handler.name().to_string();
        tracing::debug!(command = %name, "Registered command handler");
        self.handlers.insert(name, handler);
        self
    }

    /// Look up a handler.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(name)
    }

    /// Whether a handler is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Process exit status of one executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorExit {
    /// Handler succeeded and the result was recorded.
    Success,
    /// Handler failed and the failure was recorded.
    HandlerFailed,
    /// The job could not be run; the record was not touched.
    Rejected,
    /// The store failed while loading or recording.
    StorageError,
}

impl ExecutorExit {
    /// Numeric process exit code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::HandlerFailed => 1,
            Self::Rejected => 3,
            Self::StorageError => 4,
        }
    }
}

/// Outcome of one executor run: what to print and how to exit.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Exit status.
    pub exit: ExecutorExit,
    /// Text for the process stdout (the serialized result on success).
    pub stdout: String,
    /// Text for the process stderr.
    pub stderr: String,
}

impl ExecutionReport {
    fn new(exit: ExecutorExit, stdout: String, stderr: String) -> Self {
        Self {
            exit,
            stdout,
            stderr,
        }
    }

    fn rejected(message: String) -> Self {
        tracing::debug!("{}", message);
        Self::new(ExecutorExit::Rejected, String::new(), message)
    }

    fn storage_error(context: &str, err: &AppError) -> Self {
        let message = format!("{context}: {}", err.chain());
        tracing::error!("{}", message);
        Self::new(ExecutorExit::StorageError, String::new(), message)
    }
}

/// Runs a single job to completion against the stores.
pub struct CommandExecutor {
    registry: HandlerRegistry,
    jobs: Arc<dyn JobStore>,
    blobs: Arc<dyn BlobStore>,
}

impl fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("commands", &self.registry.names())
            .finish()
    }
}

impl CommandExecutor {
    /// Create an executor over the given registry and stores.
    pub fn new(
        registry: HandlerRegistry,
        jobs: Arc<dyn JobStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            registry,
            jobs,
            blobs,
        }
    }

    /// Execute the job named by `raw_id`.
    ///
    /// On success or handler failure the terminal fields are written in a
    /// single update. Rejections leave the record untouched.
    pub async fn run(&self, raw_id: &str) -> ExecutionReport {
        let Some(job_id) = JobId::parse(raw_id) else {
            return ExecutionReport::rejected(format!("Invalid command ID: '{raw_id}'"));
        };

        let job = match self.jobs.find_one(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => return ExecutionReport::rejected(format!("Command {job_id} not found")),
            Err(e) => return ExecutionReport::storage_error("Failed to load command", &e),
        };

        if job.is_terminal() {
            return ExecutionReport::rejected(format!(
                "Command {job_id} already finished with exit state {}",
                job.exit_state
            ));
        }

        let Some(handler) = self.registry.get(&job.command_name) else {
            return ExecutionReport::rejected(format!(
                "Unknown command: '{}'",
                job.command_name
            ));
        };

        tracing::info!(job_id = %job_id, command = %job.command_name, "Executing command");

        let ctx = CommandContext {
            job_id,
            arguments: &job.arguments,
            jobs: self.jobs.as_ref(),
            blobs: self.blobs.as_ref(),
        };

        let (update, report) = match handler.handle(ctx).await {
            Ok(result) => {
                let rendered = match serde_json::to_string_pretty(&result) {
                    Ok(text) => text,
                    Err(e) => {
                        let err = HandlerError::Internal(e.into());
                        return self.record_failure(job_id, &err).await;
                    }
                };
                tracing::info!(job_id = %job_id, "Command completed successfully");
                (
                    JobUpdate::succeeded(rendered.clone(), Utc::now()),
                    ExecutionReport::new(ExecutorExit::Success, rendered, String::new()),
                )
            }
            Err(err) => return self.record_failure(job_id, &err).await,
        };

        match self.jobs.update_fields(job_id, &update).await {
            Ok(_) => report,
            Err(e) => ExecutionReport::storage_error("Failed to record command result", &e),
        }
    }

    async fn record_failure(&self, job_id: JobId, err: &HandlerError) -> ExecutionReport {
        let description = err.describe();
        tracing::info!(job_id = %job_id, error = %err, "Command failed");

        let update = JobUpdate::handler_failed(description.clone(), Utc::now());
        match self.jobs.update_fields(job_id, &update).await {
            Ok(_) => ExecutionReport::new(ExecutorExit::HandlerFailed, String::new(), description),
            Err(e) => ExecutionReport::storage_error("Failed to record command failure", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Named(&'static str);

    #[async_trait]
    impl CommandHandler for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn handle(&self, _ctx: CommandContext<'_>) -> Result<Value, HandlerError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = HandlerRegistry::new()
            .with(Arc::new(Named("MergePdfs")))
            .with(Arc::new(Named("Echo")));

        assert!(registry.contains("MergePdfs"));
        assert!(registry.get("Missing").is_none());
        assert_eq!(registry.names(), vec!["Echo", "MergePdfs"]);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExecutorExit::Success.code(), 0);
        assert_eq!(ExecutorExit::HandlerFailed.code(), 1);
        assert_eq!(ExecutorExit::Rejected.code(), 3);
        assert_eq!(ExecutorExit::StorageError.code(), 4);
    }

    #[test]
    fn test_describe_includes_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = HandlerError::Internal(AppError::with_source(
            toolhub_core::error::ErrorKind::Storage,
            "Failed to write merged output",
            io,
        ));
        let text = err.describe();
        assert!(text.starts_with("Command failed: STORAGE: Failed to write merged output"));
        assert!(text.contains("disk full"));

        let err = HandlerError::Validation("file_ids must contain at least 2 entries".into());
        assert_eq!(
            err.describe(),
            "Command failed: Invalid arguments: file_ids must contain at least 2 entries"
        );
    }
}
