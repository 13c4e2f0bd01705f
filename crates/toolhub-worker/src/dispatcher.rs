//! Job dispatcher: creates jobs, runs them out of process, records outcomes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing;

use toolhub_core::error::AppError;
use toolhub_core::result::AppResult;
use toolhub_core::types::id::JobId;
use toolhub_database::store::JobStore;
use toolhub_entity::job::{Job, JobUpdate};

use crate::launcher::{CommandLauncher, LaunchOutcome};

/// Default bound on one executor run.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Terminal snapshot of a dispatched job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub exit_state: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobResult {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            exit_state: job.exit_state,
            stdout: job.stdout,
            stderr: job.stderr,
            completed_at: job.completed_at,
        }
    }
}

/// Creates jobs and drives each one through a single executor run.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    jobs: Arc<dyn JobStore>,
    launcher: Arc<dyn CommandLauncher>,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with the default timeout.
    pub fn new(jobs: Arc<dyn JobStore>, launcher: Arc<dyn CommandLauncher>) -> Self {
        Self {
            jobs,
            launcher,
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    /// Override the executor timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The job store this dispatcher writes to.
    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    /// Persist a new, not-yet-started job.
    pub async fn create_job(
        &self,
        command_name: &str,
        arguments: Map<String, Value>,
    ) -> AppResult<JobId> {
        if command_name.trim().is_empty() {
            return Err(AppError::validation("Command name must not be empty"));
        }

        let job = Job::new(command_name, arguments, Utc::now());
        let id = self.jobs.insert(&job).await?;
        tracing::info!(job_id = %id, command = %command_name, "Created command");
        Ok(id)
    }

    /// Run a job to completion and return its terminal fields.
    ///
    /// A job can be dispatched once. Unknown IDs yield `NotFound`, jobs that
    /// were already started or finished yield `Conflict`, and neither case
    /// touches the record.
    pub async fn dispatch(&self, id: JobId) -> AppResult<JobResult> {
        if !self.jobs.claim(id, Utc::now()).await? {
            return match self.jobs.find_one(id).await? {
                None => Err(AppError::not_found(format!("Command {id} not found"))),
                Some(job) => Err(AppError::conflict(format!(
                    "Command {id} was already dispatched (exit state {})",
                    job.exit_state
                ))),
            };
        }

        tracing::info!(job_id = %id, "Dispatching command");

        let update = match tokio::time::timeout(self.timeout, self.launcher.launch(id)).await {
            Err(_) => {
                tracing::error!(job_id = %id, timeout_secs = self.timeout.as_secs(), "Executor timed out");
                JobUpdate::dispatch_failed(
                    format!(
                        "Process management error: executor timed out after {} seconds",
                        self.timeout.as_secs()
                    ),
                    Utc::now(),
                )
            }
            Ok(Err(e)) => {
                tracing::error!(job_id = %id, error = %e, "Executor could not be run");
                JobUpdate::dispatch_failed(format!("Process management error: {e}"), Utc::now())
            }
            Ok(Ok(outcome)) => self.interpret(id, outcome).await,
        };

        self.record(id, &update).await?;

        let job = self
            .jobs
            .find_one(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Command {id} not found")))?;

        tracing::info!(job_id = %id, exit_state = job.exit_state, "Command finished");
        Ok(job.into())
    }

    /// Map a finished executor run onto the record update.
    async fn interpret(&self, id: JobId, outcome: LaunchOutcome) -> JobUpdate {
        match outcome.code {
            Some(0) => match self.jobs.find_one(id).await {
                Ok(Some(job)) if job.is_terminal() => JobUpdate::complete_if_unset(Utc::now()),
                Ok(_) => {
                    tracing::error!(job_id = %id, "Executor exited cleanly without recording a result");
                    JobUpdate::dispatch_failed(
                        "Process management error: executor exited without recording a result",
                        Utc::now(),
                    )
                }
                Err(e) => JobUpdate::dispatch_failed(
                    format!("Process management error: {}", e.chain()),
                    Utc::now(),
                ),
            },
            Some(code) if code > 0 => {
                tracing::warn!(job_id = %id, exit_code = code, "Executor exited with failure");
                JobUpdate::process_failed(code, &outcome.stderr, Utc::now())
            }
            Some(code) => JobUpdate::dispatch_failed(
                format!("Process management error: executor exited with invalid code {code}"),
                Utc::now(),
            ),
            None => {
                tracing::error!(job_id = %id, "Executor terminated by signal");
                JobUpdate::dispatch_failed(
                    "Process management error: executor terminated by signal",
                    Utc::now(),
                )
            }
        }
    }

    /// Write the outcome. A failed write is retried once as a dispatch
    /// failure so the record never stays claimed but unfinished.
    async fn record(&self, id: JobId, update: &JobUpdate) -> AppResult<()> {
        match self.jobs.update_fields(id, update).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::not_found(format!("Command {id} not found"))),
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Failed to record command outcome");
                let fallback = JobUpdate::dispatch_failed(
                    format!("Process management error: {}", e.chain()),
                    Utc::now(),
                );
                self.jobs.update_fields(id, &fallback).await.map(|_| ())
            }
        }
    }

    /// Read-only snapshot of a job. Unknown or malformed IDs are `NotFound`.
    pub async fn get_status(&self, raw_id: &str) -> AppResult<Job> {
        let not_found = || AppError::not_found(format!("Command {raw_id} not found"));
        let id = JobId::parse(raw_id).ok_or_else(not_found)?;
        self.jobs.find_one(id).await?.ok_or_else(not_found)
    }

    /// Every job, newest first.
    pub async fn list_jobs(&self) -> AppResult<Vec<Job>> {
        self.jobs.find_all().await
    }

    /// Create a job and dispatch it on a detached task.
    pub async fn submit(
        &self,
        command_name: &str,
        arguments: Map<String, Value>,
    ) -> AppResult<JobId> {
        let id = self.create_job(command_name, arguments).await?;
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(id).await {
                tracing::error!(job_id = %id, error = %e, "Background dispatch failed");
            }
        });
        Ok(id)
    }
}
