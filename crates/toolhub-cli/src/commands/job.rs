//! Command job inspection CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use toolhub_core::error::AppError;
use toolhub_core::types::id::JobId;
use toolhub_entity::job::Job;

use super::Stores;
use crate::output::{self, OutputFormat};

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Job subcommand
    #[command(subcommand)]
    pub command: JobCommand,
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Show one job with its output
    Status {
        /// Job ID
        id: String,
    },
    /// List jobs, newest first
    List {
        /// Maximum number of jobs to show
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

/// Job display row
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    /// Job ID
    id: String,
    /// Command
    command: String,
    /// Status
    status: String,
    /// Exit state
    exit_state: i32,
    /// Created
    created: String,
    /// Completed
    completed: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            command: job.command_name.clone(),
            status: job.state().to_string(),
            exit_state: job.exit_state,
            created: job.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            completed: job
                .completed_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Execute job commands
pub async fn execute(args: &JobArgs, stores: &Stores, format: OutputFormat) -> Result<(), AppError> {
    let jobs = Arc::clone(&stores.jobs);

    match &args.command {
        JobCommand::Status { id } => {
            let not_found = || AppError::not_found(format!("Command {id} not found"));
            let job_id = JobId::parse(id).ok_or_else(not_found)?;
            let job = jobs.find_one(job_id).await?.ok_or_else(not_found)?;

            match format {
                OutputFormat::Json => output::print_json(&job),
                OutputFormat::Table => print_job(&job),
            }
        }
        JobCommand::List { limit } => {
            let all = jobs.find_all().await?;
            let rows: Vec<JobRow> = all.iter().take(*limit).map(JobRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

fn print_job(job: &Job) {
    let row = JobRow::from(job);
    output::print_kv("ID", &row.id);
    output::print_kv("Command", &row.command);
    output::print_kv("Status", &row.status);
    output::print_kv("Exit state", &row.exit_state.to_string());
    output::print_kv("Created", &row.created);
    output::print_kv(
        "Started",
        &job.started_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    output::print_kv("Completed", &row.completed);
    output::print_kv(
        "Arguments",
        &serde_json::to_string(&job.arguments).unwrap_or_default(),
    );
    if let Some(stdout) = &job.stdout {
        println!("stdout:\n{stdout}");
    }
    if let Some(stderr) = &job.stderr {
        println!("stderr:\n{stderr}");
    }
}
