//! Temporary file cleanup CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use toolhub_core::config::AppConfig;
use toolhub_core::error::AppError;
use toolhub_worker::CleanupEngine;
use toolhub_worker::cleanup::{BlobSummary, CleanupReport, FullCleanupReport};

use super::Stores;
use crate::output::{self, OutputFormat};

/// Word an operator must type to run an emergency cleanup.
const EMERGENCY_CONFIRMATION: &str = "YES";

/// Arguments for cleanup commands
#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Cleanup subcommand
    #[command(subcommand)]
    pub command: CleanupCommand,
}

/// Cleanup subcommands
#[derive(Debug, Subcommand)]
pub enum CleanupCommand {
    /// Show count, size, and age distribution of temporary files
    Stats,
    /// List temporary files no command references
    Orphans,
    /// Show what a full cleanup would delete, without deleting
    Preview {
        /// Age threshold in hours (defaults to cleanup.max_age_hours)
        #[arg(long)]
        max_age_hours: Option<u32>,
    },
    /// Delete files older than the age threshold (0 deletes all)
    Time {
        /// Age threshold in hours (defaults to cleanup.max_age_hours)
        #[arg(long)]
        max_age_hours: Option<u32>,
        /// Skip the typed confirmation for a zero threshold
        #[arg(long)]
        yes: bool,
    },
    /// Delete files of commands that finished over an hour ago
    Commands,
    /// Time-based and command-based cleanup together
    Full {
        /// Age threshold in hours (defaults to cleanup.max_age_hours)
        #[arg(long)]
        max_age_hours: Option<u32>,
        /// Skip the typed confirmation for a zero threshold
        #[arg(long)]
        yes: bool,
    },
    /// Delete ALL temporary files
    Emergency {
        /// Skip the typed confirmation
        #[arg(long)]
        yes: bool,
    },
}

/// Temporary file display row
#[derive(Debug, Serialize, Tabled)]
struct BlobRow {
    /// Blob ID
    id: String,
    /// Filename
    filename: String,
    /// Size in bytes
    size_bytes: i64,
    /// Upload date
    uploaded: String,
}

impl From<&BlobSummary> for BlobRow {
    fn from(b: &BlobSummary) -> Self {
        Self {
            id: b.id.to_string(),
            filename: b.filename.clone(),
            size_bytes: b.size_bytes,
            uploaded: b.upload_date.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute cleanup commands
pub async fn execute(
    args: &CleanupArgs,
    config: &AppConfig,
    stores: &Stores,
    format: OutputFormat,
) -> Result<(), AppError> {
    let engine = CleanupEngine::new(Arc::clone(&stores.jobs), Arc::clone(&stores.blobs));
    let default_age = config.cleanup.max_age_hours;

    match &args.command {
        CleanupCommand::Stats => {
            let stats = engine.get_cleanup_stats().await?;
            match format {
                OutputFormat::Json => output::print_json(&stats),
                OutputFormat::Table => {
                    println!("Temporary files:");
                    output::print_kv("Total files", &stats.total_files.to_string());
                    output::print_kv("Total size", &format!("{} MB", stats.total_size_mb));
                    println!("Files by age:");
                    let ages = &stats.files_by_age;
                    output::print_kv("under 1h", &ages.under_1h.to_string());
                    output::print_kv("1h to 24h", &ages.one_to_24h.to_string());
                    output::print_kv("1d to 7d", &ages.one_to_7d.to_string());
                    output::print_kv("over 7d", &ages.over_7d.to_string());
                }
            }
        }
        CleanupCommand::Orphans => {
            let report = engine.find_orphans().await?;
            match format {
                OutputFormat::Json => output::print_json(&report),
                OutputFormat::Table => {
                    print_blobs(&report.files);
                    output::print_kv("Orphaned files", &report.count.to_string());
                    output::print_kv("Orphaned size", &format!("{} MB", report.size_mb));
                }
            }
        }
        CleanupCommand::Preview { max_age_hours } => {
            let preview = engine.preview(max_age_hours.unwrap_or(default_age)).await?;
            match format {
                OutputFormat::Json => output::print_json(&preview),
                OutputFormat::Table => {
                    println!("Older than {}h:", preview.max_age_hours);
                    print_blobs(&preview.time_based);
                    println!("Referenced by finished commands:");
                    print_blobs(&preview.command_based);
                    output::print_kv("Would delete", &preview.total_unique.to_string());
                    output::print_kv("Would free", &format!("{} MB", preview.total_size_mb));
                    output::print_kv("Orphans (kept)", &preview.orphans.count.to_string());
                }
            }
        }
        CleanupCommand::Time { max_age_hours, yes } => {
            let max_age_hours = max_age_hours.unwrap_or(default_age);
            if needs_confirmation(max_age_hours, *yes) && !confirm_emergency()? {
                println!("Cleanup cancelled.");
                return Ok(());
            }
            let report = engine.cleanup_old_files(max_age_hours).await;
            print_report(&report, format);
        }
        CleanupCommand::Commands => {
            let report = engine.cleanup_by_command_status().await;
            print_report(&report, format);
        }
        CleanupCommand::Full { max_age_hours, yes } => {
            let max_age_hours = max_age_hours.unwrap_or(default_age);
            if needs_confirmation(max_age_hours, *yes) && !confirm_emergency()? {
                println!("Cleanup cancelled.");
                return Ok(());
            }
            let report = engine.full_cleanup(max_age_hours).await;
            print_full_report(&report, format);
        }
        CleanupCommand::Emergency { yes } => {
            if !yes && !confirm_emergency()? {
                println!("Emergency cleanup cancelled.");
                return Ok(());
            }
            let report = engine.emergency_cleanup().await;
            print_report(&report, format);
        }
    }

    Ok(())
}

fn print_blobs(blobs: &[BlobSummary]) {
    let rows: Vec<BlobRow> = blobs.iter().map(BlobRow::from).collect();
    output::print_list(&rows, OutputFormat::Table);
}

fn print_report(report: &CleanupReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(report),
        OutputFormat::Table => match &report.error {
            None => {
                output::print_success("Cleanup completed");
                output::print_kv("Files deleted", &report.deleted_count.to_string());
                output::print_kv("Space freed", &format!("{} MB", report.size_freed_mb));
            }
            Some(error) => {
                output::print_error(&format!("Cleanup failed: {error}"));
                output::print_kv("Deleted before failure", &report.deleted_count.to_string());
            }
        },
    }
}

fn print_full_report(report: &FullCleanupReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(report),
        OutputFormat::Table => {
            if let Some(error) = &report.error {
                output::print_error(&format!("Cleanup failed: {error}"));
            } else {
                output::print_success("Cleanup completed");
            }
            output::print_kv("Time-based deleted", &report.time_based.deleted_count.to_string());
            output::print_kv(
                "Command-based deleted",
                &report.command_based.deleted_count.to_string(),
            );
            output::print_kv("Total files deleted", &report.total_deleted_files.to_string());
            output::print_kv("Total space freed", &format!("{} MB", report.total_size_freed_mb));
        }
    }
}

fn confirm_emergency() -> Result<bool, AppError> {
    output::print_warning("EMERGENCY CLEANUP will delete ALL temporary files.");
    let answer: String = dialoguer::Input::new()
        .with_prompt(format!("Type '{EMERGENCY_CONFIRMATION}' to confirm"))
        .allow_empty(true)
        .interact_text()
        .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;
    Ok(is_confirmation(&answer))
}

/// A zero threshold deletes every file, so it is confirmed like an emergency.
fn needs_confirmation(max_age_hours: u32, yes: bool) -> bool {
    max_age_hours == 0 && !yes
}

/// Only the exact word confirms; case and surrounding text matter.
fn is_confirmation(answer: &str) -> bool {
    answer == EMERGENCY_CONFIRMATION
}
