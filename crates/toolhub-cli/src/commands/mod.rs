//! CLI command definitions and dispatch.

pub mod cleanup;
pub mod job;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use toolhub_core::config::{AppConfig, config_path_from_env};
use toolhub_core::error::AppError;
use toolhub_database::DatabasePool;
use toolhub_database::repositories::{BlobRepository, JobRepository};
use toolhub_database::store::JobStore;
use toolhub_storage::{BlobStore, LocalStorageProvider, TmpFileStore};

use crate::output::OutputFormat;

/// Toolhub: job inspection and temporary file maintenance
#[derive(Debug, Parser)]
#[command(name = "toolhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (defaults to $TOOLHUB_CONFIG, then config/default.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Temporary file cleanup
    Cleanup(cleanup::CleanupArgs),
    /// Command job inspection
    Job(job::JobArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config_path = self.config.clone().unwrap_or_else(config_path_from_env);
        let config = AppConfig::load(&config_path)?;
        let stores = Stores::connect(&config).await?;

        let result = match &self.command {
            Commands::Cleanup(args) => cleanup::execute(args, &config, &stores, self.format).await,
            Commands::Job(args) => job::execute(args, &stores, self.format).await,
        };

        stores.db.close().await;
        result
    }
}

/// Production stores opened from configuration.
pub struct Stores {
    db: DatabasePool,
    /// Job records
    pub jobs: Arc<dyn JobStore>,
    /// Temporary blobs
    pub blobs: Arc<dyn BlobStore>,
}

impl Stores {
    /// Connect to PostgreSQL and the blob directory.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let db = DatabasePool::connect(&config.database).await?;
        let provider = Arc::new(LocalStorageProvider::new(&config.storage.blob_root).await?);
        let jobs: Arc<dyn JobStore> = Arc::new(JobRepository::new(db.pool().clone()));
        let blobs: Arc<dyn BlobStore> = Arc::new(TmpFileStore::new(
            BlobRepository::new(db.pool().clone()),
            provider,
        ));
        Ok(Self { db, jobs, blobs })
    }
}
