//! `toolhub-exec <command_id>`: run one job's handler and record the result.
//!
//! Exit codes: 0 success, 1 handler failure, 3 rejected (bad or unknown ID,
//! unknown command), 4 storage or configuration failure. The result is
//! printed on stdout; diagnostics go to stderr.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use toolhub_core::config::AppConfig;
use toolhub_core::error::AppError;
use toolhub_database::DatabasePool;
use toolhub_database::repositories::{BlobRepository, JobRepository};
use toolhub_database::store::JobStore;
use toolhub_storage::blob::BlobStore;
use toolhub_storage::{LocalStorageProvider, TmpFileStore};
use toolhub_worker::commands::builtin_registry;
use toolhub_worker::executor::{CommandExecutor, ExecutionReport, ExecutorExit};

/// Connections needed for one job: the record plus blob metadata.
const EXECUTOR_POOL_SIZE: u32 = 2;

#[tokio::main]
async fn main() {
    let Some(raw_id) = std::env::args().nth(1) else {
        eprintln!("Usage: toolhub-exec <command_id>");
        std::process::exit(ExecutorExit::Rejected.code());
    };

    let config = match AppConfig::load_from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(ExecutorExit::StorageError.code());
        }
    };

    init_logging(&config);

    let code = match run(&config, &raw_id).await {
        Ok(report) => {
            if !report.stdout.is_empty() {
                println!("{}", report.stdout);
            }
            if !report.stderr.is_empty() {
                eprintln!("{}", report.stderr);
            }
            report.exit.code()
        }
        Err(e) => {
            eprintln!("{}", e.chain());
            ExecutorExit::StorageError.code()
        }
    };

    std::process::exit(code);
}

/// Log to stderr at `warn` unless `RUST_LOG` says otherwise; stderr is
/// captured into the job record on failure.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .compact()
                .with_ansi(false)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(config: &AppConfig, raw_id: &str) -> Result<ExecutionReport, AppError> {
    let db = DatabasePool::connect_with_limit(&config.database, EXECUTOR_POOL_SIZE).await?;

    let provider = Arc::new(LocalStorageProvider::new(&config.storage.blob_root).await?);
    let jobs: Arc<dyn JobStore> = Arc::new(JobRepository::new(db.pool().clone()));
    let blobs: Arc<dyn BlobStore> = Arc::new(TmpFileStore::new(
        BlobRepository::new(db.pool().clone()),
        provider,
    ));

    let registry = builtin_registry(&config.commands, &config.storage.temp_dir());
    let executor = CommandExecutor::new(registry, jobs, blobs);
    let report = executor.run(raw_id).await;

    db.close().await;
    Ok(report)
}
