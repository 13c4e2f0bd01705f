//! Toolhub Server: tool endpoints backed by a single-node job runner.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use toolhub_core::config::{AppConfig, config_path_from_env};
use toolhub_core::error::AppError;
use toolhub_core::traits::storage::StorageProvider;
use toolhub_database::DatabasePool;
use toolhub_database::repositories::{BlobRepository, JobRepository};
use toolhub_database::store::JobStore;
use toolhub_storage::{BlobStore, LocalStorageProvider, TmpFileStore};
use toolhub_worker::{CleanupEngine, CronScheduler, Dispatcher, SubprocessLauncher};

#[tokio::main]
async fn main() {
    let config_path = config_path_from_env();
    let config = match AppConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, config_path).await {
        tracing::error!("Server error: {}", e.chain());
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig, config_path: String) -> Result<(), AppError> {
    tracing::info!("Starting Toolhub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Configuration loaded from '{}'", config_path);

    // ── Step 1: Create data directories ──────────────────────────
    create_data_directories(&config).await?;

    // ── Step 2: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;

    if !db.health_check().await? {
        return Err(AppError::database("Database health check failed"));
    }

    tracing::info!("Running database migrations...");
    db.migrate().await?;
    tracing::info!("Database migrations complete");

    // ── Step 3: Stores ───────────────────────────────────────────
    let provider = Arc::new(LocalStorageProvider::new(&config.storage.blob_root).await?);
    if !provider.health_check().await? {
        return Err(AppError::storage(format!(
            "Storage root '{}' is not a usable directory",
            config.storage.blob_root
        )));
    }
    tracing::info!(provider = provider.provider_type(), root = %config.storage.blob_root, "Blob storage ready");
    let jobs: Arc<dyn JobStore> = Arc::new(JobRepository::new(db.pool().clone()));
    let blobs: Arc<dyn BlobStore> = Arc::new(TmpFileStore::new(
        BlobRepository::new(db.pool().clone()),
        provider,
    ));

    // ── Step 4: Dispatcher ───────────────────────────────────────
    let launcher = SubprocessLauncher::from_config(&config.dispatch).config_path(config_path);
    let dispatcher = Dispatcher::new(Arc::clone(&jobs), Arc::new(launcher))
        .with_timeout(config.dispatch.timeout());
    tracing::info!(
        executor = %config.dispatch.executor_path,
        timeout_seconds = config.dispatch.timeout_seconds,
        "Dispatcher ready"
    );

    // ── Step 5: Cleanup engine + scheduler ───────────────────────
    let cleanup = Arc::new(CleanupEngine::new(Arc::clone(&jobs), Arc::clone(&blobs)));
    let mut scheduler = CronScheduler::new(Arc::clone(&cleanup)).await?;
    scheduler.register_tasks(&config.cleanup).await?;
    scheduler.start().await?;

    // ── Step 6: Build and start HTTP server ──────────────────────
    let addr = config.server.bind_address();
    let state = toolhub_api::AppState::new(config, blobs, dispatcher, cleanup);
    let app = toolhub_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Toolhub server listening on {}", addr);

    // ── Step 7: Graceful shutdown ────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown failed: {}", e);
    }
    db.close().await;

    tracing::info!("Toolhub server shut down gracefully");
    Ok(())
}

/// Create required data directories
async fn create_data_directories(config: &AppConfig) -> Result<(), AppError> {
    let temp_dir = config.storage.temp_dir();
    let dirs = [
        std::path::Path::new(&config.storage.blob_root),
        temp_dir.as_path(),
    ];

    for dir in dirs {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::internal(format!("Failed to create dir '{}': {}", dir.display(), e))
        })?;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
