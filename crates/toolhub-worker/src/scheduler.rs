//! Cron scheduler for periodic cleanup.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use toolhub_core::config::CleanupConfig;
use toolhub_core::error::AppError;

use crate::cleanup::CleanupEngine;

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Engine invoked by the cleanup task
    engine: Arc<CleanupEngine>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(engine: Arc<CleanupEngine>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self { scheduler, engine })
    }

    /// Register the tasks enabled in `config`
    pub async fn register_tasks(&self, config: &CleanupConfig) -> Result<(), AppError> {
        if !config.enabled {
            tracing::info!("Scheduled cleanup disabled");
            return Ok(());
        }
        config.validate()?;
        self.register_full_cleanup(&config.schedule, config.max_age_hours)
            .await
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Full cleanup (time pass + command pass) on `schedule`
    async fn register_full_cleanup(&self, schedule: &str, max_age_hours: u32) -> Result<(), AppError> {
        let engine = Arc::clone(&self.engine);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let engine = Arc::clone(&engine);
            Box::pin(async move {
                tracing::debug!("Running scheduled cleanup");
                let report = engine.full_cleanup(max_age_hours).await;
                if let Some(error) = &report.error {
                    tracing::error!("Scheduled cleanup failed: {}", error);
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid cleanup schedule '{}': {}", schedule, e))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add cleanup schedule: {}", e))
        })?;

        tracing::info!(schedule, max_age_hours, "Registered: full_cleanup");
        Ok(())
    }
}
