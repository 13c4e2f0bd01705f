//! PostgreSQL job repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use toolhub_core::error::{AppError, ErrorKind};
use toolhub_core::result::AppResult;
use toolhub_core::types::id::JobId;
use toolhub_entity::job::{Job, JobUpdate, exit_state};

use crate::store::JobStore;

/// Repository for the `commands` table.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn insert(&self, job: &Job) -> AppResult<JobId> {
        sqlx::query_scalar::<_, JobId>(
            "INSERT INTO commands \
             (id, command_name, arguments, exit_state, stdout, stderr, created_at, started_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(job.id)
        .bind(&job.command_name)
        .bind(sqlx::types::Json(&job.arguments))
        .bind(job.exit_state)
        .bind(&job.stdout)
        .bind(&job.stderr)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create command", e))
    }

    async fn update_fields(&self, id: JobId, update: &JobUpdate) -> AppResult<bool> {
        if update.is_empty() {
            return Ok(self.find_one(id).await?.is_some());
        }

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE commands SET ");
        {
            let mut set = builder.separated(", ");
            if let Some(code) = update.exit_state {
                set.push("exit_state = ").push_bind_unseparated(code);
            }
            if let Some(stdout) = &update.stdout {
                set.push("stdout = ").push_bind_unseparated(stdout.clone());
            }
            if let Some(stderr) = &update.stderr {
                set.push("stderr = ").push_bind_unseparated(stderr.clone());
            }
            if let Some(at) = update.started_at {
                set.push("started_at = ").push_bind_unseparated(at);
            }
            if let Some(at) = update.completed_at {
                set.push("completed_at = ").push_bind_unseparated(at);
            } else if let Some(at) = update.completed_at_if_unset {
                set.push("completed_at = COALESCE(completed_at, ")
                    .push_bind_unseparated(at)
                    .push_unseparated(")");
            }
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update command", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_one(&self, id: JobId) -> AppResult<Option<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM commands WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find command", e))
    }

    async fn find_all(&self) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>("SELECT * FROM commands ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list commands", e))
    }

    async fn find_completed_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Job>> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM commands WHERE exit_state <> $1 AND completed_at < $2 \
             ORDER BY completed_at ASC",
        )
        .bind(exit_state::RUNNING)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list completed commands", e)
        })
    }

    async fn claim(&self, id: JobId, started_at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE commands SET started_at = $2 \
             WHERE id = $1 AND started_at IS NULL AND exit_state = $3",
        )
        .bind(id)
        .bind(started_at)
        .bind(exit_state::RUNNING)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim command", e))?;
        Ok(result.rows_affected() == 1)
    }
}
