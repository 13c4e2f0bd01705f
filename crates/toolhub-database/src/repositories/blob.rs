//! PostgreSQL repository for temporary blob metadata.

use sqlx::PgPool;

use toolhub_core::error::{AppError, ErrorKind};
use toolhub_core::result::AppResult;
use toolhub_core::types::id::BlobId;
use toolhub_entity::blob::BlobMeta;

/// Repository for the `tmp_files` table. Content bytes live in a
/// storage provider; only the metadata is kept here.
#[derive(Debug, Clone)]
pub struct BlobRepository {
    pool: PgPool,
}

impl BlobRepository {
    /// Create a new blob metadata repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a metadata record.
    pub async fn create(&self, meta: &BlobMeta) -> AppResult<BlobId> {
        sqlx::query_scalar::<_, BlobId>(
            "INSERT INTO tmp_files (id, filename, content_type, size_bytes, upload_date, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(meta.id)
        .bind(&meta.filename)
        .bind(&meta.content_type)
        .bind(meta.size_bytes)
        .bind(meta.upload_date)
        .bind(sqlx::types::Json(&meta.metadata))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record blob", e))
    }

    /// Find a metadata record by ID.
    pub async fn find_by_id(&self, id: BlobId) -> AppResult<Option<BlobMeta>> {
        sqlx::query_as::<_, BlobMeta>("SELECT * FROM tmp_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find blob", e))
    }

    /// List every metadata record, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<BlobMeta>> {
        sqlx::query_as::<_, BlobMeta>("SELECT * FROM tmp_files ORDER BY upload_date ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list blobs", e))
    }

    /// Delete a metadata record. Returns `false` if it did not exist.
    pub async fn delete(&self, id: BlobId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM tmp_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete blob", e))?;
        Ok(result.rows_affected() > 0)
    }
}
