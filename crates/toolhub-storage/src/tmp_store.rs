//! Production blob store: metadata in `tmp_files`, content on a provider.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use toolhub_core::error::AppError;
use toolhub_core::result::AppResult;
use toolhub_core::traits::storage::StorageProvider;
use toolhub_core::types::id::BlobId;
use toolhub_database::repositories::BlobRepository;
use toolhub_entity::blob::{BlobMeta, NewBlob, StoredBlob};

use crate::blob::BlobStore;

/// Provider directory holding blob content.
const CONTENT_PREFIX: &str = "tmp_files";

/// Blob store backed by the `tmp_files` table and a storage provider.
#[derive(Debug, Clone)]
pub struct TmpFileStore {
    repo: BlobRepository,
    provider: Arc<dyn StorageProvider>,
}

impl TmpFileStore {
    /// Create a store over the given metadata repository and provider.
    pub fn new(repo: BlobRepository, provider: Arc<dyn StorageProvider>) -> Self {
        Self { repo, provider }
    }

    fn content_path(id: BlobId) -> String {
        format!("{CONTENT_PREFIX}/{id}")
    }
}

#[async_trait]
impl BlobStore for TmpFileStore {
    async fn store(&self, blob: NewBlob) -> AppResult<BlobId> {
        let id = BlobId::new();
        let (meta, content) = blob.into_parts(id, Utc::now());
        let path = Self::content_path(id);

        self.provider.write(&path, content).await?;
        if let Err(e) = self.repo.create(&meta).await {
            if let Err(cleanup) = self.provider.delete(&path).await {
                warn!(blob_id = %id, error = %cleanup, "Failed to remove content after metadata insert failed");
            }
            return Err(e);
        }

        debug!(blob_id = %id, filename = %meta.filename, size = meta.size_bytes, "Stored blob");
        Ok(id)
    }

    async fn fetch(&self, id: BlobId) -> AppResult<Option<StoredBlob>> {
        let Some(meta) = self.repo.find_by_id(id).await? else {
            return Ok(None);
        };
        let content = self
            .provider
            .read_bytes(&Self::content_path(id))
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    AppError::storage(format!("Content for blob {id} is missing"))
                } else {
                    e
                }
            })?;
        Ok(Some(StoredBlob { meta, content }))
    }

    /// Content goes first: if it cannot be removed the metadata row stays,
    /// so the blob remains listed and a later pass retries it.
    async fn delete(&self, id: BlobId) -> AppResult<bool> {
        self.provider.delete(&Self::content_path(id)).await?;
        let existed = self.repo.delete(id).await?;
        if existed {
            debug!(blob_id = %id, "Deleted blob");
        }
        Ok(existed)
    }

    async fn enumerate(&self) -> AppResult<Vec<BlobMeta>> {
        self.repo.find_all().await
    }
}
