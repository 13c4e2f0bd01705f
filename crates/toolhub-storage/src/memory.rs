//! In-memory blob store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use toolhub_core::result::AppResult;
use toolhub_core::types::id::BlobId;
use toolhub_entity::blob::{BlobMeta, NewBlob, StoredBlob};

use crate::blob::BlobStore;

/// A [`BlobStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<BlobId, StoredBlob>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob with an explicit upload date.
    pub fn store_at(&self, blob: NewBlob, upload_date: DateTime<Utc>) -> BlobId {
        let id = BlobId::new();
        let (meta, content) = blob.into_parts(id, upload_date);
        self.blobs.insert(id, StoredBlob { meta, content });
        id
    }

    /// Whether a blob exists.
    pub fn contains(&self, id: BlobId) -> bool {
        self.blobs.contains_key(&id)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, blob: NewBlob) -> AppResult<BlobId> {
        Ok(self.store_at(blob, Utc::now()))
    }

    async fn fetch(&self, id: BlobId) -> AppResult<Option<StoredBlob>> {
        Ok(self.blobs.get(&id).map(|r| r.value().clone()))
    }

    async fn delete(&self, id: BlobId) -> AppResult<bool> {
        Ok(self.blobs.remove(&id).is_some())
    }

    async fn enumerate(&self) -> AppResult<Vec<BlobMeta>> {
        let mut metas: Vec<BlobMeta> = self.blobs.iter().map(|r| r.value().meta.clone()).collect();
        metas.sort_by(|a, b| a.upload_date.cmp(&b.upload_date));
        Ok(metas)
    }
}
