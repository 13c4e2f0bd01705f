//! Blob store abstraction.

use async_trait::async_trait;

use toolhub_core::result::AppResult;
use toolhub_core::types::id::BlobId;
use toolhub_entity::blob::{BlobMeta, NewBlob, StoredBlob};

/// Storage for uploaded inputs and generated outputs.
///
/// Blobs are immutable once stored. Backend failures surface as
/// `ErrorKind::Storage` or `ErrorKind::Database` errors; a missing blob is
/// never an error.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Store content with its metadata and return the new ID.
    async fn store(&self, blob: NewBlob) -> AppResult<BlobId>;

    /// Fetch a blob, or `None` if it does not exist.
    async fn fetch(&self, id: BlobId) -> AppResult<Option<StoredBlob>>;

    /// Delete a blob. Returns `false` if it did not exist.
    async fn delete(&self, id: BlobId) -> AppResult<bool>;

    /// List metadata for every stored blob.
    async fn enumerate(&self) -> AppResult<Vec<BlobMeta>>;
}
