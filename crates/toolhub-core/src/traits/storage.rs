//! Storage provider trait for the byte layer under the blob store.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for byte storage backends addressed by relative path.
///
/// The blob store keeps metadata elsewhere and uses a provider only for
/// content, so the surface is limited to whole-object reads and writes.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read a file into memory as a complete byte buffer.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to a file at the given path, creating parents.
    async fn write(&self, path: &str, data: Bytes) -> AppResult<()>;

    /// Delete a file. Deleting a missing file is not an error.
    async fn delete(&self, path: &str) -> AppResult<()>;
}
