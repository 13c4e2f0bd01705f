//! Temporary blob entity models.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use toolhub_core::types::id::BlobId;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Metadata describing a stored temporary blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BlobMeta {
    /// Unique blob identifier.
    pub id: BlobId,
    /// Original filename.
    pub filename: String,
    /// MIME type, when known.
    pub content_type: Option<String>,
    /// Size of the content in bytes.
    pub size_bytes: i64,
    /// When the blob was stored.
    pub upload_date: DateTime<Utc>,
    /// Free-form metadata (owner, purpose, source job).
    #[sqlx(json)]
    pub metadata: Map<String, Value>,
}

impl BlobMeta {
    /// Age of the blob at `now`. Negative when the upload date lies in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.upload_date
    }
}

/// Convert a byte count to megabytes rounded to two decimals.
pub fn bytes_to_mb(bytes: i64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Content plus metadata for a blob about to be stored.
#[derive(Debug, Clone)]
pub struct NewBlob {
    pub content: Bytes,
    pub filename: String,
    pub content_type: Option<String>,
    pub metadata: Map<String, Value>,
}

impl NewBlob {
    /// Create a blob with no content type or metadata.
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            content_type: None,
            metadata: Map::new(),
        }
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a metadata entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Size of the content in bytes.
    pub fn size_bytes(&self) -> i64 {
        self.content.len() as i64
    }

    /// Build the metadata record for this blob under the given identity.
    pub fn into_parts(self, id: BlobId, upload_date: DateTime<Utc>) -> (BlobMeta, Bytes) {
        let meta = BlobMeta {
            id,
            size_bytes: self.size_bytes(),
            filename: self.filename,
            content_type: self.content_type,
            upload_date,
            metadata: self.metadata,
        };
        (meta, self.content)
    }
}

/// A fetched blob.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub meta: BlobMeta,
    pub content: Bytes,
}
