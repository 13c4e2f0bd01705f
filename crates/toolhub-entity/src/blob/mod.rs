//! Temporary blob domain entities.

pub mod model;

pub use model::{BlobMeta, NewBlob, StoredBlob, bytes_to_mb};
