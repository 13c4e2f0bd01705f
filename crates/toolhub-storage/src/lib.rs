//! # toolhub-storage
//!
//! The temporary blob store: a [`BlobStore`] trait, the production
//! [`TmpFileStore`] (metadata in PostgreSQL, content on a storage
//! provider), and an in-memory [`MemoryBlobStore`].

pub mod blob;
pub mod memory;
pub mod providers;
pub mod tmp_store;

pub use blob::BlobStore;
pub use memory::MemoryBlobStore;
pub use providers::LocalStorageProvider;
pub use tmp_store::TmpFileStore;
