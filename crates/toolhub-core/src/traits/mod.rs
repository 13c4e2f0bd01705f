//! Core traits defined in `toolhub-core` and implemented by other crates.

pub mod storage;

pub use storage::StorageProvider;
