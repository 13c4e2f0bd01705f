//! PostgreSQL repository implementations.

pub mod blob;
pub mod job;

pub use blob::BlobRepository;
pub use job::JobRepository;
