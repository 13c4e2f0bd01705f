//! # toolhub-database
//!
//! PostgreSQL connection management, the [`JobStore`] abstraction with its
//! PostgreSQL and in-memory implementations, and the temporary blob
//! metadata repository.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryJobStore;
pub use store::JobStore;
