//! # toolhub-api
//!
//! HTTP API layer for Toolhub built on Axum.
//!
//! Provides the upload-and-dispatch endpoint for tools, command status
//! polling, cleanup administration, the caller identity extractor, and
//! error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::AppState;
