//! Application state shared across all handlers.

use std::sync::Arc;

use toolhub_core::config::AppConfig;
use toolhub_storage::BlobStore;
use toolhub_worker::{CleanupEngine, Dispatcher};

/// Application state passed to every Axum handler via `State<AppState>`.
///
/// All fields are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Temporary blob store receiving uploads
    pub blobs: Arc<dyn BlobStore>,
    /// Job creation, dispatch, and status
    pub dispatcher: Dispatcher,
    /// Temporary file cleanup
    pub cleanup: Arc<CleanupEngine>,
}

impl AppState {
    /// Assemble the state from its parts.
    pub fn new(
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        dispatcher: Dispatcher,
        cleanup: Arc<CleanupEngine>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            blobs,
            dispatcher,
            cleanup,
        }
    }
}
