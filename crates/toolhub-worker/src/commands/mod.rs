//! Built-in command handlers.

pub mod merge_pdfs;

use std::path::Path;
use std::sync::Arc;

use toolhub_core::config::CommandsConfig;

use crate::executor::HandlerRegistry;

pub use merge_pdfs::MergePdfsHandler;

/// Registry with every built-in command.
pub fn builtin_registry(config: &CommandsConfig, temp_root: &Path) -> HandlerRegistry {
    HandlerRegistry::new().with(Arc::new(MergePdfsHandler::new(
        config.merge_pdfs.clone(),
        temp_root.to_path_buf(),
    )))
}
