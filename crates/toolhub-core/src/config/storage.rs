//! Temporary blob storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage configuration for uploaded and generated temporary files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all runtime data.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Root of the local provider holding blob contents.
    #[serde(default = "default_blob_root")]
    pub blob_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            blob_root: default_blob_root(),
        }
    }
}

impl StorageConfig {
    /// Scratch directory handlers use for intermediate files.
    pub fn temp_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_root).join("temp")
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_blob_root() -> String {
    "./data/storage".to_string()
}
