//! Application configuration schemas.
//!
//! All configuration structs are deserialized from a TOML file via the
//! `config` crate, overlaid with `TOOLHUB__SECTION__KEY` environment
//! variables. Every field carries a serde default so a missing file still
//! yields a usable development configuration.

pub mod cleanup;
pub mod commands;
pub mod database;
pub mod dispatch;
pub mod logging;
pub mod server;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::cleanup::CleanupConfig;
pub use self::commands::{CommandsConfig, MergePdfsConfig};
pub use self::database::DatabaseConfig;
pub use self::dispatch::DispatchConfig;
pub use self::logging::LoggingConfig;
pub use self::server::ServerConfig;
pub use self::storage::StorageConfig;

use crate::error::AppError;

/// Environment variable holding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "TOOLHUB_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Temporary blob storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Executor subprocess settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Temporary file cleanup settings.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Per-command handler settings.
    #[serde(default)]
    pub commands: CommandsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file plus environment overrides.
    ///
    /// The file is optional; environment variables prefixed with
    /// `TOOLHUB__` (sections separated by `__`) take precedence.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("TOOLHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.cleanup.validate()?;
        Ok(config)
    }

    /// Load from the path named by `TOOLHUB_CONFIG`, or the default path.
    pub fn load_from_env() -> Result<Self, AppError> {
        let path = config_path_from_env();
        Self::load(&path)
    }
}

/// Resolve the configuration file path from the environment.
pub fn config_path_from_env() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.dispatch.timeout_seconds, 600);
        assert_eq!(config.cleanup.max_age_hours, 24);
        assert_eq!(config.commands.merge_pdfs.program, "qpdf");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("toolhub-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[dispatch]\nexecutor_path = \"/opt/toolhub/bin/toolhub-exec\"\ntimeout_seconds = 30\n\n[cleanup]\nenabled = false"
        )
        .unwrap();

        let config = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.dispatch.executor_path, "/opt/toolhub/bin/toolhub-exec");
        assert_eq!(config.dispatch.timeout_seconds, 30);
        assert!(!config.cleanup.enabled);
        assert_eq!(config.cleanup.schedule, "0 0 * * * *");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_zero_cleanup_age_fails_to_load() {
        let dir = std::env::temp_dir().join(format!("toolhub-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wipe.toml");
        std::fs::write(&path, "[cleanup]\nmax_age_hours = 0\n").unwrap();

        let err = AppConfig::load(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
