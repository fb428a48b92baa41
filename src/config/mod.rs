//! Configuration management
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use weepstay::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! `WEEPSTAY__<section>__<key>`, for example:
//! - `WEEPSTAY__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `WEEPSTAY__PAGINATION__PAGE_SIZE=25`
//! - `WEEPSTAY__APPS__CUSTOM_APPS=core_utils,user_config.user_auth`
//!
//! # Configuration File
//!
//! By default the configuration is loaded from `config/weepstay.toml`.
//! This can be overridden using the `WEEPSTAY_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    AppsConfig, Config, LogFormat, PaginationConfig, ServerConfig, TelemetryConfig, ViewsConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[pagination]\npage_size = 25\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.pagination.page_size, 25);
        assert_eq!(config.views.exception_message, "Internal Server Error");
    }

    #[test]
    fn test_validation_catches_bad_page_size() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[pagination]\npage_size = 0\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InvalidPageSize { .. })
        ));
    }

    #[test]
    fn test_unknown_lookup_scope_fails_to_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[views]\nuser_lookup = \"COOKIES\"\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result.unwrap_err(), ConfigError::LoadError(_)));
    }

    #[test]
    fn test_full_config_example() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "0.0.0.0:8080"
data_path = "data/test"
max_payload_bytes = 2097152

[apps]
custom_apps = ["core_utils.region_data"]
migrations_root = "backend"

[views]
ordering_param_name = "sort"
default_ordering_field = "name"
exception_message = "Something went wrong"
user_lookup = "KWARGS"

[pagination]
page_size = 20
max_page_size = 50

[telemetry]
log_format = "json"
log_filter = "weepstay=debug"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();

        assert_eq!(config.server.data_path.to_str(), Some("data/test"));
        assert_eq!(config.apps.migrations_root.to_str(), Some("backend"));
        assert_eq!(config.views.ordering_param_name, "sort");
        assert_eq!(config.views.exception_message, "Something went wrong");
        assert_eq!(config.pagination.max_page_size, 50);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        // success messages fall back to defaults when not configured
        assert_eq!(config.views.success_message("PUT"), Some("Successfully Updated"));
    }
}
