//! Configuration management for wtypes
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (wtypes.toml)
//! - Environment variables (WTYPES__*)
//!
//! ## Example config file (wtypes.toml):
//! ```toml
//! [validation]
//! meta_validate = true
//! cache_compiled = true
//! cache_limit = 1024
//!
//! [logging]
//! filter = "wtypes=debug"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WtypesConfig {
    /// Validation backend settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Logging settings for the CLI
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for [`crate::backend::JsonSchemaBackend`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Check every new type against the Draft 7 meta-schema
    #[serde(default = "default_true")]
    pub meta_validate: bool,

    /// Keep compiled validators keyed by schema checksum
    #[serde(default = "default_true")]
    pub cache_compiled: bool,

    /// Most compiled validators kept; the cache is emptied when it is full
    #[serde(default = "default_cache_limit")]
    pub cache_limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_true() -> bool {
    true
}

fn default_cache_limit() -> usize {
    1024
}

fn default_filter() -> String {
    "wtypes=info".to_string()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            meta_validate: true,
            cache_compiled: true,
            cache_limit: default_cache_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl WtypesConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the default locations
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in ["wtypes.toml", ".wtypes.toml", "config/wtypes.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "wtypes", "wtypes") {
            let xdg_config = config_dir.config_dir().join("wtypes.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("WTYPES")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
