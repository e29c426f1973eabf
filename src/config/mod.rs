//! Configuration management for vidgrab
//!
//! A layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use vidgrab::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the
//! pattern `VIDGRAB__<section>__<key>`:
//!
//! - `VIDGRAB__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `VIDGRAB__DOWNLOAD__MAX_FILE_BYTES=1GB`
//! - `VIDGRAB__AUTH__TOKEN_TTL_SECS=3600`
//!
//! The signing secret is special-cased: it is read only from `JWT_SECRET`
//! and never from a config file.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/vidgrab.toml`.
//! This can be overridden using the `VIDGRAB_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use crate::humanize::ByteSize;
pub use models::{AuthConfig, Config, DownloadConfig, RetentionConfig, ServerConfig};
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
    /// Returns an error if the configuration file is malformed or
    /// validation fails (missing secret, zero-size pools, etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files. The secret is
    /// still taken from the environment.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
