//! cwalk Configuration
//!
//! Evaluator settings for the cwalk runtime, read from `cwalk.toml`.
//!
//! # Configuration Hierarchy
//!
//! Later sources override earlier ones:
//! 1. Built-in defaults ([`EvaluatorConfig::default`])
//! 2. Project config (`./cwalk.toml`, found by walking up from a directory)
//! 3. Environment variables (`CWALK_*`)
//!
//! # Example
//!
//! ```no_run
//! use cwalk_config::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! println!("max call depth: {}", config.evaluator.max_call_depth);
//! ```

pub mod evaluator;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use evaluator::{EvaluatorConfig, EvaluatorSection, ProjectConfig, Strategy};
pub use loader::{Config, ConfigLoader, CONFIG_FILE_NAME};
