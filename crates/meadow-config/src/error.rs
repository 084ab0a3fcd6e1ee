//! Error types for configuration loading.

use thiserror::Error;

/// Errors returned by the config loader.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error while reading a config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file failed to parse.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A config value failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}
