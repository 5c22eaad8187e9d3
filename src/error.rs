// src/error.rs
//! Error types for configuration loading and directory layout
//!
//! Two failure domains exist and both are fatal at startup:
//!
//! - [`ConfigError`]: the configuration data is missing, malformed or
//!   internally inconsistent (including an unreadable montage file).
//! - [`PathError`]: a directory of the on-disk layout could not be created.
//!
//! [`Error`] wraps both for callers that drive the whole startup sequence.

use std::path::PathBuf;

use crate::config::schema_validator::ValidationError;

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required file (configuration or montage) does not exist
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The document could not be parsed or deserialized
    #[error("Configuration parse error: {0}")]
    Parse(String),

    /// One or more fields violate the schema
    #[error("Configuration validation errors:{}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    /// A recognized preprocessing option is absent
    #[error("Missing required preprocessing option '{0}'")]
    MissingOption(String),

    /// A preprocessing option name is not part of the schema
    #[error("Unrecognized preprocessing option '{0}'")]
    UnknownOption(String),

    /// The electrode montage could not be loaded
    #[error("Montage error in {}: {reason}", path.display())]
    Montage {
        /// Montage file being read
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Marker renames and event codes disagree
    #[error("Event taxonomy error: {0}")]
    EventTaxonomy(String),

    /// Cross-table consistency violation outside the event taxonomy
    #[error("Inconsistent configuration in '{table}': {reason}")]
    Inconsistent {
        /// Table holding the offending entry
        table: String,
        /// Description of the violation
        reason: String,
    },

    /// The document declares a schema version this crate cannot read
    #[error("Unsupported schema version {found} (supported up to {supported})")]
    UnsupportedSchemaVersion {
        /// Declared version
        found: i64,
        /// Highest version understood
        supported: i64,
    },

    /// Reading or writing a configuration file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| format!("\n  {}", e)).collect()
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Directory layout errors
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Creating a directory (or one of its parents) failed
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying filesystem error
        #[source]
        source: std::io::Error,
    },

    /// A non-directory file occupies a layout path
    #[error("Layout path {} exists but is not a directory", path.display())]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },
}

impl PathError {
    /// Path the failure refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            PathError::CreateDir { path, .. } | PathError::NotADirectory { path } => path,
        }
    }
}

/// Any startup failure
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration data problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Directory layout problem
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Result alias for fallible startup operations
pub type Result<T> = std::result::Result<T, Error>;
