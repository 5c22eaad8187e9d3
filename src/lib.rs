//! EEG-Config: experiment configuration for the 1-back EEG analysis pipeline
//!
//! This library holds everything the preprocessing and analysis stages need to
//! agree on before touching a recording:
//!
//! - Experiment identifiers, bad subjects and per-subject bad channels
//! - Behavioral column schema, preprocessing options and RANSAC parameters
//! - Electrode montage loaded from a BrainVision BVEF file
//! - Event marker taxonomy, ERP queries and contrasts
//! - BIDS-style directory layout with platform-specific server roots
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use eeg_config::ConfigLoader;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load()?;
//!     let layout = config.ensure_layout()?;
//!
//!     println!("BIDS root: {}", layout.bids_dir().display());
//!     println!("Resample to {} Hz", config.preprocess().resample);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod layout;
pub mod montage;

// Re-export commonly used types for convenience
pub use config::{
    ConfigLoader, ConfigSummary, Cutoff, EventTaxonomy, ExperimentConfig, ExperimentSettings,
    PreprocessOptions, ValidationError,
};
pub use error::{ConfigError, Error, PathError, Result};
pub use layout::{DirectoryLayout, Platform};
pub use montage::{Electrode, Montage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Experiment configuration for EEG preprocessing and ERP analysis".to_string(),
        schema_version: config::schema::CURRENT_VERSION,
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Configuration document version this build writes
    pub schema_version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert_eq!(info.schema_version, 2);
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
    }
}
