// src/config/mod.rs
//! Experiment configuration: the stored document and its validated form

pub mod constants;
pub mod schema_validator;
pub mod loader;
pub mod experiment;
pub mod preprocess;
pub mod artifact;
pub mod events;
pub mod behavior;
pub mod subjects;
pub mod erp;

pub use constants::*;
pub use schema_validator::{SchemaValidator, ValidationError};
pub use loader::ConfigLoader;
pub use experiment::{ConfigSummary, ExperimentConfig};
pub use preprocess::{Cutoff, OptionValue, PreprocessOptions, RECOGNIZED_OPTIONS};
pub use artifact::{ArtifactRejection, RejectionMethod};
pub use events::EventTaxonomy;
pub use behavior::BehaviorSchema;
pub use subjects::{BadChannel, SubjectExclusions};
pub use erp::{ContrastTerm, ErpDefinitions};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layout::Platform;

/// Complete experiment configuration as stored on disk
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExperimentSettings {
    #[serde(default = "defaults::schema_version")]
    pub schema_version: i64,

    pub experiment: ExperimentIds,

    #[serde(default)]
    pub subjects: SubjectExclusions,

    pub behavior: BehaviorSchema,

    pub preprocess: PreprocessOptions,

    #[serde(default)]
    pub artifact_rejection: ArtifactRejection,

    #[serde(default)]
    pub montage: MontageSettings,

    pub events: EventTaxonomy,

    #[serde(default)]
    pub erp: ErpDefinitions,

    #[serde(default)]
    pub paths: PathSettings,
}

/// Project, experiment and task identifiers
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExperimentIds {
    pub project_id: String,
    pub experiment_id: String,
    pub task: String,
}

/// Electrode montage source
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MontageSettings {
    /// BVEF file; relative paths resolve against the configuration file's directory
    #[serde(default = "defaults::montage_file")]
    pub file: PathBuf,

    /// Head radius in metres
    #[serde(default = "defaults::head_size")]
    pub head_size: f64,
}

/// Data directory selection
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PathSettings {
    /// Explicit data directory; wins over the server convention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Server mount replacing the platform default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_dir: Option<PathBuf>,
}

/// Default value providers using constants
mod defaults {
    use std::path::PathBuf;
    use crate::config::constants::*;

    pub fn schema_version() -> i64 { schema::CURRENT_VERSION }
    pub fn montage_file() -> PathBuf { PathBuf::from(montage::DEFAULT_MONTAGE_FILE) }
    pub fn head_size() -> f64 { montage::DEFAULT_HEAD_SIZE_M }
}

impl Default for ExperimentIds {
    fn default() -> Self {
        Self {
            project_id: identifiers::DEFAULT_PROJECT_ID.to_string(),
            experiment_id: identifiers::DEFAULT_EXPERIMENT_ID.to_string(),
            task: identifiers::DEFAULT_TASK.to_string(),
        }
    }
}

impl Default for MontageSettings {
    fn default() -> Self {
        Self {
            file: defaults::montage_file(),
            head_size: defaults::head_size(),
        }
    }
}

impl PathSettings {
    /// Root data directory for this experiment.
    ///
    /// Relative directories are anchored at `base_dir` when one is given.
    pub fn data_dir(&self, platform: Platform, ids: &ExperimentIds, base_dir: Option<&Path>) -> PathBuf {
        let dir = match (&self.data_dir, &self.server_dir) {
            (Some(data_dir), _) => data_dir.clone(),
            (None, Some(server)) => server
                .join(&ids.project_id)
                .join(&ids.experiment_id)
                .join(layout::SERVER_DATA_LEAF),
            (None, None) => platform.data_dir(&ids.project_id, &ids.experiment_id),
        };
        anchor(dir, base_dir)
    }
}

pub(crate) fn anchor(path: PathBuf, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

impl Default for ExperimentSettings {
    /// The 1-back task template with data under `./data`.
    fn default() -> Self {
        Self {
            schema_version: defaults::schema_version(),
            experiment: ExperimentIds::default(),
            subjects: SubjectExclusions::template(),
            behavior: BehaviorSchema::default(),
            preprocess: PreprocessOptions::default(),
            artifact_rejection: ArtifactRejection::default(),
            montage: MontageSettings::default(),
            events: EventTaxonomy::default(),
            erp: ErpDefinitions::template(),
            paths: PathSettings {
                data_dir: Some(PathBuf::from(layout::DEFAULT_DATA_DIR)),
                server_dir: None,
            },
        }
    }
}

impl ExperimentSettings {
    /// Run field constraints, then every cross-field and cross-table check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != schema::CURRENT_VERSION {
            return Err(ConfigError::UnsupportedSchemaVersion {
                found: self.schema_version,
                supported: schema::CURRENT_VERSION,
            });
        }

        let value = toml::Value::try_from(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut errors = SchemaValidator::new()
            .validate_config(&value)
            .err()
            .unwrap_or_default();

        if let Err(mut more) = self.preprocess.validate() {
            errors.append(&mut more);
        }
        if let Err(mut more) = self.artifact_rejection.validate() {
            errors.append(&mut more);
        }
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        self.subjects.validate()?;
        self.behavior.validate()?;
        self.events.validate()?;
        self.erp.validate()?;
        Ok(())
    }

    /// Pretty TOML rendering of the document
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write the document as TOML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
