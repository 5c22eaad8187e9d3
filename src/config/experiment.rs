// src/config/experiment.rs
//! Validated, read-only experiment configuration shared by every pipeline stage

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{
    anchor, ArtifactRejection, BadChannel, BehaviorSchema, ErpDefinitions, EventTaxonomy,
    ExperimentSettings, PreprocessOptions, SubjectExclusions,
};
use crate::error::{ConfigError, PathError};
use crate::layout::{DirectoryLayout, Platform};
use crate::montage::Montage;

/// Configuration after validation, montage loading and path resolution.
///
/// Built once at startup and handed to consumers by reference. Nothing in it
/// changes after construction; the only side-effecting operation is
/// [`ExperimentConfig::ensure_layout`], which callers invoke explicitly.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    settings: ExperimentSettings,
    montage: Montage,
    layout: DirectoryLayout,
    platform: Platform,
    base_dir: Option<PathBuf>,
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub project_id: String,
    pub experiment_id: String,
    pub task: String,
    pub schema_version: i64,
    pub data_dir: PathBuf,
    pub montage_channels: usize,
    pub resample_hz: u32,
    pub event_codes: usize,
    pub bad_subjects: usize,
    pub artifact_rejection: bool,
}

impl ExperimentConfig {
    /// Validate `settings`, load the montage and resolve the directory layout.
    ///
    /// Relative montage and data paths are anchored at `base_dir`, normally the
    /// directory of the configuration file. Creates no directories.
    pub fn from_settings(
        settings: ExperimentSettings,
        platform: Platform,
        base_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let montage_path = anchor(settings.montage.file.clone(), base_dir);
        let montage = Montage::from_bvef(&montage_path, settings.montage.head_size)?;

        let data_dir = settings
            .paths
            .data_dir(platform, &settings.experiment, base_dir);
        let layout = DirectoryLayout::resolve(data_dir, &settings.experiment.task);

        let config = Self {
            settings,
            montage,
            layout,
            platform,
            base_dir: base_dir.map(Path::to_path_buf),
        };
        config.warn_unplaced_channels();

        info!(
            project = %config.settings.experiment.project_id,
            experiment = %config.settings.experiment.experiment_id,
            task = %config.settings.experiment.task,
            channels = config.montage.len(),
            data_dir = %config.layout.data_dir().display(),
            "experiment configuration loaded"
        );
        Ok(config)
    }

    /// Create the output directories of the layout if they are missing.
    pub fn ensure_layout(&self) -> Result<&DirectoryLayout, PathError> {
        self.layout.ensure()?;
        Ok(&self.layout)
    }

    pub fn settings(&self) -> &ExperimentSettings {
        &self.settings
    }

    pub fn project_id(&self) -> &str {
        &self.settings.experiment.project_id
    }

    pub fn experiment_id(&self) -> &str {
        &self.settings.experiment.experiment_id
    }

    pub fn task(&self) -> &str {
        &self.settings.experiment.task
    }

    pub fn subjects(&self) -> &SubjectExclusions {
        &self.settings.subjects
    }

    pub fn behavior(&self) -> &BehaviorSchema {
        &self.settings.behavior
    }

    pub fn preprocess(&self) -> &PreprocessOptions {
        &self.settings.preprocess
    }

    pub fn artifact_rejection(&self) -> &ArtifactRejection {
        &self.settings.artifact_rejection
    }

    pub fn events(&self) -> &EventTaxonomy {
        &self.settings.events
    }

    pub fn erp(&self) -> &ErpDefinitions {
        &self.settings.erp
    }

    pub fn montage(&self) -> &Montage {
        &self.montage
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Directory relative paths were resolved against
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn is_bad_subject(&self, subject: &str) -> bool {
        self.settings.subjects.is_bad_subject(subject)
    }

    pub fn bad_channels_for(&self, subject: &str) -> &[BadChannel] {
        self.settings.subjects.bad_channels_for(subject)
    }

    /// Event code for a raw recorder marker
    pub fn code_for_marker(&self, marker: &str) -> Option<i32> {
        self.settings.events.code_for_marker(marker)
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            project_id: self.project_id().to_string(),
            experiment_id: self.experiment_id().to_string(),
            task: self.task().to_string(),
            schema_version: self.settings.schema_version,
            data_dir: self.layout.data_dir().to_path_buf(),
            montage_channels: self.montage.len(),
            resample_hz: self.settings.preprocess.resample,
            event_codes: self.settings.events.event_id.len(),
            bad_subjects: self.settings.subjects.bad_subjects.len(),
            artifact_rejection: self.settings.artifact_rejection.is_enabled(),
        }
    }

    // Bad channels and the reference usually sit in the montage; the
    // photosensor never does, so it is not checked.
    fn warn_unplaced_channels(&self) {
        let reference = &self.settings.preprocess.reference_chan;
        if !self.montage.contains(reference) {
            warn!(channel = %reference, "reference channel has no montage position");
        }

        for (subject, channels) in &self.settings.subjects.bad_channels {
            for bad in channels {
                if !self.montage.contains(&bad.channel) {
                    warn!(subject = %subject, channel = %bad.channel, "bad channel has no montage position");
                }
            }
        }
    }
}
