// src/config/constants.rs
//! Experiment-wide configuration constants

/// Configuration document versioning
pub mod schema {
    /// Version written by this crate and expected after migration.
    pub const CURRENT_VERSION: i64 = 2;
    /// Documents without a `schema_version` key are treated as this version.
    pub const LEGACY_VERSION: i64 = 1;
}

/// Identifiers used when no configuration file overrides them
pub mod identifiers {
    pub const DEFAULT_PROJECT_ID: &str = "nd012";
    pub const DEFAULT_EXPERIMENT_ID: &str = "exp1";
    pub const DEFAULT_TASK: &str = "1back";
}

/// Preprocessing defaults
pub mod preprocess {
    pub const DEFAULT_REFERENCE_CHAN: &str = "FCz";
    pub const DEFAULT_PHOTOSENSOR_CHAN: &str = "Photosensor";
    pub const DEFAULT_RESAMPLE_HZ: u32 = 250;
    pub const DEFAULT_L_FREQ_HZ: f64 = 0.1;
    pub const DEFAULT_TMIN_S: f64 = -1.0;
    pub const DEFAULT_TMAX_S: f64 = 1.0;
    pub const DEFAULT_BASELINE_S: (f64, f64) = (-0.2, 0.0);
    pub const DEFAULT_BAD_CHAN_THRESH: f64 = 3.0;
    pub const DEFAULT_EXT_VOLTAGE_V: f64 = 150e-6;
    pub const DEFAULT_BLINK_THRESH_V: f64 = 150e-6;

    pub const MIN_RESAMPLE_HZ: i64 = 1;
    pub const MAX_RESAMPLE_HZ: i64 = 100_000;
    pub const MAX_CUTOFF_HZ: f64 = 50_000.0;
    /// Sentinel accepted in place of a cutoff frequency to disable that edge.
    pub const CUTOFF_DISABLED: &str = "none";
    /// Options holding a filter edge
    pub const CUTOFF_FIELDS: &[&str] = &["l_freq", "h_freq"];
}

/// RANSAC bad-channel detection defaults
pub mod ransac {
    pub const DEFAULT_N_RESAMPLE: u32 = 50;
    pub const DEFAULT_MIN_CHANNELS: f64 = 0.25;
    pub const DEFAULT_MIN_CORR: f64 = 0.75;
    pub const DEFAULT_UNBROKEN_TIME: f64 = 0.4;
    pub const DEFAULT_N_JOBS: u32 = 1;
    pub const MAX_N_RESAMPLE: i64 = 10_000;
}

/// Electrode montage
pub mod montage {
    pub const DEFAULT_MONTAGE_FILE: &str = "old_64ch.bvef";
    /// Head radius in metres used to scale unit-sphere positions.
    pub const DEFAULT_HEAD_SIZE_M: f64 = 0.08;
    pub const MAX_HEAD_SIZE_M: f64 = 0.5;
    /// BVEF radius marking an idealized unit sphere when every electrode carries it.
    pub const UNIT_SPHERE_RADIUS: f64 = 1.0;
    pub const RADIUS_TOLERANCE: f64 = 1e-6;
    pub const MILLIMETRES_PER_METRE: f64 = 1000.0;
}

/// Directory layout
pub mod layout {
    pub const DEFAULT_DATA_DIR: &str = "data";
    pub const SOURCE_DIR: &str = "sourcedata";
    pub const BIDS_DIR: &str = "bids";
    pub const DERIVATIVES_DIR: &str = "derivatives";
    pub const REPORTS_DIR: &str = "reports";
    pub const ANALYSES_DIR: &str = "analyses";
    pub const TASK_PREFIX: &str = "task-";
    pub const SUBJECT_PREFIX: &str = "sub-";

    pub const MACOS_SERVER_DIR: &str = "/Volumes/koendata/EXPT";
    pub const LINUX_SERVER_DIR: &str = "/koenlab/koendata/EXPT";
    pub const WINDOWS_SERVER_DIR: &str = r"X:\EXPT";
    /// Leaf under `server/project/experiment` holding the data tree.
    pub const SERVER_DATA_LEAF: &str = "data";
}

/// Configuration file locations
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/eeg-config/experiment.toml";
    pub const USER_CONFIG_DIR: &str = ".eeg-config";
    pub const USER_CONFIG_FILE: &str = "experiment.toml";
    pub const DEFAULT_CONFIG_FILE: &str = "config/experiment.toml";
    pub const LOCAL_CONFIG_FILE: &str = "experiment.toml";
    pub const LOCAL_OVERRIDE_FILE: &str = "config/local.toml";
}

/// Environment overrides
pub mod env {
    /// Variables named `EEG_<SECTION>__<KEY>` override configuration values.
    pub const PREFIX: &str = "EEG_";
    pub const PATH_SEPARATOR: &str = "__";
    /// Top-level tables an override may target; other `EEG_*` variables are ignored.
    pub const SECTIONS: &[&str] = &[
        "experiment",
        "subjects",
        "behavior",
        "preprocess",
        "artifact_rejection",
        "montage",
        "events",
        "erp",
        "paths",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_inside_epoch() {
        let (start, end) = preprocess::DEFAULT_BASELINE_S;
        assert!(start >= preprocess::DEFAULT_TMIN_S);
        assert!(end <= preprocess::DEFAULT_TMAX_S);
        assert!(start <= end);
    }

    #[test]
    fn test_schema_versions_ordered() {
        assert!(schema::LEGACY_VERSION < schema::CURRENT_VERSION);
    }
}
