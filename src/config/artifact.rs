// src/config/artifact.rs
//! Artifact-rejection parameters handed to the bad-channel detector

use serde::{Deserialize, Serialize};

use crate::config::schema_validator::ValidationError;

/// Bad-channel detection method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionMethod {
    /// Random-sample consensus over interpolated channel predictions
    Ransac,
    /// Skip automatic detection; only listed bad channels are excluded
    None,
}

/// RANSAC configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactRejection {
    #[serde(default = "defaults::method")]
    pub method: RejectionMethod,

    /// Number of random channel subsets drawn per window
    #[serde(default = "defaults::n_resample")]
    pub n_resample: u32,

    /// Fraction of channels used to predict each channel
    #[serde(default = "defaults::min_channels")]
    pub min_channels: f64,

    /// Correlation below which a prediction counts as failed
    #[serde(default = "defaults::min_corr")]
    pub min_corr: f64,

    /// Fraction of windows a channel may fail before it is marked bad
    #[serde(default = "defaults::unbroken_time")]
    pub unbroken_time: f64,

    /// Worker count for the detector, `-1` for all cores
    #[serde(default = "defaults::n_jobs")]
    pub n_jobs: i32,

    /// Seed for reproducible subset sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
}

mod defaults {
    use super::RejectionMethod;
    use crate::config::constants::ransac::*;

    pub fn method() -> RejectionMethod { RejectionMethod::Ransac }
    pub fn n_resample() -> u32 { DEFAULT_N_RESAMPLE }
    pub fn min_channels() -> f64 { DEFAULT_MIN_CHANNELS }
    pub fn min_corr() -> f64 { DEFAULT_MIN_CORR }
    pub fn unbroken_time() -> f64 { DEFAULT_UNBROKEN_TIME }
    pub fn n_jobs() -> i32 { DEFAULT_N_JOBS as i32 }
}

impl Default for ArtifactRejection {
    fn default() -> Self {
        Self {
            method: defaults::method(),
            n_resample: defaults::n_resample(),
            min_channels: defaults::min_channels(),
            min_corr: defaults::min_corr(),
            unbroken_time: defaults::unbroken_time(),
            n_jobs: defaults::n_jobs(),
            random_state: None,
        }
    }
}

impl ArtifactRejection {
    /// Whether automatic detection runs at all
    pub fn is_enabled(&self) -> bool {
        self.method != RejectionMethod::None
    }

    /// Fractions must lie in `(0, 1]` and the worker count must not be zero.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("min_channels", self.min_channels),
            ("min_corr", self.min_corr),
            ("unbroken_time", self.unbroken_time),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                errors.push(ValidationError {
                    field: format!("artifact_rejection.{}", field),
                    message: "Fraction must be in (0, 1]".to_string(),
                    value: value.to_string(),
                });
            }
        }

        if self.n_resample == 0 {
            errors.push(ValidationError {
                field: "artifact_rejection.n_resample".to_string(),
                message: "At least one resample is required".to_string(),
                value: "0".to_string(),
            });
        }

        if self.n_jobs == 0 || self.n_jobs < -1 {
            errors.push(ValidationError {
                field: "artifact_rejection.n_jobs".to_string(),
                message: "Worker count must be positive or -1".to_string(),
                value: self.n_jobs.to_string(),
            });
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_ransac() {
        let params = ArtifactRejection::default();
        assert!(params.validate().is_ok());
        assert!(params.is_enabled());
        assert_eq!(params.n_resample, 50);
    }

    #[test]
    fn test_partial_table_fills_defaults() {
        let params: ArtifactRejection = toml::from_str("min_corr = 0.8\nrandom_state = 42").unwrap();
        assert_eq!(params.min_corr, 0.8);
        assert_eq!(params.random_state, Some(42));
        assert_eq!(params.method, RejectionMethod::Ransac);
        assert_eq!(params.unbroken_time, 0.4);
    }

    #[test]
    fn test_method_none_disables() {
        let params: ArtifactRejection = toml::from_str("method = \"none\"").unwrap();
        assert!(!params.is_enabled());
    }

    #[test]
    fn test_method_names_are_case_sensitive() {
        assert!(toml::from_str::<ArtifactRejection>("method = \"RANSAC\"").is_err());
        assert!(toml::from_str::<ArtifactRejection>("method = \"ransac\"").is_ok());
    }

    #[test]
    fn test_invalid_fractions() {
        let params = ArtifactRejection {
            min_corr: 1.5,
            unbroken_time: 0.0,
            n_jobs: 0,
            ..ArtifactRejection::default()
        };
        let errors = params.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
