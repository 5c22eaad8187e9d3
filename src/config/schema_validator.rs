// src/config/schema_validator.rs
//! Configuration schema validation

use std::collections::HashMap;
use crate::config::constants::*;
use crate::layout::is_valid_task_name;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub value: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error for '{}': {} (value: {})", self.field, self.message, self.value)
    }
}

impl std::error::Error for ValidationError {}

/// Schema validator for configuration
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    constraints: HashMap<String, FieldConstraint>,
}

/// Field validation constraints
#[derive(Debug, Clone)]
pub enum FieldConstraint {
    Range { min: f64, max: f64 },
    IntRange { min: i64, max: i64 },
    /// Numeric range, or one literal keyword standing for "off"
    RangeOrKeyword { min: f64, max: f64, keyword: &'static str },
    OneOf(Vec<String>),
    Required,
    Custom { check: fn(&str) -> bool, message: &'static str },
}

impl SchemaValidator {
    /// Create new schema validator with default constraints
    pub fn new() -> Self {
        let mut constraints = HashMap::new();

        constraints.insert("schema_version".to_string(),
                           FieldConstraint::IntRange {
                               min: schema::LEGACY_VERSION,
                               max: schema::CURRENT_VERSION,
                           });

        // Identifiers
        constraints.insert("experiment.project_id".to_string(), FieldConstraint::Required);
        constraints.insert("experiment.experiment_id".to_string(), FieldConstraint::Required);
        constraints.insert("experiment.task".to_string(),
                           FieldConstraint::Custom {
                               check: is_valid_task_name,
                               message: "Task must be a non-empty name without path separators",
                           });

        // Preprocessing
        constraints.insert("preprocess.reference_chan".to_string(), FieldConstraint::Required);
        constraints.insert("preprocess.photosensor_chan".to_string(), FieldConstraint::Required);

        constraints.insert("preprocess.resample".to_string(),
                           FieldConstraint::IntRange {
                               min: preprocess::MIN_RESAMPLE_HZ,
                               max: preprocess::MAX_RESAMPLE_HZ,
                           });

        for edge in preprocess::CUTOFF_FIELDS {
            constraints.insert(format!("preprocess.{}", edge),
                               FieldConstraint::RangeOrKeyword {
                                   min: 0.0,
                                   max: preprocess::MAX_CUTOFF_HZ,
                                   keyword: preprocess::CUTOFF_DISABLED,
                               });
        }

        for bound in ["tmin", "tmax"] {
            constraints.insert(format!("preprocess.{}", bound),
                               FieldConstraint::Range { min: -60.0, max: 60.0 });
        }

        constraints.insert("preprocess.bad_chan_thresh".to_string(),
                           FieldConstraint::Range { min: 0.0, max: 100.0 });

        for threshold in ["ext_voltage", "blink_thresh"] {
            constraints.insert(format!("preprocess.{}", threshold),
                               FieldConstraint::Range { min: 0.0, max: 1e-2 });
        }

        // Artifact rejection
        constraints.insert("artifact_rejection.method".to_string(),
                           FieldConstraint::OneOf(vec![
                               "ransac".to_string(),
                               "none".to_string(),
                           ]));

        constraints.insert("artifact_rejection.n_resample".to_string(),
                           FieldConstraint::IntRange { min: 1, max: ransac::MAX_N_RESAMPLE });

        for fraction in ["min_channels", "min_corr", "unbroken_time"] {
            constraints.insert(format!("artifact_rejection.{}", fraction),
                               FieldConstraint::Range { min: 0.0, max: 1.0 });
        }

        constraints.insert("artifact_rejection.n_jobs".to_string(),
                           FieldConstraint::IntRange { min: -1, max: 1024 });

        // Montage
        constraints.insert("montage.file".to_string(), FieldConstraint::Required);
        constraints.insert("montage.head_size".to_string(),
                           FieldConstraint::Range { min: 0.0, max: montage::MAX_HEAD_SIZE_M });

        Self { constraints }
    }

    /// Validate configuration value against schema
    pub fn validate_field(&self, field_path: &str, value: &toml::Value) -> Result<(), ValidationError> {
        if let Some(constraint) = self.constraints.get(field_path) {
            self.check_constraint(field_path, value, constraint)
        } else {
            Ok(())
        }
    }

    /// Validate entire configuration
    pub fn validate_config(&self, config: &toml::Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        self.validate_recursive("", config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Look up a dotted path such as `experiment.task`
    pub fn get_nested_value<'a>(&self, config: &'a toml::Value, path: &str) -> Option<&'a toml::Value> {
        let mut current = config;

        for part in path.split('.') {
            current = current.as_table()?.get(part)?;
        }

        Some(current)
    }

    fn validate_recursive(&self, prefix: &str, value: &toml::Value, errors: &mut Vec<ValidationError>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };

                    if !val.is_table() {
                        if let Err(err) = self.validate_field(&path, val) {
                            errors.push(err);
                        }
                    }

                    self.validate_recursive(&path, val, errors);
                }
            }
            _ => {}
        }
    }

    fn check_constraint(&self, field: &str, value: &toml::Value, constraint: &FieldConstraint) -> Result<(), ValidationError> {
        let error = |message: String, shown: String| ValidationError {
            field: field.to_string(),
            message,
            value: shown,
        };

        match constraint {
            FieldConstraint::Range { min, max } => {
                if let Some(val) = as_number(value) {
                    if val < *min || val > *max {
                        return Err(error(format!("Value must be between {} and {}", min, max), val.to_string()));
                    }
                }
            }
            FieldConstraint::IntRange { min, max } => {
                if let Some(val) = value.as_integer() {
                    if val < *min || val > *max {
                        return Err(error(format!("Value must be between {} and {}", min, max), val.to_string()));
                    }
                }
            }
            FieldConstraint::RangeOrKeyword { min, max, keyword } => {
                if let Some(val) = as_number(value) {
                    if val < *min || val > *max {
                        return Err(error(format!("Value must be between {} and {}", min, max), val.to_string()));
                    }
                } else if let Some(val) = value.as_str() {
                    if !val.eq_ignore_ascii_case(keyword) {
                        return Err(error(format!("Value must be a number or \"{}\"", keyword), val.to_string()));
                    }
                }
            }
            FieldConstraint::OneOf(options) => {
                if let Some(val) = value.as_str() {
                    // Case-sensitive, matching the serde names of the enum behind the field
                    if !options.iter().any(|opt| opt == val) {
                        return Err(error(
                            format!("Value must be one of: {}", options.join(", ")),
                            val.to_string(),
                        ));
                    }
                }
            }
            FieldConstraint::Required => {
                if value.as_str().map_or(false, |s| s.trim().is_empty()) {
                    return Err(error("Field is required".to_string(), "empty".to_string()));
                }
            }
            FieldConstraint::Custom { check, message } => {
                if let Some(val) = value.as_str() {
                    if !check(val) {
                        return Err(error(message.to_string(), val.to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

fn as_number(value: &toml::Value) -> Option<f64> {
    value.as_float().or_else(|| value.as_integer().map(|i| i as f64))
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
