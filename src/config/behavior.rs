// src/config/behavior.rs
//! Behavioral-data column schema used when merging responses into events

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Columns retained from the behavioral log, their renames, and the merge set
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorSchema {
    pub cols_to_keep: Vec<String>,
    pub cols_to_rename: BTreeMap<String, String>,
    pub cols_to_add: Vec<String>,
}

impl Default for BehaviorSchema {
    fn default() -> Self {
        let strings = |cols: &[&str]| cols.iter().map(|c| c.to_string()).collect::<Vec<_>>();

        Self {
            cols_to_keep: strings(&[
                "id", "stim_set", "frameRate", "psychopyVersion", "TrialNumber", "image",
                "category", "subcategory", "repeat", "jitter", "resp", "rt", "correct",
            ]),
            cols_to_rename: [
                ("frameRate", "frame_rate"),
                ("psychopyVersion", "psychopy_version"),
                ("TrialNumber", "trial_number"),
            ]
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect(),
            cols_to_add: strings(&[
                "trial_number", "category", "subcategory", "repeat", "resp", "rt", "correct",
            ]),
        }
    }
}

impl BehaviorSchema {
    /// Name a source column carries after renaming
    pub fn renamed<'a>(&'a self, column: &'a str) -> &'a str {
        self.cols_to_rename.get(column).map(String::as_str).unwrap_or(column)
    }

    /// Retained columns after renaming, in `cols_to_keep` order
    pub fn retained_columns(&self) -> Vec<&str> {
        self.cols_to_keep.iter().map(|c| self.renamed(c)).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let inconsistent = |reason: String| ConfigError::Inconsistent {
            table: "behavior".to_string(),
            reason,
        };

        if let Some(dup) = first_duplicate(&self.cols_to_keep) {
            return Err(inconsistent(format!("column '{}' listed twice in cols_to_keep", dup)));
        }
        if let Some(dup) = first_duplicate(&self.cols_to_add) {
            return Err(inconsistent(format!("column '{}' listed twice in cols_to_add", dup)));
        }

        for source in self.cols_to_rename.keys() {
            if !self.cols_to_keep.contains(source) {
                return Err(inconsistent(format!(
                    "renamed column '{}' is not in cols_to_keep",
                    source
                )));
            }
        }

        let retained = self.retained_columns();
        let unique: HashSet<&str> = retained.iter().copied().collect();
        if unique.len() != retained.len() {
            return Err(inconsistent("renaming produces duplicate column names".to_string()));
        }

        for column in &self.cols_to_add {
            if !unique.contains(column.as_str()) {
                return Err(inconsistent(format!(
                    "column '{}' in cols_to_add is not a retained column",
                    column
                )));
            }
        }

        Ok(())
    }
}

pub(crate) fn first_duplicate(items: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    items.iter().map(String::as_str).find(|item| !seen.insert(*item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_consistent() {
        let schema = BehaviorSchema::default();
        assert!(schema.validate().is_ok());
        for source in schema.cols_to_rename.keys() {
            assert!(schema.cols_to_keep.contains(source));
        }
    }

    #[test]
    fn test_retained_columns_apply_renames() {
        let schema = BehaviorSchema::default();
        let retained = schema.retained_columns();
        assert_eq!(retained.len(), 13);
        assert_eq!(retained[2], "frame_rate");
        assert_eq!(retained[4], "trial_number");
        assert_eq!(schema.renamed("rt"), "rt");
    }

    #[test]
    fn test_rename_of_dropped_column_rejected() {
        let mut schema = BehaviorSchema::default();
        schema
            .cols_to_rename
            .insert("thisN".to_string(), "trial_index".to_string());
        assert!(matches!(schema.validate(), Err(ConfigError::Inconsistent { .. })));
    }

    #[test]
    fn test_merge_column_must_be_retained() {
        let mut schema = BehaviorSchema::default();
        schema.cols_to_add.push("TrialNumber".to_string());
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("TrialNumber"));
    }

    #[test]
    fn test_rename_collision_rejected() {
        let mut schema = BehaviorSchema::default();
        schema.cols_to_rename.insert("rt".to_string(), "resp".to_string());
        assert!(schema.validate().is_err());
    }
}
