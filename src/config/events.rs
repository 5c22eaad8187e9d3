// src/config/events.rs
//! Event taxonomy: raw recorder markers, semantic labels and integer codes

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Marker renames and the codes assigned to semantic labels
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventTaxonomy {
    /// Raw marker label (e.g. `Marker/M 11`) to semantic label (e.g. `scene/novel`)
    pub rename_events: BTreeMap<String, String>,
    /// Semantic label to event code
    pub event_id: BTreeMap<String, i32>,
}

impl Default for EventTaxonomy {
    fn default() -> Self {
        let conditions = [
            (11, "scene/novel"),
            (12, "scene/1back"),
            (21, "object/novel"),
            (22, "object/1back"),
            (31, "face/novel"),
            (32, "face/1back"),
        ];

        Self {
            rename_events: conditions
                .iter()
                .map(|(code, label)| (format!("Marker/M {}", code), label.to_string()))
                .collect(),
            event_id: conditions
                .iter()
                .map(|(code, label)| (label.to_string(), *code))
                .collect(),
        }
    }
}

impl EventTaxonomy {
    /// Semantic label for a raw marker
    pub fn label_for(&self, marker: &str) -> Option<&str> {
        self.rename_events.get(marker).map(String::as_str)
    }

    /// Code assigned to a semantic label
    pub fn code_for_label(&self, label: &str) -> Option<i32> {
        self.event_id.get(label).copied()
    }

    /// Code for a raw marker, composing the rename with the code table
    pub fn code_for_marker(&self, marker: &str) -> Option<i32> {
        self.label_for(marker).and_then(|label| self.code_for_label(label))
    }

    /// Raw marker to code for every marker that receives a code
    pub fn marker_codes(&self) -> BTreeMap<&str, i32> {
        self.rename_events
            .iter()
            .filter_map(|(marker, label)| self.code_for_label(label).map(|code| (marker.as_str(), code)))
            .collect()
    }

    /// Every coded label must be reachable from some marker and codes must be distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_id.is_empty() {
            return Err(ConfigError::EventTaxonomy("event_id defines no codes".to_string()));
        }

        for label in self.event_id.keys() {
            if !self.rename_events.values().any(|target| target == label) {
                return Err(ConfigError::EventTaxonomy(format!(
                    "label '{}' has a code but no marker is renamed to it",
                    label
                )));
            }
        }

        let mut seen: HashMap<i32, &str> = HashMap::new();
        for (label, code) in &self.event_id {
            if let Some(previous) = seen.insert(*code, label) {
                return Err(ConfigError::EventTaxonomy(format!(
                    "code {} is assigned to both '{}' and '{}'",
                    code, previous, label
                )));
            }
        }

        for (marker, label) in &self.rename_events {
            if !self.event_id.contains_key(label) {
                debug!(marker = %marker, label = %label, "marker renamed to a label without an event code");
            }
        }

        Ok(())
    }
}
