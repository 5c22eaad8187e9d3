// src/config/subjects.rs
//! Subject and channel exclusions

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::behavior::first_duplicate;
use crate::error::ConfigError;

/// A channel known to be bad for one subject
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BadChannel {
    pub channel: String,
    pub reason: String,
}

/// Subjects left out of group analysis and per-subject bad channels
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectExclusions {
    #[serde(default)]
    pub bad_subjects: Vec<String>,

    #[serde(default)]
    pub bad_channels: BTreeMap<String, Vec<BadChannel>>,
}

impl SubjectExclusions {
    /// Values shipped with the task template: one test subject with a bad `Cz`.
    pub fn template() -> Self {
        let mut bad_channels = BTreeMap::new();
        bad_channels.insert(
            "999".to_string(),
            vec![BadChannel {
                channel: "Cz".to_string(),
                reason: "a test for bad channels".to_string(),
            }],
        );

        Self {
            bad_subjects: Vec::new(),
            bad_channels,
        }
    }

    pub fn is_bad_subject(&self, subject: &str) -> bool {
        self.bad_subjects.iter().any(|s| s == subject)
    }

    /// Bad channels for a subject, empty when none are listed
    pub fn bad_channels_for(&self, subject: &str) -> &[BadChannel] {
        self.bad_channels.get(subject).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bad_channel_names(&self, subject: &str) -> Vec<&str> {
        self.bad_channels_for(subject)
            .iter()
            .map(|bad| bad.channel.as_str())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let inconsistent = |reason: String| ConfigError::Inconsistent {
            table: "subjects".to_string(),
            reason,
        };

        if let Some(dup) = first_duplicate(&self.bad_subjects) {
            return Err(inconsistent(format!("subject '{}' listed twice in bad_subjects", dup)));
        }

        for (subject, channels) in &self.bad_channels {
            let mut seen = HashSet::new();
            for bad in channels {
                if bad.channel.trim().is_empty() {
                    return Err(inconsistent(format!("subject '{}' has an unnamed bad channel", subject)));
                }
                if !seen.insert(bad.channel.as_str()) {
                    return Err(inconsistent(format!(
                        "channel '{}' listed twice for subject '{}'",
                        bad.channel, subject
                    )));
                }
            }
        }

        Ok(())
    }
}
