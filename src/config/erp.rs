// src/config/erp.rs
//! ERP definitions: metadata queries, contrasts and the plotting list

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::behavior::first_duplicate;
use crate::error::ConfigError;

/// One weighted condition of a contrast
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContrastTerm {
    pub condition: String,
    pub weight: f64,
}

/// ERPs extracted from epochs metadata and the contrasts built from them
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ErpDefinitions {
    /// ERP name to a query over epochs metadata (e.g. `repeat == 1`)
    #[serde(default)]
    pub queries: BTreeMap<String, String>,

    /// Contrast name to weighted conditions
    #[serde(default)]
    pub contrasts: BTreeMap<String, Vec<ContrastTerm>>,

    /// ERPs and contrasts drawn in reports, in order
    #[serde(default)]
    pub plot: Vec<String>,
}

impl ErpDefinitions {
    /// Queries and contrasts for the 1-back task
    pub fn template() -> Self {
        let mut queries = BTreeMap::new();
        for category in ["scene", "object", "face"] {
            queries.insert(
                format!("{}/novel", category),
                format!("category == '{}' and repeat == 1", category),
            );
            queries.insert(
                format!("{}/1back", category),
                format!("category == '{}' and repeat == 2", category),
            );
        }
        queries.insert("novel".to_string(), "repeat == 1".to_string());
        queries.insert("1back".to_string(), "repeat == 2".to_string());

        let term = |condition: &str, weight: f64| ContrastTerm {
            condition: condition.to_string(),
            weight,
        };
        let mut contrasts = BTreeMap::new();
        contrasts.insert("1back-novel".to_string(), vec![term("1back", 1.0), term("novel", -1.0)]);
        for category in ["scene", "object", "face"] {
            contrasts.insert(
                format!("{}/1back-novel", category),
                vec![
                    term(&format!("{}/1back", category), 1.0),
                    term(&format!("{}/novel", category), -1.0),
                ],
            );
        }

        Self {
            queries,
            contrasts,
            plot: vec!["novel".to_string(), "1back".to_string(), "1back-novel".to_string()],
        }
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.queries.get(name).map(String::as_str)
    }

    pub fn contrast(&self, name: &str) -> Option<&[ContrastTerm]> {
        self.contrasts.get(name).map(Vec::as_slice)
    }

    /// Sum of weights; zero for a pure subtraction
    pub fn contrast_weight_sum(&self, name: &str) -> Option<f64> {
        self.contrast(name).map(|terms| terms.iter().map(|t| t.weight).sum())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let inconsistent = |reason: String| ConfigError::Inconsistent {
            table: "erp".to_string(),
            reason,
        };

        for (name, query) in &self.queries {
            if query.trim().is_empty() {
                return Err(inconsistent(format!("ERP '{}' has an empty query", name)));
            }
        }

        for (name, terms) in &self.contrasts {
            if self.queries.contains_key(name) {
                return Err(inconsistent(format!("'{}' names both a query and a contrast", name)));
            }
            if terms.is_empty() {
                return Err(inconsistent(format!("contrast '{}' has no terms", name)));
            }
            for term in terms {
                if !self.queries.contains_key(&term.condition) {
                    return Err(inconsistent(format!(
                        "contrast '{}' uses undefined condition '{}'",
                        name, term.condition
                    )));
                }
                if !term.weight.is_finite() {
                    return Err(inconsistent(format!("contrast '{}' has a non-finite weight", name)));
                }
            }
        }

        if let Some(dup) = first_duplicate(&self.plot) {
            return Err(inconsistent(format!("'{}' listed twice in plot", dup)));
        }
        for name in &self.plot {
            if !self.queries.contains_key(name) && !self.contrasts.contains_key(name) {
                return Err(inconsistent(format!("plot entry '{}' is neither a query nor a contrast", name)));
            }
        }

        Ok(())
    }
}
