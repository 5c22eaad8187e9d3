// src/montage.rs
//! Electrode montage loaded from a BrainVision electrode file (BVEF)
//!
//! A BVEF document lists electrodes in spherical coordinates:
//!
//! ```xml
//! <BrainVisionElectrodes Version="1">
//!   <Electrode><Name>Fp1</Name><Theta>-90</Theta><Phi>-72</Phi><Radius>1</Radius></Electrode>
//! </BrainVisionElectrodes>
//! ```
//!
//! `Theta` is the signed inclination from the vertex and `Phi` the azimuth
//! from the right preauricular axis, both in degrees. When every radius in the
//! file is 1 the positions lie on the idealized unit sphere and are scaled by
//! the head size; otherwise every radius is in millimetres.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Deserialize;
use tracing::debug;

use crate::config::constants::montage::*;
use crate::error::ConfigError;

/// One electrode position in head coordinates, metres
#[derive(Debug, Clone, PartialEq)]
pub struct Electrode {
    pub name: String,
    pub position: [f64; 3],
}

/// Parsed electrode positions
#[derive(Debug, Clone, PartialEq)]
pub struct Montage {
    electrodes: Vec<Electrode>,
    head_size: f64,
    source: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct BvefDocument {
    #[serde(rename = "Electrode", default)]
    electrode: Vec<BvefElectrode>,
    // Some exporters nest the electrodes in an `<Electrodes>` element
    #[serde(rename = "Electrodes", default)]
    electrodes: Option<BvefElectrodes>,
}

#[derive(Debug, Deserialize)]
struct BvefElectrodes {
    #[serde(rename = "Electrode", default)]
    electrode: Vec<BvefElectrode>,
}

#[derive(Debug, Deserialize)]
struct BvefElectrode {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Theta")]
    theta: f64,
    #[serde(rename = "Phi")]
    phi: f64,
    #[serde(rename = "Radius")]
    radius: f64,
}

impl Montage {
    /// Read a BVEF file, scaling unit-sphere positions to `head_size` metres.
    pub fn from_bvef<P: AsRef<Path>>(path: P, head_size: f64) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let mut montage = Self::parse_bvef(&content, head_size).map_err(|reason| ConfigError::Montage {
            path: path.to_path_buf(),
            reason,
        })?;
        montage.source = Some(path.to_path_buf());

        debug!(path = %path.display(), channels = montage.len(), head_size, "loaded montage");
        Ok(montage)
    }

    /// Parse BVEF text. Errors are plain messages; [`Montage::from_bvef`] attaches the path.
    pub fn parse_bvef(content: &str, head_size: f64) -> Result<Self, String> {
        check_head_size(head_size)?;

        let document: BvefDocument =
            quick_xml::de::from_str(content).map_err(|e| format!("invalid BVEF document: {}", e))?;

        let mut raw = document.electrode;
        if let Some(nested) = document.electrodes {
            raw.extend(nested.electrode);
        }

        let unit_sphere = !raw.is_empty()
            && raw
                .iter()
                .all(|e| (e.radius - UNIT_SPHERE_RADIUS).abs() < RADIUS_TOLERANCE);

        let electrodes = raw
            .into_iter()
            .map(|e| {
                let r = if unit_sphere {
                    head_size
                } else {
                    e.radius / MILLIMETRES_PER_METRE
                };
                Electrode {
                    position: spherical_to_cartesian(e.theta, e.phi, r),
                    name: e.name.trim().to_string(),
                }
            })
            .collect();

        Self::from_electrodes(electrodes, head_size)
    }

    /// Build a montage from positions already in metres.
    pub fn from_electrodes(electrodes: Vec<Electrode>, head_size: f64) -> Result<Self, String> {
        check_head_size(head_size)?;

        if electrodes.is_empty() {
            return Err("montage contains no electrodes".to_string());
        }

        let mut seen = HashSet::new();
        for electrode in &electrodes {
            if electrode.name.is_empty() {
                return Err("electrode without a name".to_string());
            }
            if !seen.insert(electrode.name.as_str()) {
                return Err(format!("electrode '{}' defined twice", electrode.name));
            }
            if electrode.position.iter().any(|c| !c.is_finite()) {
                return Err(format!("electrode '{}' has a non-finite position", electrode.name));
            }
        }

        Ok(Self {
            electrodes,
            head_size,
            source: None,
        })
    }

    pub fn len(&self) -> usize {
        self.electrodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.electrodes.is_empty()
    }

    pub fn head_size(&self) -> f64 {
        self.head_size
    }

    /// File the montage was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn electrodes(&self) -> &[Electrode] {
        &self.electrodes
    }

    pub fn ch_names(&self) -> Vec<&str> {
        self.electrodes.iter().map(|e| e.name.as_str()).collect()
    }

    /// Case-sensitive lookup, as channel names are in recordings
    pub fn position(&self, name: &str) -> Option<[f64; 3]> {
        self.electrodes
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.position)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Positions as a `[n_channels, 3]` array in file order
    pub fn positions(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.electrodes.len(), 3));
        for (mut row, electrode) in out.outer_iter_mut().zip(&self.electrodes) {
            for (dst, src) in row.iter_mut().zip(electrode.position) {
                *dst = src;
            }
        }
        out
    }
}

fn check_head_size(head_size: f64) -> Result<(), String> {
    if !(head_size > 0.0 && head_size <= MAX_HEAD_SIZE_M) {
        return Err(format!(
            "head size must be in (0, {}] metres, got {}",
            MAX_HEAD_SIZE_M, head_size
        ));
    }
    Ok(())
}

fn spherical_to_cartesian(theta_deg: f64, phi_deg: f64, r: f64) -> [f64; 3] {
    let (theta, phi) = (theta_deg.to_radians(), phi_deg.to_radians());
    [
        r * theta.sin() * phi.cos(),
        r * theta.sin() * phi.sin(),
        r * theta.cos(),
    ]
}
