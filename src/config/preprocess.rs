// src/config/preprocess.rs
//! Preprocessing options consumed by the filtering and epoching stages

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::constants::preprocess::*;
use crate::config::schema_validator::ValidationError;
use crate::error::ConfigError;

/// Every option the preprocessing table must define, in document order.
pub const RECOGNIZED_OPTIONS: &[&str] = &[
    "reference_chan",
    "photosensor_chan",
    "resample",
    "l_freq",
    "h_freq",
    "tmin",
    "tmax",
    "baseline",
    "bad_chan_thresh",
    "ext_voltage",
    "blink_thresh",
];

/// Filtering and epoching parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessOptions {
    /// Online reference electrode, re-added before re-referencing
    pub reference_chan: String,
    /// Channel carrying the stimulus photodiode
    pub photosensor_chan: String,
    /// Target sampling rate in Hz
    pub resample: u32,
    /// Highpass edge
    pub l_freq: Cutoff,
    /// Lowpass edge
    pub h_freq: Cutoff,
    /// Epoch start relative to the event, seconds
    pub tmin: f64,
    /// Epoch end relative to the event, seconds
    pub tmax: f64,
    /// Baseline window `(start, end)` in seconds
    pub baseline: (f64, f64),
    /// Deviation threshold for flagging bad channels
    pub bad_chan_thresh: f64,
    /// Peak-to-peak limit for extreme voltages, volts
    pub ext_voltage: f64,
    /// Peak-to-peak limit for blink detection, volts
    pub blink_thresh: f64,
}

/// A filter edge that may be switched off
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    /// No filtering at this edge
    Disabled,
    /// Cutoff frequency in Hz
    Hz(f64),
}

impl Cutoff {
    /// Frequency if the edge is enabled
    pub fn hz(&self) -> Option<f64> {
        match self {
            Cutoff::Disabled => None,
            Cutoff::Hz(hz) => Some(*hz),
        }
    }
}

impl Serialize for Cutoff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cutoff::Disabled => serializer.serialize_str(CUTOFF_DISABLED),
            Cutoff::Hz(hz) => serializer.serialize_f64(*hz),
        }
    }
}

impl<'de> Deserialize<'de> for Cutoff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hz(f64),
            Keyword(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hz(hz) => Ok(Cutoff::Hz(hz)),
            Repr::Keyword(word) if word.eq_ignore_ascii_case(CUTOFF_DISABLED) => Ok(Cutoff::Disabled),
            Repr::Keyword(word) if word.trim().parse::<f64>().is_ok() => {
                word.trim().parse().map(Cutoff::Hz).map_err(serde::de::Error::custom)
            }
            Repr::Keyword(word) => Err(serde::de::Error::custom(format!(
                "expected a frequency in Hz or \"{}\", got \"{}\"",
                CUTOFF_DISABLED, word
            ))),
        }
    }
}

/// Typed view of a single option, as returned by [`PreprocessOptions::get`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionValue<'a> {
    /// Channel name
    Channel(&'a str),
    /// Whole number (sampling rate)
    Integer(i64),
    /// Threshold or time in SI units
    Float(f64),
    /// Filter edge
    Cutoff(Cutoff),
    /// Time window `(start, end)`
    Window(f64, f64),
}

impl OptionValue<'_> {
    /// Numeric value, if the option is scalar and enabled
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Integer(v) => Some(*v as f64),
            OptionValue::Float(v) => Some(*v),
            OptionValue::Cutoff(c) => c.hz(),
            _ => None,
        }
    }

    /// Channel name, if the option names a channel
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Channel(name) => Some(name),
            _ => None,
        }
    }
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            reference_chan: DEFAULT_REFERENCE_CHAN.to_string(),
            photosensor_chan: DEFAULT_PHOTOSENSOR_CHAN.to_string(),
            resample: DEFAULT_RESAMPLE_HZ,
            l_freq: Cutoff::Hz(DEFAULT_L_FREQ_HZ),
            h_freq: Cutoff::Disabled,
            tmin: DEFAULT_TMIN_S,
            tmax: DEFAULT_TMAX_S,
            baseline: DEFAULT_BASELINE_S,
            bad_chan_thresh: DEFAULT_BAD_CHAN_THRESH,
            ext_voltage: DEFAULT_EXT_VOLTAGE_V,
            blink_thresh: DEFAULT_BLINK_THRESH_V,
        }
    }
}

impl PreprocessOptions {
    /// Look up an option by name.
    pub fn get(&self, name: &str) -> Result<OptionValue<'_>, ConfigError> {
        let value = match name {
            "reference_chan" => OptionValue::Channel(&self.reference_chan),
            "photosensor_chan" => OptionValue::Channel(&self.photosensor_chan),
            "resample" => OptionValue::Integer(i64::from(self.resample)),
            "l_freq" => OptionValue::Cutoff(self.l_freq),
            "h_freq" => OptionValue::Cutoff(self.h_freq),
            "tmin" => OptionValue::Float(self.tmin),
            "tmax" => OptionValue::Float(self.tmax),
            "baseline" => OptionValue::Window(self.baseline.0, self.baseline.1),
            "bad_chan_thresh" => OptionValue::Float(self.bad_chan_thresh),
            "ext_voltage" => OptionValue::Float(self.ext_voltage),
            "blink_thresh" => OptionValue::Float(self.blink_thresh),
            other => return Err(ConfigError::UnknownOption(other.to_string())),
        };
        Ok(value)
    }

    /// Check that a raw `preprocess` table defines exactly the recognized options.
    pub fn check_keys(table: &toml::value::Table) -> Result<(), ConfigError> {
        if let Some(unknown) = table.keys().find(|k| !RECOGNIZED_OPTIONS.contains(&k.as_str())) {
            return Err(ConfigError::UnknownOption(unknown.clone()));
        }
        if let Some(missing) = RECOGNIZED_OPTIONS.iter().find(|k| !table.contains_key(**k)) {
            return Err(ConfigError::MissingOption(missing.to_string()));
        }
        Ok(())
    }

    /// Nyquist frequency after resampling
    pub fn nyquist_hz(&self) -> f64 {
        f64::from(self.resample) / 2.0
    }

    /// Epoch length in samples at the target rate, endpoints included
    pub fn epoch_samples(&self) -> usize {
        ((self.tmax - self.tmin) * f64::from(self.resample)).round() as usize + 1
    }

    /// Cross-field checks on filter edges and time windows.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: String, value: String| {
            errors.push(ValidationError {
                field: format!("preprocess.{}", field),
                message,
                value,
            });
        };

        for (field, cutoff) in [("l_freq", self.l_freq), ("h_freq", self.h_freq)] {
            if let Some(hz) = cutoff.hz() {
                if hz <= 0.0 {
                    fail(field, "Cutoff frequency must be positive".to_string(), hz.to_string());
                } else if self.resample > 0 && hz >= self.nyquist_hz() {
                    fail(
                        field,
                        "Cutoff must be less than the Nyquist frequency".to_string(),
                        format!("cutoff: {}, nyquist: {}", hz, self.nyquist_hz()),
                    );
                }
            }
        }

        if let (Some(low), Some(high)) = (self.l_freq.hz(), self.h_freq.hz()) {
            if low >= high {
                fail(
                    "l_freq",
                    "Highpass edge must be below lowpass edge".to_string(),
                    format!("l_freq: {}, h_freq: {}", low, high),
                );
            }
        }

        if self.tmin >= self.tmax {
            fail(
                "tmin",
                "Epoch start must precede epoch end".to_string(),
                format!("tmin: {}, tmax: {}", self.tmin, self.tmax),
            );
        }

        let (start, end) = self.baseline;
        if start > end || start < self.tmin || end > self.tmax {
            fail(
                "baseline",
                "Baseline must be an ordered window inside the epoch".to_string(),
                format!("({}, {}) in [{}, {}]", start, end, self.tmin, self.tmax),
            );
        }

        for (field, value) in [
            ("bad_chan_thresh", self.bad_chan_thresh),
            ("ext_voltage", self.ext_voltage),
            ("blink_thresh", self.blink_thresh),
        ] {
            if value <= 0.0 {
                fail(field, "Threshold must be positive".to_string(), value.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let opts = PreprocessOptions::default();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.epoch_samples(), 501);
    }

    #[test]
    fn test_get_resample() {
        let opts = PreprocessOptions::default();
        assert_eq!(opts.get("resample").unwrap(), OptionValue::Integer(250));
        assert_eq!(opts.get("resample").unwrap().as_f64(), Some(250.0));
        assert_eq!(opts.get("reference_chan").unwrap().as_str(), Some("FCz"));
        assert_eq!(opts.get("h_freq").unwrap(), OptionValue::Cutoff(Cutoff::Disabled));
    }

    #[test]
    fn test_get_unknown_option() {
        let opts = PreprocessOptions::default();
        assert!(matches!(
            opts.get("notch_freq"),
            Err(ConfigError::UnknownOption(name)) if name == "notch_freq"
        ));
    }

    #[test]
    fn test_every_recognized_option_resolves() {
        let opts = PreprocessOptions::default();
        for name in RECOGNIZED_OPTIONS {
            assert!(opts.get(name).is_ok(), "option {} did not resolve", name);
        }
    }

    #[test]
    fn test_check_keys() {
        let full = toml::Value::try_from(PreprocessOptions::default()).unwrap();
        let mut table = full.as_table().unwrap().clone();
        assert!(PreprocessOptions::check_keys(&table).is_ok());

        table.remove("tmax");
        assert!(matches!(
            PreprocessOptions::check_keys(&table),
            Err(ConfigError::MissingOption(name)) if name == "tmax"
        ));

        let mut table = full.as_table().unwrap().clone();
        table.insert("lfreq".to_string(), toml::Value::Float(1.0));
        assert!(matches!(
            PreprocessOptions::check_keys(&table),
            Err(ConfigError::UnknownOption(name)) if name == "lfreq"
        ));
    }

    #[test]
    fn test_cutoff_parsing() {
        #[derive(Deserialize)]
        struct Edges {
            low: Cutoff,
            high: Cutoff,
            int: Cutoff,
        }

        let edges: Edges = toml::from_str("low = 0.1\nhigh = \"none\"\nint = 40").unwrap();
        assert_eq!(edges.low, Cutoff::Hz(0.1));
        assert_eq!(edges.high, Cutoff::Disabled);
        assert_eq!(edges.int, Cutoff::Hz(40.0));

        let edges: Edges = toml::from_str("low = \"0.5\"\nhigh = \"NONE\"\nint = 1").unwrap();
        assert_eq!(edges.low, Cutoff::Hz(0.5));
        assert_eq!(edges.high, Cutoff::Disabled);

        assert!(toml::from_str::<Edges>("low = \"off\"\nhigh = 1.0\nint = 2").is_err());
    }

    #[test]
    fn test_invalid_windows() {
        let mut opts = PreprocessOptions::default();
        opts.tmin = 1.0;
        opts.tmax = -1.0;
        let errors = opts.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "preprocess.tmin"));
        assert!(errors.iter().any(|e| e.field == "preprocess.baseline"));
    }

    #[test]
    fn test_cutoff_above_nyquist() {
        let opts = PreprocessOptions {
            h_freq: Cutoff::Hz(200.0),
            ..PreprocessOptions::default()
        };
        let errors = opts.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "preprocess.h_freq");
    }

    #[test]
    fn test_inverted_band() {
        let opts = PreprocessOptions {
            l_freq: Cutoff::Hz(30.0),
            h_freq: Cutoff::Hz(1.0),
            ..PreprocessOptions::default()
        };
        assert!(opts.validate().is_err());
    }
}
