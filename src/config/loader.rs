// src/config/loader.rs
//! Layered configuration loader with schema migration and environment overrides

use crate::config::{
    constants::{
        env as env_vars, paths,
        preprocess::{CUTOFF_DISABLED, CUTOFF_FIELDS},
        schema,
    },
    ExperimentConfig, ExperimentSettings, PreprocessOptions,
};
use crate::error::ConfigError;
use crate::layout::Platform;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration loader
///
/// Files are merged in order, later files overriding earlier ones table by
/// table. `EEG_<SECTION>__<KEY>` environment variables are applied last.
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    platform: Platform,
    use_environment: bool,
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            platform: Platform::current(),
            use_environment: true,
        }
    }

    /// Resolve server paths for another platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Skip `EEG_*` environment overrides
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, validate and build the experiment configuration.
    pub fn load(&self) -> Result<ExperimentConfig, ConfigError> {
        let (settings, base_dir) = self.load_settings_with_base()?;
        ExperimentConfig::from_settings(settings, self.platform, base_dir.as_deref())
    }

    /// Load and validate the settings document without touching the montage.
    pub fn load_settings(&self) -> Result<ExperimentSettings, ConfigError> {
        self.load_settings_with_base().map(|(settings, _)| settings)
    }

    /// Validate a single configuration file without loading
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let value = migrate(load_config_file(path.as_ref())?)?;
        settings_from_value(value)?.validate()
    }

    /// Export effective settings to file
    pub fn export_settings<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.load_settings()?.save(path)
    }

    fn load_settings_with_base(&self) -> Result<(ExperimentSettings, Option<PathBuf>), ConfigError> {
        let (mut merged, base_dir) = self.load_and_merge_configs()?;

        if self.use_environment {
            apply_environment_overrides(&mut merged, std::env::vars())?;
        }

        let settings = settings_from_value(merged)?;
        settings.validate()?;
        Ok((settings, base_dir))
    }

    fn load_and_merge_configs(&self) -> Result<(toml::Value, Option<PathBuf>), ConfigError> {
        let mut merged: Option<toml::Value> = None;
        let mut base_dir = None;

        for config_path in &self.config_paths {
            if !config_path.exists() {
                continue;
            }

            let layer = migrate(load_config_file(config_path)?)?;
            debug!(path = %config_path.display(), "merging configuration layer");

            match merged.as_mut() {
                Some(base) => merge_toml_values(base, layer),
                None => merged = Some(layer),
            }
            base_dir = config_path.parent().map(Path::to_path_buf);
        }

        match merged {
            Some(value) => Ok((value, base_dir)),
            None => {
                warn!("no configuration file found, using built-in defaults");
                let value = toml::Value::try_from(ExperimentSettings::default())
                    .map_err(|e| ConfigError::Parse(e.to_string()))?;
                Ok((value, None))
            }
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System-wide configuration
        paths.push(PathBuf::from(paths::SYSTEM_CONFIG_PATH));

        // User configuration
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(paths::USER_CONFIG_DIR).join(paths::USER_CONFIG_FILE));
        }

        // Local configurations (in order of precedence)
        paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_OVERRIDE_FILE));

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let mut json: serde_json::Value = serde_json::from_str(&content)?;
        replace_json_nulls(&mut json);
        toml::Value::try_from(json).map_err(|e| {
            ConfigError::Parse(format!("{}: {}", path.display(), e))
        })
    } else {
        toml::from_str(&content).map_err(|e| {
            ConfigError::Parse(format!("{}: {}", path.display(), e))
        })
    }
}

/// TOML has no null. A null cutoff disables that filter edge; any other
/// null object member is treated as absent.
fn replace_json_nulls(json: &mut serde_json::Value) {
    if let Some(preprocess) = json.get_mut("preprocess").and_then(serde_json::Value::as_object_mut) {
        for edge in CUTOFF_FIELDS {
            if let Some(value) = preprocess.get_mut(*edge).filter(|v| v.is_null()) {
                *value = serde_json::Value::String(CUTOFF_DISABLED.to_string());
            }
        }
    }
    strip_json_nulls(json);
}

fn strip_json_nulls(json: &mut serde_json::Value) {
    match json {
        serde_json::Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_json_nulls);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_json_nulls),
        _ => {}
    }
}

fn settings_from_value(value: toml::Value) -> Result<ExperimentSettings, ConfigError> {
    let preprocess = value
        .get("preprocess")
        .and_then(toml::Value::as_table)
        .ok_or_else(|| ConfigError::Parse("missing table 'preprocess'".to_string()))?;
    PreprocessOptions::check_keys(preprocess)?;

    value.try_into().map_err(|e: toml::de::Error| {
        ConfigError::Parse(format!("Failed to deserialize config: {}", e))
    })
}

/// Bring a document up to the current schema version.
///
/// Version 1 documents name the marker table `rename_markers` and may carry a
/// `bv_event_id` table of raw marker codes. That table must agree with the
/// composition of the rename and `event_id` tables; it is dropped afterwards.
pub fn migrate(mut value: toml::Value) -> Result<toml::Value, ConfigError> {
    let version = match value.get("schema_version") {
        None => schema::LEGACY_VERSION,
        Some(v) => v
            .as_integer()
            .ok_or_else(|| ConfigError::Parse("schema_version must be an integer".to_string()))?,
    };

    if version > schema::CURRENT_VERSION || version < schema::LEGACY_VERSION {
        return Err(ConfigError::UnsupportedSchemaVersion {
            found: version,
            supported: schema::CURRENT_VERSION,
        });
    }
    if version == schema::CURRENT_VERSION {
        return Ok(value);
    }

    let root = value
        .as_table_mut()
        .ok_or_else(|| ConfigError::Parse("configuration root must be a table".to_string()))?;

    let mut migrated = false;
    if let Some(events) = root.get_mut("events").and_then(toml::Value::as_table_mut) {
        if let Some(renames) = events.remove("rename_markers") {
            if events.contains_key("rename_events") {
                return Err(ConfigError::EventTaxonomy(
                    "both rename_markers and rename_events are present".to_string(),
                ));
            }
            events.insert("rename_events".to_string(), renames);
            migrated = true;
        }

        if let Some(raw_codes) = events.remove("bv_event_id") {
            check_raw_codes(events, &raw_codes)?;
            migrated = true;
        }
    }

    if migrated {
        warn!(from = version, to = schema::CURRENT_VERSION, "migrated legacy event tables");
    }

    root.insert("schema_version".to_string(), toml::Value::Integer(schema::CURRENT_VERSION));
    Ok(value)
}

fn check_raw_codes(events: &toml::value::Table, raw_codes: &toml::Value) -> Result<(), ConfigError> {
    let raw_codes = raw_codes
        .as_table()
        .ok_or_else(|| ConfigError::Parse("bv_event_id must be a table".to_string()))?;
    let renames = events.get("rename_events").and_then(toml::Value::as_table);
    let codes = events.get("event_id").and_then(toml::Value::as_table);

    for (marker, raw_code) in raw_codes {
        let composed = renames
            .and_then(|r| r.get(marker))
            .and_then(toml::Value::as_str)
            .and_then(|label| codes.and_then(|c| c.get(label)))
            .and_then(toml::Value::as_integer);

        if composed != raw_code.as_integer() {
            return Err(ConfigError::EventTaxonomy(format!(
                "bv_event_id gives marker '{}' code {} but the rename and event_id tables give {}",
                marker,
                raw_code,
                composed.map_or_else(|| "none".to_string(), |c| c.to_string())
            )));
        }
    }
    Ok(())
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// Apply `EEG_<SECTION>__<KEY>=value` overrides from `vars`.
///
/// Only variables whose section is a settings table are applied. Values are
/// coerced to the type already present at that path; new keys are parsed as
/// integer, float, bool, then string.
pub fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, raw) in vars {
        let Some(rest) = key.strip_prefix(env_vars::PREFIX) else {
            continue;
        };
        if !rest.contains(env_vars::PATH_SEPARATOR) {
            continue;
        }

        let path: Vec<String> = rest
            .split(env_vars::PATH_SEPARATOR)
            .map(str::to_lowercase)
            .collect();
        if path.iter().any(String::is_empty) {
            continue;
        }
        if !env_vars::SECTIONS.contains(&path[0].as_str()) {
            debug!(variable = %key, "ignoring variable outside the configuration sections");
            continue;
        }

        let existing = lookup(config, &path);
        let value = coerce_env_value(existing, &raw).ok_or_else(|| {
            ConfigError::Parse(format!("environment override {}={} does not match the expected type", key, raw))
        })?;

        debug!(variable = %key, "applying environment override");
        set_nested_value(config, &path, value);
    }
    Ok(())
}

fn lookup<'a>(config: &'a toml::Value, path: &[String]) -> Option<&'a toml::Value> {
    path.iter()
        .try_fold(config, |current, part| current.as_table()?.get(part))
}

fn coerce_env_value(existing: Option<&toml::Value>, raw: &str) -> Option<toml::Value> {
    match existing {
        Some(toml::Value::String(_)) => Some(toml::Value::String(raw.to_string())),
        Some(toml::Value::Integer(_)) => raw.parse().ok().map(toml::Value::Integer),
        // Float slots may also hold a keyword such as a disabled cutoff
        Some(toml::Value::Float(_)) => Some(
            raw.parse()
                .map(toml::Value::Float)
                .unwrap_or_else(|_| toml::Value::String(raw.to_string())),
        ),
        Some(toml::Value::Boolean(_)) => raw.parse().ok().map(toml::Value::Boolean),
        _ => Some(parse_env_value(raw)),
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    // Try parsing as different types
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }

    if let toml::Value::Table(table) = current {
        table.insert(last.clone(), value);
    }
}

// Cross-platform directory discovery
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("USERPROFILE").map(PathBuf::from)
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("HOME").map(PathBuf::from)
        }
    }
}
