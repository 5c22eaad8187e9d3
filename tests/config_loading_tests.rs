// tests/config_loading_tests.rs
//! End-to-end loading tests
//!
//! These exercise the loader against real files on disk:
//! - The configuration shipped in `config/` loads and matches the built-in template
//! - Layering, JSON documents and environment overrides
//! - Missing/unknown preprocessing options and legacy documents
//! - Failures leave the filesystem untouched

use eeg_config::config::{loader, ExperimentSettings};
use eeg_config::{ConfigError, ConfigLoader, Cutoff, Platform};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn shipped_config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

/// Temporary study directory holding the shipped montage
fn study_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::copy(
        shipped_config_dir().join("old_64ch.bvef"),
        dir.path().join("old_64ch.bvef"),
    )
    .unwrap();
    dir
}

fn default_document() -> toml::Value {
    toml::Value::try_from(ExperimentSettings::default()).unwrap()
}

fn write_document(dir: &Path, name: &str, value: &toml::Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, toml::to_string(value).unwrap()).unwrap();
    path
}

fn table_mut<'a>(value: &'a mut toml::Value, key: &str) -> &'a mut toml::value::Table {
    value.get_mut(key).and_then(toml::Value::as_table_mut).unwrap()
}

#[test]
fn test_shipped_configuration_matches_template() {
    let config = ConfigLoader::with_paths(vec![shipped_config_dir().join("experiment.toml")])
        .with_platform(Platform::Linux)
        .without_environment()
        .load()
        .unwrap();

    let mut expected = ExperimentSettings::default();
    expected.paths.data_dir = Some(PathBuf::from("../data"));
    assert_eq!(config.settings(), &expected);

    assert_eq!(config.montage().len(), 64);
    assert!(config.montage().contains("FCz"));
    assert!(config.montage().contains("Cz"));
    assert_eq!(config.layout().data_dir(), shipped_config_dir().join("../data"));
    assert_eq!(config.base_dir(), Some(shipped_config_dir().as_path()));
}

#[test]
fn test_load_into_study_directory() {
    let dir = study_dir();
    let path = write_document(dir.path(), "experiment.toml", &default_document());

    let config = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load()
        .unwrap();

    let layout = config.layout();
    assert_eq!(layout.bids_dir(), dir.path().join("data/bids"));
    assert_eq!(layout.derivatives_dir(), dir.path().join("data/derivatives/task-1back"));
    assert_eq!(layout.reports_dir(), dir.path().join("data/derivatives/task-1back/reports"));
    assert_eq!(layout.analyses_dir(), dir.path().join("data/analyses/task-1back"));
    assert!(!layout.is_ready());

    config.ensure_layout().unwrap();
    assert!(config.layout().is_ready());
    // The source tree is read-only input and never created
    assert!(!dir.path().join("data/sourcedata").exists());
}

#[test]
fn test_later_layers_override_earlier_ones() {
    let dir = study_dir();
    let base = write_document(dir.path(), "experiment.toml", &default_document());
    let overlay = dir.path().join("local.toml");
    fs::write(
        &overlay,
        "[preprocess]\nresample = 500\nh_freq = 40.0\n\n[experiment]\ntask = \"2back\"\n",
    )
    .unwrap();

    let settings = ConfigLoader::with_paths(vec![base, overlay])
        .without_environment()
        .load_settings()
        .unwrap();

    assert_eq!(settings.preprocess.resample, 500);
    assert_eq!(settings.preprocess.h_freq, Cutoff::Hz(40.0));
    assert_eq!(settings.experiment.task, "2back");
    // Untouched keys keep the base value
    assert_eq!(settings.preprocess.reference_chan, "FCz");
    assert_eq!(settings.experiment.project_id, "nd012");
}

#[test]
fn test_json_document() {
    let dir = study_dir();
    let path = dir.path().join("experiment.json");
    fs::write(
        &path,
        serde_json::to_string_pretty(&ExperimentSettings::default()).unwrap(),
    )
    .unwrap();

    let config = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load()
        .unwrap();

    let expected = ExperimentSettings::default();
    let settings = config.settings();
    assert_eq!(settings.experiment, expected.experiment);
    assert_eq!(settings.events, expected.events);
    assert_eq!(settings.erp.plot, expected.erp.plot);
    assert_eq!(settings.behavior, expected.behavior);
    assert_eq!(settings.preprocess.resample, 250);
    assert_eq!(settings.preprocess.h_freq, Cutoff::Disabled);
    assert!((settings.preprocess.ext_voltage - 150e-6).abs() < 1e-12);
}

#[test]
fn test_missing_option_is_reported_by_name() {
    let dir = study_dir();
    let mut document = default_document();
    table_mut(&mut document, "preprocess").remove("blink_thresh");
    let path = write_document(dir.path(), "experiment.toml", &document);

    let err = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingOption(ref name) if name == "blink_thresh"));
}

#[test]
fn test_unknown_option_is_rejected() {
    let dir = study_dir();
    let mut document = default_document();
    table_mut(&mut document, "preprocess").insert("notch".to_string(), toml::Value::Float(60.0));
    let path = write_document(dir.path(), "experiment.toml", &document);

    let err = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownOption(ref name) if name == "notch"));
}

#[test]
fn test_missing_montage_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(dir.path(), "experiment.toml", &default_document());

    let err = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load()
        .unwrap_err();

    assert!(matches!(err, ConfigError::FileNotFound(ref p) if p.ends_with("old_64ch.bvef")));
    assert!(!dir.path().join("data").exists());
}

#[test]
fn test_malformed_montage() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("old_64ch.bvef"),
        r#"<BrainVisionElectrodes Version="1"><Electrode><Name>Cz</Name>"#,
    )
    .unwrap();
    let path = write_document(dir.path(), "experiment.toml", &default_document());

    let err = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Montage { .. }));
}

#[test]
fn test_invalid_values_collected() {
    let dir = study_dir();
    let mut document = default_document();
    let preprocess = table_mut(&mut document, "preprocess");
    preprocess.insert("resample".to_string(), toml::Value::Integer(0));
    preprocess.insert("tmin".to_string(), toml::Value::Float(2.0));
    let path = write_document(dir.path(), "experiment.toml", &document);

    match ConfigLoader::with_paths(vec![path]).without_environment().load() {
        Err(ConfigError::Validation(errors)) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert!(fields.contains(&"preprocess.resample"));
            assert!(fields.contains(&"preprocess.tmin"));
        }
        other => panic!("expected validation errors, got {:?}", other.map(|c| c.summary())),
    }
}

#[test]
fn test_legacy_document_is_migrated() {
    let dir = study_dir();
    let mut document = default_document();
    document.as_table_mut().unwrap().remove("schema_version");

    let events = table_mut(&mut document, "events");
    let renames = events.remove("rename_events").unwrap();
    events.insert("rename_markers".to_string(), renames);
    let raw: toml::value::Table = [11, 12, 21, 22, 31, 32]
        .iter()
        .map(|code| (format!("Marker/M {}", code), toml::Value::Integer(*code)))
        .collect();
    events.insert("bv_event_id".to_string(), toml::Value::Table(raw));

    let path = write_document(dir.path(), "experiment.toml", &document);
    let config = ConfigLoader::with_paths(vec![path.clone()])
        .without_environment()
        .load()
        .unwrap();

    assert_eq!(config.settings(), &ExperimentSettings::default());
    assert_eq!(config.code_for_marker("Marker/M 32"), Some(32));

    let loader = ConfigLoader::with_paths(Vec::new());
    assert!(loader.validate_config_file(&path).is_ok());
}

#[test]
fn test_legacy_document_with_conflicting_codes() {
    let mut document = default_document();
    document.as_table_mut().unwrap().remove("schema_version");
    let events = table_mut(&mut document, "events");
    let mut raw = toml::value::Table::new();
    raw.insert("Marker/M 11".to_string(), toml::Value::Integer(12));
    events.insert("bv_event_id".to_string(), toml::Value::Table(raw));

    assert!(matches!(
        loader::migrate(document),
        Err(ConfigError::EventTaxonomy(_))
    ));
}

#[test]
fn test_future_schema_version_rejected() {
    let dir = study_dir();
    let mut document = default_document();
    document
        .as_table_mut()
        .unwrap()
        .insert("schema_version".to_string(), toml::Value::Integer(9));
    let path = write_document(dir.path(), "experiment.toml", &document);

    let err = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedSchemaVersion { found: 9, .. }));
}

#[test]
fn test_export_then_validate() {
    let dir = study_dir();
    let source = write_document(dir.path(), "experiment.toml", &default_document());
    let exported = dir.path().join("effective.toml");

    let loader = ConfigLoader::with_paths(vec![source]).without_environment();
    loader.export_settings(&exported).unwrap();

    assert!(loader.validate_config_file(&exported).is_ok());
    let reloaded: ExperimentSettings =
        toml::from_str(&fs::read_to_string(&exported).unwrap()).unwrap();
    assert_eq!(reloaded, ExperimentSettings::default());
}

#[test]
#[serial]
fn test_environment_overrides() {
    let dir = study_dir();
    let path = write_document(dir.path(), "experiment.toml", &default_document());

    std::env::set_var("EEG_PREPROCESS__RESAMPLE", "500");
    std::env::set_var("EEG_PREPROCESS__H_FREQ", "40");
    std::env::set_var("EEG_EXPERIMENT__PROJECT_ID", "012");
    let result = ConfigLoader::with_paths(vec![path]).load_settings();
    std::env::remove_var("EEG_PREPROCESS__RESAMPLE");
    std::env::remove_var("EEG_PREPROCESS__H_FREQ");
    std::env::remove_var("EEG_EXPERIMENT__PROJECT_ID");

    let settings = result.unwrap();
    assert_eq!(settings.preprocess.resample, 500);
    assert_eq!(settings.preprocess.h_freq, Cutoff::Hz(40.0));
    assert_eq!(settings.experiment.project_id, "012");
}

#[test]
#[serial]
fn test_environment_override_type_mismatch() {
    let dir = study_dir();
    let path = write_document(dir.path(), "experiment.toml", &default_document());

    std::env::set_var("EEG_PREPROCESS__RESAMPLE", "fast");
    let result = ConfigLoader::with_paths(vec![path]).load_settings();
    std::env::remove_var("EEG_PREPROCESS__RESAMPLE");

    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
#[serial]
fn test_unrelated_environment_variables_are_ignored() {
    let dir = study_dir();
    let path = write_document(dir.path(), "experiment.toml", &default_document());

    std::env::set_var("EEG_DATA__ROOT", "/x");
    std::env::set_var("EEG_PREPROCESS__RESAMPLE", "500");
    let result = ConfigLoader::with_paths(vec![path]).load();
    std::env::remove_var("EEG_DATA__ROOT");
    std::env::remove_var("EEG_PREPROCESS__RESAMPLE");

    let config = result.unwrap();
    assert_eq!(config.preprocess().resample, 500);
}

#[test]
fn test_json_null_cutoff() {
    let dir = study_dir();
    let mut json = serde_json::to_value(ExperimentSettings::default()).unwrap();
    json["preprocess"]["h_freq"] = serde_json::Value::Null;
    json["preprocess"]["l_freq"] = serde_json::Value::Null;
    let path = dir.path().join("experiment.json");
    fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    let config = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load()
        .unwrap();
    assert_eq!(config.preprocess().h_freq, Cutoff::Disabled);
    assert_eq!(config.preprocess().l_freq, Cutoff::Disabled);
}

#[test]
#[serial]
fn test_environment_ignored_when_disabled() {
    let dir = study_dir();
    let path = write_document(dir.path(), "experiment.toml", &default_document());

    std::env::set_var("EEG_PREPROCESS__RESAMPLE", "500");
    let result = ConfigLoader::with_paths(vec![path])
        .without_environment()
        .load_settings();
    std::env::remove_var("EEG_PREPROCESS__RESAMPLE");

    assert_eq!(result.unwrap().preprocess.resample, 250);
}
