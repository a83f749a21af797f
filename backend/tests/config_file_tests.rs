//! Configuration loading from files and the environment.

mod support;

use std::io::Write;

use bloomwatch::config::{EngineConfig, CONFIG_ENV_VAR};
use bloomwatch::models::IndexKind;
use bloomwatch::provider::{create_provider, ProviderKind, PROVIDER_ENV_VAR};
use bloomwatch::PhenologyError;

use support::with_scoped_env;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_from_file_overrides_selected_fields() {
    let file = write_config(
        r#"
[normalizer]
cadence_days = 16
index = "evi"

[predictor]
default_years_back = 10

[cache]
ttl_secs = 60
"#,
    );

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.normalizer.cadence_days, 16);
    assert_eq!(config.normalizer.index, IndexKind::Evi);
    assert_eq!(config.predictor.default_years_back, 10);
    assert_eq!(config.cache.ttl_secs, 60);
    // Untouched sections keep their defaults
    assert_eq!(config.detector, EngineConfig::default().detector);
}

#[test]
fn test_from_file_rejects_invalid_values() {
    let file = write_config("[normalizer]\ncadence_days = 0\n");
    let err = EngineConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, PhenologyError::Configuration { .. }));
}

#[test]
fn test_from_file_reports_parse_errors() {
    let file = write_config("[normalizer\ncadence_days = ");
    let err = EngineConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("parse"));
}

#[test]
fn test_missing_file_is_an_error() {
    let err = EngineConfig::from_file("/nonexistent/bloomwatch.toml").unwrap_err();
    assert!(matches!(err, PhenologyError::Configuration { .. }));
}

#[test]
fn test_env_var_selects_config_file() {
    let file = write_config("[detector]\nonset_threshold = 0.2\n");
    let path = file.path().to_str().unwrap().to_string();

    let config = with_scoped_env(&[(CONFIG_ENV_VAR, Some(&path))], || {
        EngineConfig::from_env_or_default()
    })
    .unwrap();
    assert_eq!(config.detector.onset_threshold, 0.2);
}

#[test]
fn test_env_var_pointing_nowhere_fails() {
    let result = with_scoped_env(&[(CONFIG_ENV_VAR, Some("/nonexistent/bloomwatch.toml"))], || {
        EngineConfig::from_env_or_default()
    });
    assert!(result.is_err());
}

#[test]
fn test_no_config_anywhere_uses_defaults() {
    let config = with_scoped_env(&[(CONFIG_ENV_VAR, None)], || {
        EngineConfig::from_env_or_default()
    })
    .unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn test_provider_kind_from_env() {
    let kind = with_scoped_env(&[(PROVIDER_ENV_VAR, None)], ProviderKind::from_env).unwrap();
    assert_eq!(kind, ProviderKind::Synthetic);

    let kind =
        with_scoped_env(&[(PROVIDER_ENV_VAR, Some("local"))], ProviderKind::from_env).unwrap();
    assert_eq!(kind, ProviderKind::Local);

    let result = with_scoped_env(&[(PROVIDER_ENV_VAR, Some("landsat"))], ProviderKind::from_env);
    assert!(result.is_err());
}

#[test]
fn test_create_provider_names() {
    assert_eq!(create_provider(ProviderKind::Local).unwrap().name(), "local");
    assert_eq!(
        create_provider(ProviderKind::Synthetic).unwrap().name(),
        "synthetic"
    );
}

#[test]
fn test_example_config_matches_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("bloomwatch.example.toml");
    let config = EngineConfig::from_file(path).unwrap();
    assert_eq!(config, EngineConfig::default());
}
