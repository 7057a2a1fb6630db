use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;

use glossary_browser::config::{ConfigLoader, ConfigOverrides};
use glossary_browser::domain::Theme;
use glossary_browser::error::GlossaryError;

#[test]
fn reads_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glossary.json");
    fs::write(
        &path,
        r#"{
            "base_url": "https://cdn.example.net/glossary",
            "data_version": "2026.01",
            "export_dir": "/tmp/exports",
            "page_size": 50,
            "request_timeout_secs": 5,
            "theme": "dark"
        }"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap();
    assert_eq!(resolved.base_url, "https://cdn.example.net/glossary");
    assert_eq!(resolved.data_version, "2026.01");
    assert_eq!(resolved.export_dir.as_str(), "/tmp/exports");
    assert_eq!(resolved.page_size, 50);
    assert_eq!(resolved.request_timeout, Some(Duration::from_secs(5)));
    assert_eq!(resolved.theme, Some(Theme::Dark));
}

#[test]
fn overrides_win_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glossary.json");
    fs::write(&path, r#"{"base_url": "https://a.example", "cache_dir": "/from/file"}"#).unwrap();

    let resolved = ConfigLoader::resolve(
        path.to_str(),
        ConfigOverrides {
            base_url: Some("https://b.example".to_string()),
            cache_dir: Some("/from/cli".to_string()),
            export_dir: Some("/out".to_string()),
        },
    )
    .unwrap();
    assert_eq!(resolved.base_url, "https://b.example");
    assert_eq!(resolved.cache_dir.unwrap().as_str(), "/from/cli");
    assert_eq!(resolved.export_dir.as_str(), "/out");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()),
        Err(GlossaryError::ConfigRead(_))
    );
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glossary.json");

    fs::write(&path, r#"{"page_size": 0}"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()),
        Err(GlossaryError::ConfigParse(_))
    );

    fs::write(&path, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()),
        Err(GlossaryError::ConfigParse(_))
    );
}
