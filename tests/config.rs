use std::fs;

use assert_matches::assert_matches;

use avhrr_metadata_parser::config::{Config, ConfigLoader, DEFAULT_CATALOGUE_URL};
use avhrr_metadata_parser::error::AvhrrError;

#[test]
fn defaults_without_config_file() {
    let config = ConfigLoader::resolve(None).unwrap();
    assert_eq!(config.catalogue_url, DEFAULT_CATALOGUE_URL);
    assert_eq!(config.catalogue_dir_name, "NOAA_sat_mtd");
    assert_eq!(config.metadata_files, ["catalogue.ief", "catalogue.iuf", "LEADER"]);
    assert_eq!(config.level_patterns.len(), 2);
}

#[test]
fn partial_json_keeps_remaining_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "catalogue_url": "https://mirror.example.org/noaa.tgz",
            "level_patterns": ["LVL[0-9]"]
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.catalogue_url, "https://mirror.example.org/noaa.tgz");
    assert_eq!(config.level_patterns.len(), 1);
    assert!(config.level_patterns[0].is_match("LVL2"));
    assert_eq!(config.archive_extensions, [".tar", ".tgz", ".tar.gz", ".zip"]);
    assert_eq!(config.product_markers, [".l1a", "IMAGE", ".dat"]);
}

#[test]
fn invalid_level_pattern_is_rejected() {
    let config = Config {
        level_patterns: Some(vec!["LEVEL [0-1".to_string()]),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(AvhrrError::InvalidPattern { pattern, .. }) if pattern == "LEVEL [0-1"
    );
}

#[test]
fn unreadable_or_broken_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("missing.json");
    assert_matches!(
        ConfigLoader::resolve(missing.to_str()),
        Err(AvhrrError::ConfigRead(path)) if path == missing
    );

    let broken = temp.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(broken.to_str()),
        Err(AvhrrError::ConfigParse(_))
    );
}
