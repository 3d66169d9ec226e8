//! Unit tests for TOML load/write utilities
//!
//! Covers atomic writes (temp + rename) and load/write round trips.

use prec_common::config::{
    load_toml_config, write_toml_config, LoggingConfig, MigrationConfig, TomlConfig,
};
use prec_common::Version;
use tempfile::TempDir;

fn sample_config() -> TomlConfig {
    TomlConfig {
        logging: LoggingConfig {
            level: "prec_bundle=debug,info".to_string(),
        },
        migration: MigrationConfig {
            mobile_ceiling: Version::new(1, 4, 0),
            ..MigrationConfig::default()
        },
    }
}

#[test]
fn test_atomic_write_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    assert!(target.exists());
    assert!(!temp_dir.path().join("config.toml.tmp").exists());
}

#[test]
fn test_written_config_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");

    write_toml_config(&sample_config(), &target).unwrap();
    let loaded = load_toml_config(&target).unwrap();

    assert_eq!(loaded, sample_config());
    let content = std::fs::read_to_string(&target).unwrap();
    assert!(content.contains("mobile_ceiling = \"1.4.0\""));
}

#[test]
fn test_overwrite_replaces_previous_content() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("config.toml");

    write_toml_config(&sample_config(), &target).unwrap();
    write_toml_config(&TomlConfig::default(), &target).unwrap();

    assert_eq!(load_toml_config(&target).unwrap(), TomlConfig::default());
}

#[test]
fn test_load_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = load_toml_config(&temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, prec_common::Error::Config(_)));
}
