//! End-to-end migration tests on temporary recording directories
//!
//! Covers:
//! - Mobile bundle migrated to canonical names and metadata
//! - Version gate rejection leaves every file untouched
//! - Second run is a no-op
//! - Invisible bundle with multi-part files and nanosecond raw times
//! - Rename collisions fail before any mutation
//! - A write failure partway through leaves a bundle that is not canonical

use prec_bundle::info_file::{RecordingInfoFile, CURRENT_SCHEMA_VERSION};
use prec_bundle::migration::MIGRATION_MARKER;
use prec_bundle::timestamps::read_timestamps;
use prec_bundle::{
    Generation, MigrationOutcome, Migrator, Recording, RecordingError, RecordingMeta, Role,
};
use prec_common::config::MigrationConfig;
use prec_common::Version;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MOBILE_INFO: &str = "key,value\n\
                           Recording Name,\"Test\"\n\
                           Data Format Version,1.0\n\
                           Start Time (System),10.0\n\
                           Start Time (Synced),5.0\n\
                           Duration Time,60.0\n\
                           Capture Software,\"Pupil Mobile\"\n\
                           Capture Software Version,1.0\n";

fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn be_seconds(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn mobile_bundle() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("info.csv"), MOBILE_INFO).unwrap();
    fs::write(dir.path().join("Pupil Cam1 ID2_part1.mp4"), b"video").unwrap();
    fs::write(dir.path().join("Pupil Cam1 ID2_part1.time"), be_seconds(&[5.0, 5.033])).unwrap();
    fs::write(dir.path().join("Pupil Cam2 ID0.mp4"), b"video").unwrap();
    dir
}

#[test]
fn test_mobile_bundle_migrates_to_canonical() {
    let dir = mobile_bundle();

    let outcome = Migrator::default().migrate(dir.path()).unwrap();
    let MigrationOutcome::Migrated(report) = outcome else {
        panic!("expected a migration, got {:?}", outcome);
    };
    assert_eq!(report.generation, Generation::Mobile);
    assert_eq!(report.source_version, Version::new(1, 0, 0));
    assert_eq!(report.target_version, CURRENT_SCHEMA_VERSION);

    let names = file_names(dir.path());
    for expected in [
        "world_part1.mp4",
        "world_part1.time",
        "world_part1_timestamps.npy",
        "eye0.mp4",
        "info.mobile.csv",
        "info.player.json",
    ] {
        assert!(names.contains(expected), "missing {} in {:?}", expected, names);
    }
    assert!(!names.contains("info.csv"));
    assert!(!names.contains("Pupil Cam1 ID2_part1.mp4"));
    assert!(!names.contains(MIGRATION_MARKER));

    let info = RecordingInfoFile::read(dir.path()).unwrap();
    assert_eq!(info.duration_s(), Some(60.0));
    assert_eq!(info.recording_name(), Some("Test"));
    assert_eq!(info.recording_software_name(), Some("Pupil Mobile"));

    let ts = read_timestamps(&dir.path().join("world_part1_timestamps.npy")).unwrap();
    assert_eq!(ts, vec![5.0, 5.033]);

    // Legacy metadata preserved byte-for-byte
    assert_eq!(fs::read_to_string(dir.path().join("info.mobile.csv")).unwrap(), MOBILE_INFO);
}

#[test]
fn test_migrated_bundle_validates_as_canonical() {
    let dir = mobile_bundle();
    Migrator::default().migrate(dir.path()).unwrap();

    let rec = Recording::load(dir.path()).unwrap();
    assert!(matches!(rec.meta(), RecordingMeta::Canonical(_)));
    assert!(rec.is_pupil_mobile());

    let world = rec.files().unwrap().world().videos();
    assert_eq!(world.len(), 1);
    assert!(world.paths()[0].ends_with("world_part1.mp4"));
}

#[test]
fn test_version_at_ceiling_rejected_without_changes() {
    let dir = mobile_bundle();
    let info = MOBILE_INFO.replace("Data Format Version,1.0", "Data Format Version,2.0");
    fs::write(dir.path().join("info.csv"), &info).unwrap();
    let before = file_names(dir.path());

    match Migrator::default().migrate(dir.path()) {
        Err(RecordingError::UnsupportedFutureVersion {
            generation,
            detected,
            ceiling,
        }) => {
            assert_eq!(generation, Generation::Mobile);
            assert_eq!(detected, Version::new(2, 0, 0));
            assert_eq!(ceiling, Version::new(1, 3, 0));
        }
        other => panic!("expected UnsupportedFutureVersion, got {:?}", other),
    }

    assert_eq!(file_names(dir.path()), before);
    assert_eq!(fs::read_to_string(dir.path().join("info.csv")).unwrap(), info);
}

#[test]
fn test_configured_ceiling_is_honored() {
    let dir = mobile_bundle();
    let config = MigrationConfig {
        mobile_ceiling: Version::new(1, 0, 0),
        ..MigrationConfig::default()
    };
    assert!(matches!(
        Migrator::new(config).migrate(dir.path()),
        Err(RecordingError::UnsupportedFutureVersion { .. })
    ));
}

#[test]
fn test_second_migration_is_noop() {
    let dir = mobile_bundle();
    let migrator = Migrator::default();
    migrator.migrate(dir.path()).unwrap();
    let after_first = file_names(dir.path());
    let metadata_first = fs::read(dir.path().join("info.player.json")).unwrap();

    let outcome = migrator.migrate(dir.path()).unwrap();
    assert_eq!(
        outcome,
        MigrationOutcome::AlreadyCanonical {
            version: CURRENT_SCHEMA_VERSION
        }
    );
    assert_eq!(file_names(dir.path()), after_first);
    assert_eq!(fs::read(dir.path().join("info.player.json")).unwrap(), metadata_first);
}

#[test]
fn test_invisible_bundle_with_parts() {
    let dir = TempDir::new().unwrap();
    let info = "Recording Name: \"walk\"\n\
                Data Format Version: 1.2\n\
                Start Time (System): 1600000000.0\n\
                Start Time (Synced): 1600000000000000000\n\
                Duration Time: 4.0\n\
                Capture Software: \"Pupil Invisible\"\n\
                Capture Software Version: 1.2.3\n\
                Recording UUID: 0d6f0c8e-9a1d-4c3b-8f57-3c2e3b9f2a10\n";
    fs::write(dir.path().join("info.csv"), info).unwrap();
    fs::write(dir.path().join("PI world v1 ps1.mp4"), b"").unwrap();
    fs::write(dir.path().join("PI world v1 ps2.mp4"), b"").unwrap();
    fs::write(dir.path().join("PI left v1 ps1.mp4"), b"").unwrap();
    let nanos: Vec<u8> = [2_000_000_000u64, 2_004_000_000]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    fs::write(dir.path().join("PI left v1 ps1.time"), nanos).unwrap();

    let MigrationOutcome::Migrated(report) = Migrator::default().migrate(dir.path()).unwrap() else {
        panic!("expected a migration");
    };
    assert_eq!(report.generation, Generation::Pi);
    assert_eq!(report.recording_uuid.to_string(), "0d6f0c8e-9a1d-4c3b-8f57-3c2e3b9f2a10");

    let names = file_names(dir.path());
    for expected in [
        "world.mp4",
        "world_001.mp4",
        "eye0.mp4",
        "eye0.time",
        "eye0_timestamps.npy",
        "info.pi.csv",
    ] {
        assert!(names.contains(expected), "missing {} in {:?}", expected, names);
    }

    let rec = Recording::load(dir.path()).unwrap();
    assert!(rec.is_pupil_invisible());
    assert_eq!(rec.load_timestamps(Role::Eye0).unwrap(), vec![2.0, 2.004]);
}

#[test]
fn test_rename_collision_fails_before_mutation() {
    let dir = mobile_bundle();
    fs::write(dir.path().join("Logitech Webcam C930e_part1.mp4"), b"").unwrap();
    let before = file_names(dir.path());

    assert!(matches!(
        Migrator::default().migrate(dir.path()),
        Err(RecordingError::RenameConflict { .. })
    ));
    assert_eq!(file_names(dir.path()), before);
}

#[test]
fn test_missing_capture_software_version_reported() {
    let dir = mobile_bundle();
    let info = MOBILE_INFO.replace("Capture Software Version,1.0\n", "");
    fs::write(dir.path().join("info.csv"), info).unwrap();

    match Migrator::default().migrate(dir.path()) {
        Err(RecordingError::MissingMandatoryKey(key)) => {
            assert_eq!(key, "Capture Software Version")
        }
        other => panic!("expected MissingMandatoryKey, got {:?}", other),
    }
    assert!(!dir.path().join("info.player.json").exists());
}

#[test]
fn test_leftover_marker_blocks_migration() {
    let dir = mobile_bundle();
    fs::write(dir.path().join(MIGRATION_MARKER), b"").unwrap();

    let err = Migrator::default().migrate(dir.path()).unwrap_err();
    assert!(matches!(err, RecordingError::MigrationInterrupted(_)));
    assert!(dir.path().join("Pupil Cam1 ID2_part1.mp4").exists());
}

#[test]
fn test_failure_after_renames_leaves_bundle_non_canonical() {
    let dir = mobile_bundle();
    // Occupy the temporary path of the first timestamp write
    fs::create_dir(dir.path().join("world_part1_timestamps.npy.tmp")).unwrap();

    match Migrator::default().migrate(dir.path()) {
        Err(RecordingError::Io { path, .. }) => {
            assert!(path.ends_with("world_part1_timestamps.npy"), "{}", path.display())
        }
        other => panic!("expected Io error, got {:?}", other),
    }

    // Renames already happened, canonical metadata was never written
    assert!(dir.path().join("world_part1.mp4").exists());
    assert!(!dir.path().join("info.player.json").exists());
    assert!(!dir.path().join("world_part1_timestamps.npy").exists());
    assert_eq!(fs::read_to_string(dir.path().join("info.csv")).unwrap(), MOBILE_INFO);
    assert!(dir.path().join(MIGRATION_MARKER).exists());

    assert!(matches!(
        Migrator::default().migrate(dir.path()),
        Err(RecordingError::MigrationInterrupted(_))
    ));
}
