//! Canonical recording metadata (`info.player.json`)
//!
//! The canonical metadata file is a flat JSON object. `meta_version` declares
//! the schema version; the remaining recognized keys are mandatory for every
//! 2.x schema:
//!
//! | key | type |
//! |---|---|
//! | `recording_uuid` | UUID string |
//! | `start_time_system_s` | number, seconds since the Unix epoch |
//! | `start_time_synced_s` | number, seconds on the synced clock |
//! | `duration_s` | number, seconds |
//! | `recording_software_name` | string |
//! | `recording_software_version` | version string |
//! | `recording_name` | string |
//! | `system_info` | string |
//!
//! Unknown keys written by newer software are kept and written back on save.
//!
//! # Write-time validation
//!
//! Setters reject malformed values immediately, so an instance never holds
//! an invalid field. [`RecordingInfoFile::validate`] then only has to check
//! completeness and cross-field consistency.

use crate::error::{IoResultExt, RecordingError, Result};
use chrono::{DateTime, Utc};
use prec_common::fs_utils::atomic_write;
use prec_common::Version;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Fixed name of the canonical metadata file
pub const INFO_FILE: &str = "info.player.json";

/// Schema version written by this crate
pub const CURRENT_SCHEMA_VERSION: Version = Version::new(2, 0, 0);

/// First schema version this crate does not understand
pub const NEXT_UNSUPPORTED_SCHEMA_VERSION: Version = Version::new(3, 0, 0);

/// Keys of the canonical metadata object
pub mod keys {
    pub const META_VERSION: &str = "meta_version";
    pub const RECORDING_UUID: &str = "recording_uuid";
    pub const START_TIME_SYSTEM_S: &str = "start_time_system_s";
    pub const START_TIME_SYNCED_S: &str = "start_time_synced_s";
    pub const DURATION_S: &str = "duration_s";
    pub const RECORDING_SOFTWARE_NAME: &str = "recording_software_name";
    pub const RECORDING_SOFTWARE_VERSION: &str = "recording_software_version";
    pub const RECORDING_NAME: &str = "recording_name";
    pub const SYSTEM_INFO: &str = "system_info";
}

const V2_MANDATORY_KEYS: &[&str] = &[
    keys::RECORDING_UUID,
    keys::START_TIME_SYSTEM_S,
    keys::START_TIME_SYNCED_S,
    keys::DURATION_S,
    keys::RECORDING_SOFTWARE_NAME,
    keys::RECORDING_SOFTWARE_VERSION,
    keys::RECORDING_NAME,
    keys::SYSTEM_INFO,
];

/// Keys (besides `meta_version`) that must be present for `version`
///
/// Schemas newer than 2.x are read with the 2.x requirements; their extra
/// keys are tolerated as unknown keys.
pub fn mandatory_keys(version: Version) -> &'static [&'static str] {
    match version.major {
        0 | 1 => &[keys::RECORDING_NAME],
        _ => V2_MANDATORY_KEYS,
    }
}

/// Path of the canonical metadata file inside `rec_dir`
pub fn info_path(rec_dir: &Path) -> PathBuf {
    rec_dir.join(INFO_FILE)
}

/// Versioned canonical metadata record
///
/// Serializes to the on-disk object: unset fields are omitted and unknown
/// keys are written alongside the recognized ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingInfoFile {
    #[serde(skip)]
    rec_dir: PathBuf,
    meta_version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_uuid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time_system_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time_synced_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_software_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_software_version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_info: Option<String>,
    /// Keys this crate does not recognize, never one of [`keys`]
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl RecordingInfoFile {
    /// New record for `rec_dir` at the current schema version, every field unset
    pub fn create_empty(rec_dir: &Path) -> Self {
        Self {
            rec_dir: rec_dir.to_path_buf(),
            meta_version: CURRENT_SCHEMA_VERSION,
            recording_uuid: None,
            start_time_system_s: None,
            start_time_synced_s: None,
            duration_s: None,
            recording_software_name: None,
            recording_software_version: None,
            recording_name: None,
            system_info: None,
            extra: Map::new(),
        }
    }

    /// True if `rec_dir` contains a canonical metadata file
    pub fn exists(rec_dir: &Path) -> bool {
        info_path(rec_dir).is_file()
    }

    /// Read the canonical metadata file of `rec_dir`
    pub fn read(rec_dir: &Path) -> Result<Self> {
        Self::from_object(rec_dir, read_object(&info_path(rec_dir))?)
    }

    /// Schema version declared by the canonical file of `rec_dir`
    ///
    /// Only `meta_version` is checked, so files of unsupported future
    /// schemas can still be identified.
    pub fn declared_schema_version(rec_dir: &Path) -> Result<Version> {
        parse_meta_version(read_object(&info_path(rec_dir))?.get(keys::META_VERSION))
    }

    /// Build a record from a parsed JSON object
    pub fn from_object(rec_dir: &Path, mut object: Map<String, Value>) -> Result<Self> {
        let meta_version = parse_meta_version(object.remove(keys::META_VERSION).as_ref())?;

        for key in mandatory_keys(meta_version) {
            match object.get(*key) {
                None | Some(Value::Null) => {
                    return Err(RecordingError::MissingMandatoryKey(key.to_string()))
                }
                Some(Value::String(s)) if s.trim().is_empty() => {
                    return Err(RecordingError::MissingMandatoryKey(key.to_string()))
                }
                _ => {}
            }
        }

        let mut info = Self::create_empty(rec_dir);
        info.meta_version = meta_version;

        if let Some(value) = object.remove(keys::RECORDING_UUID) {
            let raw = expect_str(keys::RECORDING_UUID, &value)?;
            let uuid = Uuid::parse_str(raw)
                .map_err(|e| RecordingError::malformed(keys::RECORDING_UUID, e.to_string()))?;
            info.set_recording_uuid(uuid);
        }
        if let Some(value) = object.remove(keys::START_TIME_SYSTEM_S) {
            info.set_start_time_system_s(expect_f64(keys::START_TIME_SYSTEM_S, &value)?)?;
        }
        if let Some(value) = object.remove(keys::START_TIME_SYNCED_S) {
            info.set_start_time_synced_s(expect_f64(keys::START_TIME_SYNCED_S, &value)?)?;
        }
        if let Some(value) = object.remove(keys::DURATION_S) {
            info.set_duration_s(expect_f64(keys::DURATION_S, &value)?)?;
        }
        if let Some(value) = object.remove(keys::RECORDING_SOFTWARE_NAME) {
            info.set_recording_software_name(expect_str(keys::RECORDING_SOFTWARE_NAME, &value)?)?;
        }
        if let Some(value) = object.remove(keys::RECORDING_SOFTWARE_VERSION) {
            let raw = expect_str(keys::RECORDING_SOFTWARE_VERSION, &value)?;
            let version = Version::parse(raw).map_err(|e| {
                RecordingError::malformed(keys::RECORDING_SOFTWARE_VERSION, e.to_string())
            })?;
            info.set_recording_software_version(version);
        }
        if let Some(value) = object.remove(keys::RECORDING_NAME) {
            info.set_recording_name(expect_str(keys::RECORDING_NAME, &value)?)?;
        }
        if let Some(value) = object.remove(keys::SYSTEM_INFO) {
            info.set_system_info(expect_str(keys::SYSTEM_INFO, &value)?)?;
        }

        if !object.is_empty() {
            debug!(
                "Keeping {} unknown metadata key(s): {:?}",
                object.len(),
                object.keys().collect::<Vec<_>>()
            );
        }
        info.extra = object;

        Ok(info)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn rec_dir(&self) -> &Path {
        &self.rec_dir
    }

    /// Path this record is saved to
    pub fn path(&self) -> PathBuf {
        info_path(&self.rec_dir)
    }

    pub fn meta_version(&self) -> Version {
        self.meta_version
    }

    pub fn recording_uuid(&self) -> Option<Uuid> {
        self.recording_uuid
    }

    pub fn start_time_system_s(&self) -> Option<f64> {
        self.start_time_system_s
    }

    pub fn start_time_synced_s(&self) -> Option<f64> {
        self.start_time_synced_s
    }

    pub fn duration_s(&self) -> Option<f64> {
        self.duration_s
    }

    pub fn recording_software_name(&self) -> Option<&str> {
        self.recording_software_name.as_deref()
    }

    pub fn recording_software_version(&self) -> Option<Version> {
        self.recording_software_version
    }

    pub fn recording_name(&self) -> Option<&str> {
        self.recording_name.as_deref()
    }

    pub fn system_info(&self) -> Option<&str> {
        self.system_info.as_deref()
    }

    /// Keys not recognized by this schema, preserved verbatim
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// System start time as a UTC timestamp
    pub fn start_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = self.start_time_system_s?;
        DateTime::<Utc>::from_timestamp_millis((secs * 1000.0).round() as i64)
    }

    // ------------------------------------------------------------------
    // Validating setters
    // ------------------------------------------------------------------

    pub fn set_recording_uuid(&mut self, uuid: Uuid) {
        self.recording_uuid = Some(uuid);
    }

    /// # Validation
    /// - Must be finite and not before the Unix epoch
    pub fn set_start_time_system_s(&mut self, value: f64) -> Result<()> {
        check_finite(keys::START_TIME_SYSTEM_S, value)?;
        if value < 0.0 {
            return Err(RecordingError::malformed(
                keys::START_TIME_SYSTEM_S,
                format!("{} is before the Unix epoch", value),
            ));
        }
        self.start_time_system_s = Some(value);
        Ok(())
    }

    /// # Validation
    /// - Must be finite (the synced clock has an arbitrary epoch)
    pub fn set_start_time_synced_s(&mut self, value: f64) -> Result<()> {
        check_finite(keys::START_TIME_SYNCED_S, value)?;
        self.start_time_synced_s = Some(value);
        Ok(())
    }

    /// # Validation
    /// - Must be finite and non-negative
    pub fn set_duration_s(&mut self, value: f64) -> Result<()> {
        check_finite(keys::DURATION_S, value)?;
        if value < 0.0 {
            return Err(RecordingError::malformed(
                keys::DURATION_S,
                format!("duration {} is negative", value),
            ));
        }
        self.duration_s = Some(value);
        Ok(())
    }

    pub fn set_recording_software_name(&mut self, value: impl Into<String>) -> Result<()> {
        self.recording_software_name =
            Some(non_empty(keys::RECORDING_SOFTWARE_NAME, value.into())?);
        Ok(())
    }

    pub fn set_recording_software_version(&mut self, version: Version) {
        self.recording_software_version = Some(version);
    }

    pub fn set_recording_name(&mut self, value: impl Into<String>) -> Result<()> {
        self.recording_name = Some(non_empty(keys::RECORDING_NAME, value.into())?);
        Ok(())
    }

    pub fn set_system_info(&mut self, value: impl Into<String>) -> Result<()> {
        self.system_info = Some(non_empty(keys::SYSTEM_INFO, value.into())?);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation and persistence
    // ------------------------------------------------------------------

    /// Check completeness and consistency for the declared schema version
    pub fn validate(&self) -> Result<()> {
        for key in mandatory_keys(self.meta_version) {
            if !self.is_set(key) {
                return Err(RecordingError::MissingMandatoryKey(key.to_string()));
            }
        }

        // Both clocks are needed to map synced timestamps back to wall time
        if self.start_time_system_s.is_some() != self.start_time_synced_s.is_some() {
            let missing = if self.start_time_system_s.is_none() {
                keys::START_TIME_SYSTEM_S
            } else {
                keys::START_TIME_SYNCED_S
            };
            return Err(RecordingError::MissingMandatoryKey(missing.to_string()));
        }

        if let Some(duration) = self.duration_s {
            if !duration.is_finite() || duration < 0.0 {
                return Err(RecordingError::malformed(
                    keys::DURATION_S,
                    format!("duration {} is negative", duration),
                ));
            }
        }

        Ok(())
    }

    fn is_set(&self, key: &str) -> bool {
        match key {
            keys::RECORDING_UUID => self.recording_uuid.is_some(),
            keys::START_TIME_SYSTEM_S => self.start_time_system_s.is_some(),
            keys::START_TIME_SYNCED_S => self.start_time_synced_s.is_some(),
            keys::DURATION_S => self.duration_s.is_some(),
            keys::RECORDING_SOFTWARE_NAME => self.recording_software_name.is_some(),
            keys::RECORDING_SOFTWARE_VERSION => self.recording_software_version.is_some(),
            keys::RECORDING_NAME => self.recording_name.is_some(),
            keys::SYSTEM_INFO => self.system_info.is_some(),
            _ => self.extra.contains_key(key),
        }
    }

    /// JSON object as written to disk
    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| RecordingError::malformed(keys::META_VERSION, e.to_string()))
    }

    /// Validate and write to `info.player.json`
    ///
    /// Refuses to replace an existing file that declares a newer schema
    /// version than this record.
    pub fn save(&self) -> Result<()> {
        self.validate()?;

        let path = self.path();
        if let Some(existing) = existing_schema_version(&path)? {
            if existing > self.meta_version {
                return Err(RecordingError::SchemaVersionConflict {
                    path,
                    existing,
                    writing: self.meta_version,
                });
            }
        }

        let mut content = serde_json::to_vec_pretty(self)
            .map_err(|e| RecordingError::malformed(keys::META_VERSION, e.to_string()))?;
        content.push(b'\n');
        atomic_write(&path, &content).at_path(&path)?;

        debug!("Saved {} (schema {})", path.display(), self.meta_version);
        Ok(())
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let bytes = std::fs::read(path).at_path(path)?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| RecordingError::MetadataUnreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(RecordingError::MetadataUnreadable {
            path: path.to_path_buf(),
            detail: "top-level value is not an object".to_string(),
        }),
    }
}

fn parse_meta_version(value: Option<&Value>) -> Result<Version> {
    match value {
        Some(Value::String(raw)) => Version::parse(raw)
            .map_err(|e| RecordingError::malformed(keys::META_VERSION, e.to_string())),
        Some(other) => Err(RecordingError::malformed(
            keys::META_VERSION,
            format!("expected a version string, got {}", other),
        )),
        None => Err(RecordingError::MissingMandatoryKey(keys::META_VERSION.to_string())),
    }
}

/// Schema version declared by an existing file, if one can be read
fn existing_schema_version(path: &Path) -> Result<Option<Version>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path).at_path(path)?;
    let declared = serde_json::from_slice::<Value>(&bytes)
        .ok()
        .and_then(|v| v.get(keys::META_VERSION).and_then(Value::as_str).map(str::to_owned))
        .and_then(|raw| Version::parse(&raw).ok());
    if declared.is_none() {
        warn!(
            "Existing {} has no readable {}; it will be replaced",
            path.display(),
            keys::META_VERSION
        );
    }
    Ok(declared)
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| RecordingError::malformed(key, format!("expected a string, got {}", value)))
}

fn expect_f64(key: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| RecordingError::malformed(key, format!("expected a number, got {}", value)))
}

fn check_finite(key: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RecordingError::malformed(key, format!("{} is not a finite number", value)))
    }
}

fn non_empty(key: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        Err(RecordingError::malformed(key, "value is empty"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn complete(dir: &Path) -> RecordingInfoFile {
        let mut info = RecordingInfoFile::create_empty(dir);
        info.set_recording_uuid(Uuid::new_v4());
        info.set_start_time_system_s(1_556_000_000.25).unwrap();
        info.set_start_time_synced_s(5.0).unwrap();
        info.set_duration_s(60.0).unwrap();
        info.set_recording_software_name("Pupil Mobile").unwrap();
        info.set_recording_software_version(Version::new(1, 0, 0));
        info.set_recording_name("Test").unwrap();
        info.set_system_info("Platform: linux").unwrap();
        info
    }

    #[test]
    fn test_create_empty_is_unset_at_current_version() {
        let info = RecordingInfoFile::create_empty(Path::new("/rec"));
        assert_eq!(info.meta_version(), CURRENT_SCHEMA_VERSION);
        assert!(info.recording_name().is_none());
        assert!(info.duration_s().is_none());
        assert!(matches!(info.validate(), Err(RecordingError::MissingMandatoryKey(_))));
    }

    #[test]
    fn test_setters_reject_at_write_time() {
        let mut info = RecordingInfoFile::create_empty(Path::new("/rec"));
        assert!(info.set_duration_s(-1.0).is_err());
        assert!(info.set_duration_s(f64::NAN).is_err());
        assert!(info.set_start_time_system_s(-10.0).is_err());
        assert!(info.set_start_time_synced_s(f64::INFINITY).is_err());
        assert!(info.set_recording_name("   ").is_err());
        // rejected values leave the field untouched
        assert!(info.duration_s().is_none());
        // the synced clock may be negative
        assert!(info.set_start_time_synced_s(-3.5).is_ok());
    }

    #[test]
    fn test_validate_reports_first_missing_key() {
        let dir = Path::new("/rec");
        let mut info = complete(dir);
        assert!(info.validate().is_ok());

        info.system_info = None;
        match info.validate() {
            Err(RecordingError::MissingMandatoryKey(key)) => assert_eq!(key, keys::SYSTEM_INFO),
            other => panic!("expected MissingMandatoryKey, got {:?}", other),
        }
    }

    #[test]
    fn test_save_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let info = complete(dir.path());

        info.save().unwrap();
        let back = RecordingInfoFile::read(dir.path()).unwrap();

        assert_eq!(back, info);
        assert_eq!(back.duration_s(), Some(60.0));
        assert_eq!(back.start_time_system_s(), Some(1_556_000_000.25));
    }

    #[test]
    fn test_json_omits_unset_fields() {
        let dir = TempDir::new().unwrap();
        let object = RecordingInfoFile::create_empty(dir.path()).to_json().unwrap();
        assert_eq!(object, json!({ "meta_version": "2.0.0" }));

        let full = complete(dir.path()).to_json().unwrap();
        assert_eq!(full.as_object().unwrap().len(), 1 + V2_MANDATORY_KEYS.len());
        assert!(full.get("rec_dir").is_none());
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let dir = TempDir::new().unwrap();
        let mut object = complete(dir.path()).to_json().unwrap();
        object["min_player_version"] = json!("2.0");
        std::fs::write(info_path(dir.path()), object.to_string()).unwrap();

        let info = RecordingInfoFile::read(dir.path()).unwrap();
        assert_eq!(info.extra().get("min_player_version"), Some(&json!("2.0")));

        info.save().unwrap();
        let raw: Value =
            serde_json::from_slice(&std::fs::read(info_path(dir.path())).unwrap()).unwrap();
        assert_eq!(raw["min_player_version"], json!("2.0"));
    }

    #[test]
    fn test_read_fails_on_missing_mandatory_key() {
        let dir = TempDir::new().unwrap();
        let mut object = complete(dir.path()).to_json().unwrap();
        object.as_object_mut().unwrap().remove(keys::DURATION_S);
        std::fs::write(info_path(dir.path()), object.to_string()).unwrap();

        match RecordingInfoFile::read(dir.path()) {
            Err(RecordingError::MissingMandatoryKey(key)) => assert_eq!(key, keys::DURATION_S),
            other => panic!("expected MissingMandatoryKey, got {:?}", other),
        }
    }

    #[test]
    fn test_read_fails_on_wrong_numeric_type() {
        let dir = TempDir::new().unwrap();
        let mut object = complete(dir.path()).to_json().unwrap();
        object[keys::DURATION_S] = json!("sixty");
        std::fs::write(info_path(dir.path()), object.to_string()).unwrap();

        match RecordingInfoFile::read(dir.path()) {
            Err(RecordingError::MalformedFieldValue { field, .. }) => {
                assert_eq!(field, keys::DURATION_S)
            }
            other => panic!("expected MalformedFieldValue, got {:?}", other),
        }
    }

    #[test]
    fn test_read_non_object_is_unreadable() {
        let dir = TempDir::new().unwrap();
        std::fs::write(info_path(dir.path()), "[1, 2]").unwrap();
        assert!(matches!(
            RecordingInfoFile::read(dir.path()),
            Err(RecordingError::MetadataUnreadable { .. })
        ));
    }

    #[test]
    fn test_save_refuses_to_overwrite_newer_schema() {
        let dir = TempDir::new().unwrap();
        let mut object = complete(dir.path()).to_json().unwrap();
        object[keys::META_VERSION] = json!("2.5");
        std::fs::write(info_path(dir.path()), object.to_string()).unwrap();

        let info = complete(dir.path());
        match info.save() {
            Err(RecordingError::SchemaVersionConflict { existing, writing, .. }) => {
                assert_eq!(existing, Version::new(2, 5, 0));
                assert_eq!(writing, CURRENT_SCHEMA_VERSION);
            }
            other => panic!("expected SchemaVersionConflict, got {:?}", other),
        }
        // file untouched
        let raw: Value =
            serde_json::from_slice(&std::fs::read(info_path(dir.path())).unwrap()).unwrap();
        assert_eq!(raw[keys::META_VERSION], json!("2.5"));
    }

    #[test]
    fn test_save_invalid_record_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let info = RecordingInfoFile::create_empty(dir.path());
        assert!(info.save().is_err());
        assert!(!RecordingInfoFile::exists(dir.path()));
    }

    #[test]
    fn test_declared_schema_version_ignores_other_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(info_path(dir.path()), r#"{"meta_version": "3.1"}"#).unwrap();
        assert_eq!(
            RecordingInfoFile::declared_schema_version(dir.path()).unwrap(),
            Version::new(3, 1, 0)
        );
        assert!(RecordingInfoFile::read(dir.path()).is_err());
    }

    #[test]
    fn test_start_datetime() {
        let mut info = RecordingInfoFile::create_empty(Path::new("/rec"));
        info.set_start_time_system_s(0.0).unwrap();
        assert_eq!(info.start_datetime().unwrap().timestamp(), 0);
    }
}
