//! Canonical metadata derived from a legacy `info.csv`

use crate::error::{RecordingError, Result};
use crate::info_file::RecordingInfoFile;
use crate::legacy_info::{keys, LegacyInfo};
use crate::recording::DEFAULT_CAPTURE_SOFTWARE;
use std::path::Path;
use uuid::Uuid;

/// Recording name used when the legacy table has none: the directory name
pub fn default_recording_name(rec_dir: &Path) -> String {
    rec_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Unnamed Recording".to_string())
}

/// System description of the migrating host
pub fn default_system_info() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    format!(
        "User: {}, Platform: {}, Arch: {}",
        user,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Build and validate a canonical record from legacy metadata
///
/// Nothing is written; the returned record is ready to save.
pub fn info_from_legacy(rec_dir: &Path, legacy: &LegacyInfo) -> Result<RecordingInfoFile> {
    let mut info = RecordingInfoFile::create_empty(rec_dir);

    let uuid = match legacy.get(keys::RECORDING_UUID) {
        Some(raw) => Uuid::parse_str(raw)
            .map_err(|e| RecordingError::malformed(keys::RECORDING_UUID, e.to_string()))?,
        None => Uuid::new_v4(),
    };
    info.set_recording_uuid(uuid);

    info.set_start_time_system_s(legacy.require_f64(keys::START_TIME_SYSTEM)?)?;
    info.set_start_time_synced_s(legacy.require_f64(keys::START_TIME_SYNCED)?)?;
    info.set_duration_s(legacy.require_f64(keys::DURATION_TIME)?)?;
    info.set_recording_software_name(
        legacy
            .get(keys::CAPTURE_SOFTWARE)
            .unwrap_or(DEFAULT_CAPTURE_SOFTWARE),
    )?;
    info.set_recording_software_version(legacy.require_version(keys::CAPTURE_SOFTWARE_VERSION)?);
    info.set_recording_name(
        legacy
            .get(keys::RECORDING_NAME)
            .map(str::to_owned)
            .unwrap_or_else(|| default_recording_name(rec_dir)),
    )?;
    info.set_system_info(
        legacy
            .get(keys::SYSTEM_INFO)
            .map(str::to_owned)
            .unwrap_or_else(default_system_info),
    )?;

    info.validate()?;
    Ok(info)
}
