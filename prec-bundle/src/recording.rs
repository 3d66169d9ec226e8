//! Validated recording directories
//!
//! [`Recording::load`] runs an ordered series of structural checks and only
//! hands out a [`Recording`] when all of them pass:
//!
//! 1. the path exists
//! 2. it is a directory
//! 3. it contains a metadata file (`info.player.json`, else `info.csv`)
//! 4. the metadata file parses
//! 5. the recording name is present
//! 6. at least one video file sits directly in the directory
//!
//! The first failing check determines the error. A `Recording` holds a
//! snapshot of the metadata; it changes only through [`Recording::reload`].
//!
//! Callers must not validate and migrate the same directory concurrently.

use crate::classifier::{is_video_name, Generation, Role};
use crate::error::{EntryKind, IoResultExt, RecordingError, Result};
use crate::filter::FileFilter;
use crate::info_file::{self, RecordingInfoFile};
use crate::legacy_info::{self, LegacyInfo};
use crate::timestamps::{read_timestamps, TIMESTAMPS_SUFFIX};
use prec_common::Version;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Capture software assumed when legacy metadata does not name one
pub const DEFAULT_CAPTURE_SOFTWARE: &str = "Pupil Capture";

/// Metadata loaded from a recording directory
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingMeta {
    /// Canonical `info.player.json`
    Canonical(RecordingInfoFile),
    /// Legacy `info.csv` table, not yet migrated
    Legacy(LegacyInfo),
}

impl RecordingMeta {
    pub fn is_canonical(&self) -> bool {
        matches!(self, RecordingMeta::Canonical(_))
    }

    pub fn recording_name(&self) -> Option<&str> {
        match self {
            RecordingMeta::Canonical(info) => info.recording_name(),
            RecordingMeta::Legacy(info) => info.get(legacy_info::keys::RECORDING_NAME),
        }
    }

    /// Name of the software that produced the recording
    pub fn capture_software(&self) -> &str {
        let name = match self {
            RecordingMeta::Canonical(info) => info.recording_software_name(),
            RecordingMeta::Legacy(info) => info.get(legacy_info::keys::CAPTURE_SOFTWARE),
        };
        name.unwrap_or(DEFAULT_CAPTURE_SOFTWARE)
    }

    /// Canonical schema version, or the legacy data format version when parseable
    pub fn schema_version(&self) -> Option<Version> {
        match self {
            RecordingMeta::Canonical(info) => Some(info.meta_version()),
            RecordingMeta::Legacy(info) => info
                .get(legacy_info::keys::DATA_FORMAT_VERSION)
                .and_then(|raw| Version::parse(raw).ok()),
        }
    }

    /// Generation of the producing software
    pub fn generation(&self) -> Generation {
        Generation::from_capture_software(Some(self.capture_software()))
    }

    /// File the metadata was read from
    pub fn path(&self) -> PathBuf {
        match self {
            RecordingMeta::Canonical(info) => info.path(),
            RecordingMeta::Legacy(info) => info.path().to_path_buf(),
        }
    }
}

/// A directory that passed validation, with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    rec_dir: PathBuf,
    meta: RecordingMeta,
}

impl Recording {
    /// Validate `path` and load its metadata
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let rec_dir = resolve_directory(path.as_ref())?;
        let meta = load_meta(&rec_dir)?;

        if FileFilter::new(&rec_dir)?.videos().is_empty() {
            return Err(RecordingError::NoVideoFilesFound(rec_dir));
        }

        debug!(
            "Loaded recording {} ({}, {})",
            rec_dir.display(),
            meta.capture_software(),
            if meta.is_canonical() { "canonical" } else { "legacy" }
        );
        Ok(Self { rec_dir, meta })
    }

    /// Re-run validation on the stored path
    ///
    /// On failure the current snapshot is kept and the error returned.
    pub fn reload(&mut self) -> Result<()> {
        let fresh = Self::load(&self.rec_dir)?;
        self.meta = fresh.meta;
        Ok(())
    }

    pub fn rec_dir(&self) -> &Path {
        &self.rec_dir
    }

    pub fn meta(&self) -> &RecordingMeta {
        &self.meta
    }

    pub fn capture_software(&self) -> &str {
        self.meta.capture_software()
    }

    pub fn is_pupil_mobile(&self) -> bool {
        self.meta.generation() == Generation::Mobile
    }

    pub fn is_pupil_invisible(&self) -> bool {
        self.meta.generation() == Generation::Pi
    }

    pub fn generation(&self) -> Generation {
        self.meta.generation()
    }

    /// Fresh query over the files currently in the directory
    pub fn files(&self) -> Result<FileFilter> {
        FileFilter::new(&self.rec_dir)
    }

    /// Read `<role>_timestamps.npy` for a camera stream
    pub fn load_timestamps(&self, role: Role) -> Result<Vec<f64>> {
        if !role.is_stream() {
            return Err(RecordingError::malformed(
                "role",
                format!("{} has no timestamps; use world, eye0 or eye1", role),
            ));
        }
        let path = self
            .rec_dir
            .join(format!("{}{}", role.as_str(), TIMESTAMPS_SUFFIX));
        read_timestamps(&path)
    }
}

/// Checks 1 and 2: existing entry, and a directory
pub(crate) fn resolve_directory(path: &Path) -> Result<PathBuf> {
    let resolved = match std::fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RecordingError::PathNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(RecordingError::io(path, e)),
    };

    let metadata = std::fs::metadata(&resolved).at_path(&resolved)?;
    if metadata.is_dir() {
        return Ok(resolved);
    }

    let is_video = metadata.is_file()
        && resolved
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_video_name);
    Err(RecordingError::NotADirectory {
        path: resolved,
        kind: if is_video {
            EntryKind::VideoFile
        } else {
            EntryKind::Other
        },
    })
}

/// Checks 3 to 5: metadata present, readable, named
fn load_meta(rec_dir: &Path) -> Result<RecordingMeta> {
    let canonical = info_file::info_path(rec_dir);
    let legacy = rec_dir.join(legacy_info::LEGACY_INFO_FILE);

    let meta = if canonical.exists() {
        ensure_regular_file(&canonical)?;
        RecordingMeta::Canonical(RecordingInfoFile::read(rec_dir)?)
    } else if legacy.exists() {
        ensure_regular_file(&legacy)?;
        RecordingMeta::Legacy(LegacyInfo::read(&legacy)?)
    } else {
        return Err(RecordingError::MissingMetadataFile(rec_dir.to_path_buf()));
    };

    if meta.recording_name().is_none() {
        let key = match meta {
            RecordingMeta::Canonical(_) => info_file::keys::RECORDING_NAME,
            RecordingMeta::Legacy(_) => legacy_info::keys::RECORDING_NAME,
        };
        return Err(RecordingError::MissingMandatoryKey(key.to_string()));
    }

    Ok(meta)
}

fn ensure_regular_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(RecordingError::MetadataUnreadable {
            path: path.to_path_buf(),
            detail: "not a regular file".to_string(),
        })
    }
}
