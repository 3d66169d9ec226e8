//! Error types for recording validation and migration
//!
//! Every variant renders a human-readable reason through `Display`. A
//! suggested recovery action, where one exists, is kept separate in
//! [`RecordingError::recovery`] so callers can present it on its own.

use crate::classifier::Generation;
use prec_common::Version;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for bundle operations
pub type Result<T> = std::result::Result<T, RecordingError>;

/// What a non-directory path turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file with a registered video extension
    VideoFile,
    /// Anything else that is not a directory
    Other,
}

/// Recording validation and migration errors
#[derive(Debug, Error)]
pub enum RecordingError {
    /// Path does not resolve to any filesystem entry
    #[error("Target at path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("{}", describe_non_directory(.path, .kind))]
    NotADirectory { path: PathBuf, kind: EntryKind },

    /// Neither canonical nor legacy metadata file in the directory
    #[error("There is no recording metadata file in the target directory: {}", .0.display())]
    MissingMetadataFile(PathBuf),

    /// Metadata file exists but cannot be read as a key/value table
    #[error("Failed reading {}: {detail}", .path.display())]
    MetadataUnreadable { path: PathBuf, detail: String },

    /// A key mandatory for the declared schema is absent or empty
    #[error("Recording metadata does not have \"{0}\"")]
    MissingMandatoryKey(String),

    /// Directory contains no file with a video extension
    #[error("Target directory does not contain any video files: {}", .0.display())]
    NoVideoFilesFound(PathBuf),

    /// Declared version is at or above the supported ceiling
    #[error(
        "This version does not support {generation} recordings with version >= {ceiling}. Got {detected}."
    )]
    UnsupportedFutureVersion {
        generation: Generation,
        detected: Version,
        ceiling: Version,
    },

    /// A field value failed to parse or is out of range
    #[error("Malformed value for \"{field}\": {detail}")]
    MalformedFieldValue { field: String, detail: String },

    /// Attempt to save over a metadata file with a newer schema version
    #[error(
        "Refusing to overwrite {} (schema {existing}) with older schema {writing}",
        .path.display()
    )]
    SchemaVersionConflict {
        path: PathBuf,
        existing: Version,
        writing: Version,
    },

    /// File filter key not known to the classifier
    #[error("Unknown file filter key: {0:?}")]
    UnknownFilterKey(String),

    /// Two files would be renamed to the same target
    #[error(
        "Migration would rename both {} and {} to {}",
        .first.display(),
        .second.display(),
        .target.display()
    )]
    RenameConflict {
        first: PathBuf,
        second: PathBuf,
        target: PathBuf,
    },

    /// Timestamp file whose size or header does not match its encoding
    #[error("Corrupt timestamp file {}: {detail}", .path.display())]
    CorruptTimestamps { path: PathBuf, detail: String },

    /// Interruption marker left by an earlier migration run
    #[error("A previous migration of {} did not complete", .0.display())]
    MigrationInterrupted(PathBuf),

    /// Filesystem operation failed on a specific path
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_non_directory(path: &Path, kind: &EntryKind) -> String {
    match kind {
        EntryKind::VideoFile => format!(
            "The provided path is a video, not a recording directory: {}",
            path.display()
        ),
        EntryKind::Other => format!("Target at path is not a directory: {}", path.display()),
    }
}

impl RecordingError {
    /// Human-readable reason (same text as `Display`)
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Suggested recovery action, if any
    pub fn recovery(&self) -> Option<&'static str> {
        match self {
            RecordingError::NotADirectory {
                kind: EntryKind::VideoFile,
                ..
            } => Some("Please provide a recording directory"),
            RecordingError::MissingMetadataFile(_) => {
                Some("Make sure the directory contains info.player.json or info.csv")
            }
            RecordingError::UnsupportedFutureVersion { .. }
            | RecordingError::SchemaVersionConflict { .. } => {
                Some("Please update to a newer version of this tool")
            }
            RecordingError::UnknownFilterKey(_) => Some(
                "Use one of: world, eye0, eye1, video, raw-time, timestamps, lookup, core, mobile, pi",
            ),
            RecordingError::RenameConflict { .. } => {
                Some("Remove or rename the duplicate file before migrating")
            }
            RecordingError::MigrationInterrupted(_) => Some(
                "Restore the recording from a backup, or check the remaining legacy files and \
                 delete .migration_in_progress once the recording is consistent",
            ),
            _ => None,
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        RecordingError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed(field: &str, detail: impl Into<String>) -> Self {
        RecordingError::MalformedFieldValue {
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}

/// Attach the failing path to an `io::Result`
pub(crate) trait IoResultExt<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| RecordingError::io(path, e))
    }
}
