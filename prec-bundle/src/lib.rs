//! prec-bundle library interface
//!
//! Validation, file classification and migration of eye-tracking recording
//! bundles written by three generations of capture software.
//!
//! - [`classifier`]: file roles from base names
//! - [`filter`]: chainable file queries over a recording directory
//! - [`recording`]: validated [`Recording`] handles
//! - [`info_file`] / [`legacy_info`]: canonical and legacy metadata
//! - [`timestamps`]: raw time and `.npy` timestamp codecs
//! - [`migration`]: in-place legacy-to-canonical migration

pub mod classifier;
pub mod error;
pub mod filter;
pub mod info_file;
pub mod legacy_info;
pub mod migration;
pub mod recording;
pub mod timestamps;

pub use crate::classifier::{ClassifiedFile, Generation, Role};
pub use crate::error::{EntryKind, RecordingError, Result};
pub use crate::filter::{FileFilter, FilterKey, FilterMode};
pub use crate::info_file::RecordingInfoFile;
pub use crate::migration::{MigrationOutcome, MigrationReport, Migrator};
pub use crate::recording::{Recording, RecordingMeta};
