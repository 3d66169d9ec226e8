//! Chainable queries over the files of a recording directory
//!
//! A [`FileFilter`] owns a working set of paths, initially every regular file
//! directly inside the directory, sorted by name. Each narrowing call consumes
//! the filter and returns one holding the smaller set, so queries read as a
//! chain:
//!
//! ```no_run
//! # use prec_bundle::filter::FileFilter;
//! # fn main() -> prec_bundle::Result<()> {
//! let eye_videos = FileFilter::new("/data/rec_001".as_ref())?.eyes().videos();
//! for path in eye_videos.paths() {
//!     println!("{}", path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Filtering only looks at base names; file contents are never opened.

use crate::classifier::{base_name, classify_path, matches_role, ClassifiedFile, Generation, Role};
use crate::error::{RecordingError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;
use walkdir::WalkDir;

/// One filter criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// Files matching any stream role under this generation
    Generation(Generation),
    /// Files satisfying this role under any generation
    Role(Role),
}

impl FilterKey {
    /// True if the base name `name` satisfies this key
    pub fn matches(&self, name: &str) -> bool {
        match self {
            FilterKey::Generation(generation) => Role::STREAMS
                .iter()
                .any(|role| matches_role(name, Some(*generation), *role)),
            FilterKey::Role(role) if role.is_stream() => Generation::ALL
                .iter()
                .any(|generation| matches_role(name, Some(*generation), *role)),
            FilterKey::Role(role) => matches_role(name, None, *role),
        }
    }
}

impl FromStr for FilterKey {
    type Err = RecordingError;

    fn from_str(s: &str) -> Result<Self> {
        let key = match s.trim() {
            "world" => FilterKey::Role(Role::World),
            "eye0" => FilterKey::Role(Role::Eye0),
            "eye1" => FilterKey::Role(Role::Eye1),
            "video" | "videos" => FilterKey::Role(Role::Video),
            "raw-time" | "rawtimes" => FilterKey::Role(Role::RawTime),
            "timestamps" => FilterKey::Role(Role::Timestamps),
            "lookup" => FilterKey::Role(Role::Lookup),
            "core" => FilterKey::Generation(Generation::Core),
            "mobile" => FilterKey::Generation(Generation::Mobile),
            "pi" => FilterKey::Generation(Generation::Pi),
            other => return Err(RecordingError::UnknownFilterKey(other.to_string())),
        };
        Ok(key)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::Generation(generation) => generation.fmt(f),
            FilterKey::Role(role) => role.fmt(f),
        }
    }
}

/// How [`FileFilter::filter_any_of`] combines per-key results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Keep files matching at least one key
    Union,
    /// Keep files matching every key
    Intersection,
}

/// Working set of files in one recording directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    rec_dir: PathBuf,
    paths: Vec<PathBuf>,
}

impl FileFilter {
    /// Enumerate regular files directly under `rec_dir`
    ///
    /// Subdirectories and symlinks are skipped. Entries that cannot be read
    /// are logged and skipped; an unreadable `rec_dir` is an error.
    pub fn new(rec_dir: &Path) -> Result<Self> {
        let walker = WalkDir::new(rec_dir)
            .follow_links(false)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        let mut paths = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        paths.push(entry.into_path());
                    }
                }
                Err(e) if e.depth() == 0 => {
                    let path = e.path().unwrap_or(rec_dir).to_path_buf();
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                    return Err(RecordingError::Io { path, source });
                }
                Err(e) => warn!("Skipping unreadable entry in {}: {}", rec_dir.display(), e),
            }
        }

        Ok(Self {
            rec_dir: rec_dir.to_path_buf(),
            paths,
        })
    }

    /// Filter over an explicit path list (sorted, deduplicated)
    pub fn from_paths(rec_dir: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();
        Self {
            rec_dir: rec_dir.to_path_buf(),
            paths,
        }
    }

    /// Narrow by a textual key such as `"eye0"` or `"raw-time"`
    pub fn filter(self, key: &str) -> Result<Self> {
        let key = key.parse::<FilterKey>()?;
        Ok(self.filter_key(key))
    }

    /// Narrow to files satisfying `key`
    pub fn filter_key(self, key: FilterKey) -> Self {
        self.retain(|name| key.matches(name))
    }

    /// Apply each key to the current working set, then combine
    ///
    /// With no keys, `Union` yields the empty set and `Intersection` keeps
    /// the working set unchanged.
    pub fn filter_any_of(self, keys: &[FilterKey], mode: FilterMode) -> Self {
        match mode {
            FilterMode::Union => self.retain(|name| keys.iter().any(|k| k.matches(name))),
            FilterMode::Intersection => self.retain(|name| keys.iter().all(|k| k.matches(name))),
        }
    }

    fn retain(mut self, predicate: impl Fn(&str) -> bool) -> Self {
        self.paths
            .retain(|path| base_name(path).is_some_and(|name| predicate(name)));
        self
    }

    // Shorthands

    pub fn world(self) -> Self {
        self.filter_key(FilterKey::Role(Role::World))
    }

    pub fn eye0(self) -> Self {
        self.filter_key(FilterKey::Role(Role::Eye0))
    }

    pub fn eye1(self) -> Self {
        self.filter_key(FilterKey::Role(Role::Eye1))
    }

    /// `eye0` ∪ `eye1`
    pub fn eyes(self) -> Self {
        self.filter_any_of(
            &[FilterKey::Role(Role::Eye0), FilterKey::Role(Role::Eye1)],
            FilterMode::Union,
        )
    }

    pub fn videos(self) -> Self {
        self.filter_key(FilterKey::Role(Role::Video))
    }

    pub fn raw_time(self) -> Self {
        self.filter_key(FilterKey::Role(Role::RawTime))
    }

    pub fn timestamps(self) -> Self {
        self.filter_key(FilterKey::Role(Role::Timestamps))
    }

    pub fn lookup(self) -> Self {
        self.filter_key(FilterKey::Role(Role::Lookup))
    }

    pub fn core(self) -> Self {
        self.filter_key(FilterKey::Generation(Generation::Core))
    }

    pub fn mobile(self) -> Self {
        self.filter_key(FilterKey::Generation(Generation::Mobile))
    }

    pub fn pi(self) -> Self {
        self.filter_key(FilterKey::Generation(Generation::Pi))
    }

    // Read-only access

    pub fn rec_dir(&self) -> &Path {
        &self.rec_dir
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }

    /// Every classification of every file in the working set
    pub fn classified(&self) -> Vec<ClassifiedFile> {
        self.paths.iter().flat_map(|p| classify_path(p)).collect()
    }
}

impl<'a> IntoIterator for &'a FileFilter {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}
