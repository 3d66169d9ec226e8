//! Legacy `info.csv` key/value metadata
//!
//! Older capture software wrote recording metadata as a two-column table.
//! Both delimiter styles seen in the wild are accepted on read:
//!
//! ```text
//! key,value
//! Recording Name,2019_05_03
//! "System Info","User: lab, Platform: Linux"
//! Data Format Version: 1.0
//! ```
//!
//! An optional `key,value` header row is skipped. Surrounding double quotes
//! are removed from keys and values. Legacy files are never rewritten.

use crate::error::{IoResultExt, RecordingError, Result};
use prec_common::Version;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fixed name of the legacy metadata file
pub const LEGACY_INFO_FILE: &str = "info.csv";

/// Keys used by the legacy metadata table
pub mod keys {
    pub const RECORDING_NAME: &str = "Recording Name";
    pub const RECORDING_UUID: &str = "Recording UUID";
    pub const DATA_FORMAT_VERSION: &str = "Data Format Version";
    pub const START_TIME_SYSTEM: &str = "Start Time (System)";
    pub const START_TIME_SYNCED: &str = "Start Time (Synced)";
    pub const DURATION_TIME: &str = "Duration Time";
    pub const CAPTURE_SOFTWARE: &str = "Capture Software";
    pub const CAPTURE_SOFTWARE_VERSION: &str = "Capture Software Version";
    pub const SYSTEM_INFO: &str = "System Info";
}

/// Parsed legacy key/value table
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyInfo {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LegacyInfo {
    /// Read and parse a legacy metadata file
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).at_path(path)?;
        let text = String::from_utf8(bytes).map_err(|_| RecordingError::MetadataUnreadable {
            path: path.to_path_buf(),
            detail: "file is not valid UTF-8".to_string(),
        })?;
        Self::parse(&text, path)
    }

    /// Parse legacy metadata text; `path` is used for error reporting
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let unreadable = |line_no: usize, detail: &str| RecordingError::MetadataUnreadable {
            path: path.to_path_buf(),
            detail: format!("line {}: {}", line_no, detail),
        };

        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut entries = BTreeMap::new();
        let mut seen_record = false;

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let fields = split_csv_line(line).map_err(|detail| unreadable(line_no, detail))?;
            // Legacy keys never contain ':', so a colon before the first comma
            // means a `key: value` record whose value happens to contain commas
            let (key, value) = match fields.as_slice() {
                [key, value] if !key.contains(':') => (key.clone(), value.clone()),
                _ => {
                    match line.split_once(':') {
                        Some((key, value)) => (unquote(key.trim()), unquote(value.trim())),
                        None => return Err(unreadable(line_no, "expected a key and a value")),
                    }
                }
            };

            if !seen_record {
                seen_record = true;
                if key.eq_ignore_ascii_case("key") && value.eq_ignore_ascii_case("value") {
                    continue;
                }
            }

            if key.is_empty() {
                return Err(unreadable(line_no, "empty key"));
            }
            entries.insert(key, value);
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Path the table was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, ordered by key
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Value for `key`, `None` when absent or blank
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Value for `key`, failing with `MissingMandatoryKey` when absent or blank
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| RecordingError::MissingMandatoryKey(key.to_string()))
    }

    /// Mandatory float field
    pub fn require_f64(&self, key: &str) -> Result<f64> {
        let raw = self.require(key)?;
        raw.parse::<f64>()
            .map_err(|_| RecordingError::malformed(key, format!("{:?} is not a number", raw)))
    }

    /// Mandatory version field
    pub fn require_version(&self, key: &str) -> Result<Version> {
        let raw = self.require(key)?;
        Version::parse(raw).map_err(|e| RecordingError::malformed(key, e.to_string()))
    }
}

fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].replace("\"\"", "\"")
    } else {
        s.to_string()
    }
}

/// Split one record at its first unquoted comma, honoring double quotes
///
/// Everything after the first separator belongs to the value, so unquoted
/// values that themselves contain commas survive intact.
fn split_csv_line(line: &str) -> std::result::Result<Vec<String>, &'static str> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() && !was_quoted => {
                current.clear();
                in_quotes = true;
                was_quoted = true;
            }
            ',' if !in_quotes && fields.is_empty() => {
                fields.push(finish_field(&current, was_quoted));
                current.clear();
                was_quoted = false;
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field");
    }
    fields.push(finish_field(&current, was_quoted));
    Ok(fields)
}

fn finish_field(raw: &str, was_quoted: bool) -> String {
    if was_quoted {
        // keep content of the quotes, drop whitespace after the closing quote
        raw.trim_end().to_string()
    } else {
        raw.trim().to_string()
    }
}
