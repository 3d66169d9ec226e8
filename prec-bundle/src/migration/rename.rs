//! Canonical file names for legacy camera files
//!
//! | generation | legacy prefix | canonical prefix |
//! |---|---|---|
//! | mobile | `Pupil Cam<d> ID0` / `ID1` / `ID2` | `eye0` / `eye1` / `world` |
//! | mobile | `Logitech Webcam C930e` | `world` |
//! | pi | `PI world v<d> ps<k>` | `world`, `_<k-1:03>` appended when k > 1 |
//! | pi | `PI left v<d> ps<k>` / `PI right v<d> ps<k>` | `eye0` / `eye1`, same part suffix |
//!
//! Everything after the prefix is kept, so `Pupil Cam1 ID2_part1.mp4`
//! becomes `world_part1.mp4` and `PI left v1 ps2.time` becomes
//! `eye0_001.time`. Core recordings already use canonical names.

use crate::classifier::{base_name, Generation};
use crate::error::{RecordingError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

static MOBILE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Pupil Cam\d ID(?P<cam_id>\d)|Logitech Webcam C930e)")
        .expect("mobile prefix pattern is valid")
});

static PI_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^PI (?P<camera>world|left|right) v\d+ ps(?P<part>\d+)")
        .expect("pi prefix pattern is valid")
});

/// One file move within the recording directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRename {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Canonical base name for `name`, or `None` when it keeps its name
pub fn canonical_name(name: &str, generation: Generation) -> Option<String> {
    match generation {
        Generation::Core => None,
        Generation::Mobile => mobile_name(name),
        Generation::Pi => pi_name(name),
    }
}

fn mobile_name(name: &str) -> Option<String> {
    let caps = MOBILE_PREFIX.captures(name)?;
    let replacement = match caps.name("cam_id").map(|m| m.as_str()) {
        Some("0") => "eye0",
        Some("1") => "eye1",
        Some("2") | None => "world",
        // Unknown camera ids are left alone
        Some(_) => return None,
    };
    let prefix_len = caps.get(0)?.end();
    Some(format!("{}{}", replacement, &name[prefix_len..]))
}

fn pi_name(name: &str) -> Option<String> {
    let caps = PI_PREFIX.captures(name)?;
    let replacement = match &caps["camera"] {
        "world" => "world",
        "left" => "eye0",
        _ => "eye1",
    };
    let part: u64 = caps["part"].parse().ok()?;
    let suffix = if part > 1 {
        format!("_{:03}", part - 1)
    } else {
        String::new()
    };
    let prefix_len = caps.get(0)?.end();
    Some(format!("{}{}{}", replacement, suffix, &name[prefix_len..]))
}

/// Plan renames for every file in `files`
///
/// Fails with `RenameConflict` before anything moves when two files map to
/// the same target, or a target already exists and is not itself moved away.
pub fn plan_renames(files: &[PathBuf], generation: Generation) -> Result<Vec<PlannedRename>> {
    let mut by_target: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    for from in files {
        let Some(name) = base_name(from) else {
            continue;
        };
        let Some(new_name) = canonical_name(name, generation) else {
            continue;
        };
        let to = from.with_file_name(new_name);
        if let Some(first) = by_target.get(&to) {
            return Err(RecordingError::RenameConflict {
                first: first.clone(),
                second: from.clone(),
                target: to,
            });
        }
        by_target.insert(to, from.clone());
    }

    for (to, from) in &by_target {
        let moved_away = by_target.values().any(|source| source == to);
        if to.exists() && !moved_away {
            return Err(RecordingError::RenameConflict {
                first: to.clone(),
                second: from.clone(),
                target: to.clone(),
            });
        }
    }

    let mut renames: Vec<PlannedRename> = by_target
        .into_iter()
        .map(|(to, from)| PlannedRename { from, to })
        .collect();
    renames.sort_by(|a, b| a.from.cmp(&b.from));
    Ok(renames)
}

/// Where `path` ends up after `renames` are applied
pub fn renamed_path(path: &Path, renames: &[PlannedRename]) -> PathBuf {
    renames
        .iter()
        .find(|r| r.from == path)
        .map(|r| r.to.clone())
        .unwrap_or_else(|| path.to_path_buf())
}
