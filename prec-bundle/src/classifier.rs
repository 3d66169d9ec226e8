//! File role classification by base name
//!
//! Every file in a recording bundle is classified purely from its base name.
//! Camera stream roles (`world`, `eye0`, `eye1`) depend on the recording
//! generation because each generation named its camera files differently.
//! Sidecar roles (`video`, `raw-time`, `timestamps`, `lookup`) are the same
//! for every generation and match on the file suffix only.
//!
//! The rule table is static: `(generation, role)` maps to an ordered list of
//! alternative [`MatchRule`]s, any of which may match.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Historical naming/metadata schema of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Desktop capture software; already uses canonical stream names
    Core,
    /// Android companion app
    Mobile,
    /// Invisible glasses companion app
    Pi,
}

impl Generation {
    pub const ALL: [Generation; 3] = [Generation::Core, Generation::Mobile, Generation::Pi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Generation::Core => "core",
            Generation::Mobile => "mobile",
            Generation::Pi => "pi",
        }
    }

    /// Generation implied by a legacy `Capture Software` value
    ///
    /// Absent or unrecognized software names are treated as core recordings,
    /// the desktop software being the default producer.
    pub fn from_capture_software(software: Option<&str>) -> Self {
        match software.map(str::trim) {
            Some("Pupil Mobile") => Generation::Mobile,
            Some("Pupil Invisible") => Generation::Pi,
            _ => Generation::Core,
        }
    }

    /// Name the legacy `info.csv` is preserved under after migration
    pub fn legacy_info_name(&self) -> &'static str {
        match self {
            Generation::Core => "info.core.csv",
            Generation::Mobile => "info.mobile.csv",
            Generation::Pi => "info.pi.csv",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional category of a file within a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    World,
    Eye0,
    Eye1,
    Video,
    RawTime,
    Timestamps,
    Lookup,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::World,
        Role::Eye0,
        Role::Eye1,
        Role::Video,
        Role::RawTime,
        Role::Timestamps,
        Role::Lookup,
    ];

    /// Camera stream roles, whose patterns differ per generation
    pub const STREAMS: [Role; 3] = [Role::World, Role::Eye0, Role::Eye1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::World => "world",
            Role::Eye0 => "eye0",
            Role::Eye1 => "eye1",
            Role::Video => "video",
            Role::RawTime => "raw-time",
            Role::Timestamps => "timestamps",
            Role::Lookup => "lookup",
        }
    }

    /// True for `world`, `eye0` and `eye1`
    pub fn is_stream(&self) -> bool {
        matches!(self, Role::World | Role::Eye0 | Role::Eye1)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pure predicate over a base name
#[derive(Debug, Clone, Copy)]
pub enum MatchRule {
    /// Base name starts with the literal
    Prefix(&'static str),
    /// Base name ends with the literal
    Suffix(&'static str),
    /// Compiled pattern searched in the base name
    Pattern(&'static Lazy<Regex>),
}

impl MatchRule {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            MatchRule::Prefix(prefix) => name.starts_with(prefix),
            MatchRule::Suffix(suffix) => name.ends_with(suffix),
            MatchRule::Pattern(re) => re.is_match(name),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("classifier patterns are valid regular expressions")
}

static MOBILE_WORLD_CAM: Lazy<Regex> = Lazy::new(|| compile(r"^Pupil Cam\d ID2"));
static MOBILE_EYE0_CAM: Lazy<Regex> = Lazy::new(|| compile(r"^Pupil Cam\d ID0"));
static MOBILE_EYE1_CAM: Lazy<Regex> = Lazy::new(|| compile(r"^Pupil Cam\d ID1"));
static PI_WORLD_CAM: Lazy<Regex> = Lazy::new(|| compile(r"^PI world v\d+ ps\d+"));
static PI_LEFT_CAM: Lazy<Regex> = Lazy::new(|| compile(r"^PI left v\d+ ps\d+"));
static PI_RIGHT_CAM: Lazy<Regex> = Lazy::new(|| compile(r"^PI right v\d+ ps\d+"));

static CORE_WORLD: [MatchRule; 1] = [MatchRule::Prefix("world")];
static CORE_EYE0: [MatchRule; 1] = [MatchRule::Prefix("eye0")];
static CORE_EYE1: [MatchRule; 1] = [MatchRule::Prefix("eye1")];

static MOBILE_WORLD: [MatchRule; 2] = [
    // Core headset world camera
    MatchRule::Pattern(&MOBILE_WORLD_CAM),
    // Older headsets shipped with a Logitech webcam
    MatchRule::Prefix("Logitech Webcam C930e"),
];
static MOBILE_EYE0: [MatchRule; 1] = [MatchRule::Pattern(&MOBILE_EYE0_CAM)];
static MOBILE_EYE1: [MatchRule; 1] = [MatchRule::Pattern(&MOBILE_EYE1_CAM)];

static PI_WORLD: [MatchRule; 1] = [MatchRule::Pattern(&PI_WORLD_CAM)];
static PI_EYE0: [MatchRule; 1] = [MatchRule::Pattern(&PI_LEFT_CAM)];
static PI_EYE1: [MatchRule; 1] = [MatchRule::Pattern(&PI_RIGHT_CAM)];

static VIDEO: [MatchRule; 6] = [
    MatchRule::Suffix(".mp4"),
    MatchRule::Suffix(".mjpeg"),
    MatchRule::Suffix(".h264"),
    MatchRule::Suffix(".mkv"),
    MatchRule::Suffix(".avi"),
    MatchRule::Suffix(".fake"),
];
static RAW_TIME: [MatchRule; 1] = [MatchRule::Suffix(".time")];
static TIMESTAMPS: [MatchRule; 1] = [MatchRule::Suffix("_timestamps.npy")];
static LOOKUP: [MatchRule; 1] = [MatchRule::Suffix("_lookup.npy")];

/// Match rules for `role` under `generation`
///
/// Sidecar roles ignore `generation`. Stream roles require one; asking for
/// a stream role without a generation yields no rules.
pub fn rules_for(generation: Option<Generation>, role: Role) -> &'static [MatchRule] {
    match (role, generation) {
        (Role::Video, _) => &VIDEO,
        (Role::RawTime, _) => &RAW_TIME,
        (Role::Timestamps, _) => &TIMESTAMPS,
        (Role::Lookup, _) => &LOOKUP,
        (Role::World, Some(Generation::Core)) => &CORE_WORLD,
        (Role::Eye0, Some(Generation::Core)) => &CORE_EYE0,
        (Role::Eye1, Some(Generation::Core)) => &CORE_EYE1,
        (Role::World, Some(Generation::Mobile)) => &MOBILE_WORLD,
        (Role::Eye0, Some(Generation::Mobile)) => &MOBILE_EYE0,
        (Role::Eye1, Some(Generation::Mobile)) => &MOBILE_EYE1,
        (Role::World, Some(Generation::Pi)) => &PI_WORLD,
        (Role::Eye0, Some(Generation::Pi)) => &PI_EYE0,
        (Role::Eye1, Some(Generation::Pi)) => &PI_EYE1,
        (_, None) => &[],
    }
}

/// True if `name` satisfies `role` under `generation`
pub fn matches_role(name: &str, generation: Option<Generation>, role: Role) -> bool {
    rules_for(generation, role).iter().any(|rule| rule.matches(name))
}

/// Roles `name` satisfies for a declared generation
///
/// An unmatched name yields the empty set.
pub fn classify(name: &str, generation: Generation) -> BTreeSet<Role> {
    Role::ALL
        .into_iter()
        .filter(|role| {
            let scope = if role.is_stream() { Some(generation) } else { None };
            matches_role(name, scope, *role)
        })
        .collect()
}

/// Every `(generation, role)` pair `name` satisfies across all generations
///
/// Sidecar roles are reported once with no generation.
pub fn classify_any(name: &str) -> Vec<(Option<Generation>, Role)> {
    let mut found = Vec::new();
    for generation in Generation::ALL {
        for role in Role::STREAMS {
            if matches_role(name, Some(generation), role) {
                found.push((Some(generation), role));
            }
        }
    }
    for role in Role::ALL.into_iter().filter(|r| !r.is_stream()) {
        if matches_role(name, None, role) {
            found.push((None, role));
        }
    }
    found
}

/// True if the base name has a registered video extension
pub fn is_video_name(name: &str) -> bool {
    matches_role(name, None, Role::Video)
}

/// Base name of `path` as UTF-8, if it has one
///
/// Names that are not valid UTF-8 never match any rule.
pub fn base_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// A file together with one role it satisfies
///
/// Derived on demand from the current name; never cached across renames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    /// Generation the stream role matched under; `None` for sidecar roles
    pub generation: Option<Generation>,
    pub role: Role,
}

/// All classifications of one path
pub fn classify_path(path: &Path) -> Vec<ClassifiedFile> {
    let Some(name) = base_name(path) else {
        return Vec::new();
    };
    classify_any(name)
        .into_iter()
        .map(|(generation, role)| ClassifiedFile {
            path: path.to_path_buf(),
            generation,
            role,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roles(list: &[Role]) -> BTreeSet<Role> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_core_names() {
        assert_eq!(classify("world.mp4", Generation::Core), roles(&[Role::World, Role::Video]));
        assert_eq!(
            classify("eye1_timestamps.npy", Generation::Core),
            roles(&[Role::Eye1, Role::Timestamps])
        );
        assert_eq!(
            classify("world_lookup.npy", Generation::Core),
            roles(&[Role::World, Role::Lookup])
        );
    }

    #[test]
    fn test_mobile_names() {
        assert_eq!(
            classify("Pupil Cam1 ID2.mjpeg", Generation::Mobile),
            roles(&[Role::World, Role::Video])
        );
        assert_eq!(
            classify("Logitech Webcam C930e.time", Generation::Mobile),
            roles(&[Role::World, Role::RawTime])
        );
        assert_eq!(
            classify("Pupil Cam2 ID0.mp4", Generation::Mobile),
            roles(&[Role::Eye0, Role::Video])
        );
        assert_eq!(
            classify("Pupil Cam2 ID1.mp4", Generation::Mobile),
            roles(&[Role::Eye1, Role::Video])
        );
    }

    #[test]
    fn test_pi_names() {
        assert_eq!(
            classify("PI world v1 ps1.mp4", Generation::Pi),
            roles(&[Role::World, Role::Video])
        );
        assert_eq!(
            classify("PI left v1 ps2.time", Generation::Pi),
            roles(&[Role::Eye0, Role::RawTime])
        );
        assert_eq!(
            classify("PI right v1 ps1.mp4", Generation::Pi),
            roles(&[Role::Eye1, Role::Video])
        );
        // The part number is required by the pattern
        assert!(!classify("PI world v1.mp4", Generation::Pi).contains(&Role::World));
    }

    #[test]
    fn test_stream_roles_depend_on_generation() {
        assert!(!classify("Pupil Cam1 ID2.mp4", Generation::Core).contains(&Role::World));
        assert!(!classify("world.mp4", Generation::Mobile).contains(&Role::World));
        assert!(classify("world.mp4", Generation::Mobile).contains(&Role::Video));
    }

    #[test]
    fn test_unmatched_name_is_empty_not_error() {
        assert!(classify("notes.txt", Generation::Core).is_empty());
        assert!(classify_any("info.csv").is_empty());
    }

    #[test]
    fn test_match_is_on_base_name_start() {
        assert!(!classify("my_world.mp4", Generation::Core).contains(&Role::World));
        assert!(!classify("x Pupil Cam1 ID2.mp4", Generation::Mobile).contains(&Role::World));
    }

    #[test]
    fn test_suffix_roles_are_exact() {
        assert!(!is_video_name("world.mp4.bak"));
        assert!(!is_video_name("world.MP4"));
        assert!(classify_any("world_timestamps.npy.tmp")
            .iter()
            .all(|(_, r)| *r != Role::Timestamps));
    }

    #[test]
    fn test_classify_any_reports_generation() {
        let found = classify_any("Pupil Cam1 ID0.mp4");
        assert_eq!(found, vec![(Some(Generation::Mobile), Role::Eye0), (None, Role::Video)]);
    }

    #[test]
    fn test_classify_path_uses_base_name_only() {
        let found = classify_path(Path::new("/data/world/notes.txt"));
        assert!(found.is_empty());
        let found = classify_path(Path::new("/data/rec/eye0.mp4"));
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.path == Path::new("/data/rec/eye0.mp4")));
    }

    #[test]
    fn test_generation_from_capture_software() {
        assert_eq!(Generation::from_capture_software(Some("Pupil Mobile")), Generation::Mobile);
        assert_eq!(Generation::from_capture_software(Some("Pupil Invisible")), Generation::Pi);
        assert_eq!(Generation::from_capture_software(Some("Pupil Capture")), Generation::Core);
        assert_eq!(Generation::from_capture_software(None), Generation::Core);
    }

    fn stream_prefix() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("world".to_string()),
            Just("eye0".to_string()),
            Just("eye1".to_string()),
            (0u8..10, 0u8..3).prop_map(|(cam, id)| format!("Pupil Cam{} ID{}", cam, id)),
            Just("Logitech Webcam C930e".to_string()),
            (prop_oneof![Just("world"), Just("left"), Just("right")], 1u8..9, 1u8..20)
                .prop_map(|(kind, v, ps)| format!("PI {} v{} ps{}", kind, v, ps)),
        ]
    }

    proptest! {
        #[test]
        fn proptest_stream_roles_are_disjoint(
            prefix in stream_prefix(),
            rest in "[a-z0-9_]{0,8}",
            ext in prop_oneof![Just(".mp4"), Just(".time"), Just("_timestamps.npy"), Just(".bin")],
        ) {
            let name = format!("{}{}{}", prefix, rest, ext);
            let streams: Vec<_> = classify_any(&name)
                .into_iter()
                .filter(|(_, role)| role.is_stream())
                .collect();
            prop_assert_eq!(streams.len(), 1, "name {:?} matched {:?}", name, streams);
        }
    }
}
