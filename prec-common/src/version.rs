//! Three-component version numbers
//!
//! Metadata schemas, legacy data format versions and capture software
//! versions are all compared as `major.minor.patch` triples. Missing
//! trailing components are zero, so `"1.3"` and `"1.3.0"` are equal.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ordered `major.minor.patch` version
///
/// Ordering is lexicographic over the three components, which the derived
/// `Ord` provides because of field declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Create a version from its three components
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string
    ///
    /// Accepts one to three dot-separated unsigned integers, an optional
    /// leading `v`, and ignores a pre-release/build suffix introduced by
    /// `-` or `+` (`"1.16.0-dev"` parses as `1.16.0`).
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let core = trimmed
            .split(['-', '+'])
            .next()
            .unwrap_or_default();

        if core.is_empty() {
            return Err(Error::InvalidInput(format!("empty version string: {:?}", s)));
        }

        let mut parts = [0u32; 3];
        let mut count = 0;
        for component in core.split('.') {
            if count == parts.len() {
                return Err(Error::InvalidInput(format!(
                    "version has more than three components: {:?}",
                    s
                )));
            }
            parts[count] = component.parse().map_err(|_| {
                Error::InvalidInput(format!("invalid version component {:?} in {:?}", component, s))
            })?;
            count += 1;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}
