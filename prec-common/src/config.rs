//! Configuration loading and config file resolution
//!
//! Configuration is a small TOML bootstrap file. Every field has a built-in
//! default, so a missing or broken file never prevents the tools from
//! running: it is reported with a warning and defaults are used instead.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `PREC_CONFIG`
//! 3. Platform config directory (`<config_dir>/prec/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::fs_utils::atomic_write;
use crate::version::Version;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PREC_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Migration version gates (optional)
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Per-generation "next unsupported version" ceilings
///
/// A legacy bundle whose declared data format version is at or above the
/// ceiling for its generation is rejected instead of migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MigrationConfig {
    #[serde(default = "default_core_ceiling")]
    pub core_ceiling: Version,

    #[serde(default = "default_mobile_ceiling")]
    pub mobile_ceiling: Version,

    #[serde(default = "default_pi_ceiling")]
    pub pi_ceiling: Version,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            core_ceiling: default_core_ceiling(),
            mobile_ceiling: default_mobile_ceiling(),
            pi_ceiling: default_pi_ceiling(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_core_ceiling() -> Version {
    Version::new(2, 0, 0)
}

fn default_mobile_ceiling() -> Version {
    Version::new(1, 3, 0)
}

fn default_pi_ceiling() -> Version {
    Version::new(2, 0, 0)
}

/// Platform default config file path (`<config_dir>/prec/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("prec").join("config.toml"))
}

/// Resolves which config file to use and loads it with graceful degradation
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver; `cli_path` is the `--config` argument if given
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Config file path by priority, `None` when only defaults apply
    ///
    /// Explicit paths (CLI, environment) are returned even if the file does
    /// not exist so the caller can report it; the platform default is only
    /// returned when the file is present.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path().filter(|p| p.exists())
    }

    /// Load the resolved config file, reporting why it could not be used
    ///
    /// Returns compiled defaults when no file applies. Callers that install
    /// logging after reading configuration use this to report the error
    /// once a subscriber exists.
    pub fn try_load(&self) -> Result<TomlConfig> {
        let Some(path) = self.resolve_path() else {
            debug!("No config file found, using compiled defaults");
            return Ok(TomlConfig::default());
        };

        let config = load_toml_config(&path)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults on any problem
    pub fn load(&self) -> TomlConfig {
        self.try_load().unwrap_or_else(|e| {
            warn!("{} - using compiled defaults", e);
            TomlConfig::default()
        })
    }
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config {} failed: {}", path.display(), e)))
}

/// Serialize `config` and write it atomically to `path`
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).map_err(|e| Error::Serialization(e.to_string()))?;
    atomic_write(path, content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.migration.mobile_ceiling, Version::new(1, 3, 0));
        assert_eq!(config.migration.core_ceiling, Version::new(2, 0, 0));
    }

    #[test]
    fn test_partial_toml_uses_field_defaults() {
        let config: TomlConfig = toml::from_str("[migration]\nmobile_ceiling = \"1.4\"\n").unwrap();
        assert_eq!(config.migration.mobile_ceiling, Version::new(1, 4, 0));
        assert_eq!(config.migration.pi_ceiling, Version::new(2, 0, 0));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bad_version_in_toml_is_error() {
        let parsed: std::result::Result<TomlConfig, _> =
            toml::from_str("[migration]\nmobile_ceiling = \"soon\"\n");
        assert!(parsed.is_err());
    }
}
