//! In-place migration of legacy recordings to the canonical layout
//!
//! A migration runs in two phases. Planning reads everything it needs
//! (legacy metadata, file list, raw time files), derives the canonical
//! metadata and validates it, and computes every rename. Nothing on disk
//! changes until planning has succeeded. Execution then mutates the bundle:
//!
//! 1. write the `.migration_in_progress` marker
//! 2. rename camera files to canonical names
//! 3. write `<stream>_timestamps.npy` for every raw time file
//! 4. save `info.player.json`
//! 5. move `info.csv` to `info.<generation>.csv`
//! 6. remove the marker
//!
//! Canonical metadata is written after all file operations, so a bundle
//! that stopped partway never looks migrated. A leftover marker makes
//! later runs fail with [`RecordingError::MigrationInterrupted`].
//!
//! Migrating an already canonical bundle is a no-op.

mod metadata;
mod rename;

pub use metadata::{default_recording_name, default_system_info, info_from_legacy};
pub use rename::{canonical_name, plan_renames, renamed_path, PlannedRename};

use crate::classifier::Generation;
use crate::error::{IoResultExt, RecordingError, Result};
use crate::filter::FileFilter;
use crate::info_file::{
    RecordingInfoFile, CURRENT_SCHEMA_VERSION, NEXT_UNSUPPORTED_SCHEMA_VERSION,
};
use crate::legacy_info::{keys, LegacyInfo, LEGACY_INFO_FILE};
use crate::recording::resolve_directory;
use crate::timestamps::{read_raw_time, timestamps_path_for, write_timestamps, RawTimeFormat};
use prec_common::config::MigrationConfig;
use prec_common::human_time::format_duration;
use prec_common::Version;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Marker present only while a migration mutates a bundle
pub const MIGRATION_MARKER: &str = ".migration_in_progress";

/// First unsupported legacy data format version for `generation`
pub fn ceiling_for(config: &MigrationConfig, generation: Generation) -> Version {
    match generation {
        Generation::Core => config.core_ceiling,
        Generation::Mobile => config.mobile_ceiling,
        Generation::Pi => config.pi_ceiling,
    }
}

/// Encoding of the raw time files a generation wrote, if any
pub fn raw_time_format(generation: Generation) -> Option<RawTimeFormat> {
    match generation {
        Generation::Core => None,
        Generation::Mobile => Some(RawTimeFormat::BigEndianSeconds),
        Generation::Pi => Some(RawTimeFormat::LittleEndianNanos),
    }
}

/// What [`Migrator::detect`] found
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// `info.player.json` with a supported schema version
    Canonical { version: Version },
    /// Legacy bundle below its generation's ceiling
    Legacy {
        generation: Generation,
        version: Version,
        info: LegacyInfo,
    },
}

/// Raw time file decoded during planning
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTimestamps {
    /// Raw file as found before renaming
    pub source: PathBuf,
    /// Canonical timestamp file to write
    pub target: PathBuf,
    pub values: Vec<f64>,
}

/// Every change a migration will make, computed without touching the bundle
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    rec_dir: PathBuf,
    generation: Generation,
    source_version: Version,
    info: RecordingInfoFile,
    renames: Vec<PlannedRename>,
    timestamps: Vec<PlannedTimestamps>,
}

impl MigrationPlan {
    pub fn rec_dir(&self) -> &Path {
        &self.rec_dir
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn source_version(&self) -> Version {
        self.source_version
    }

    /// Canonical metadata that will be saved
    pub fn info(&self) -> &RecordingInfoFile {
        &self.info
    }

    pub fn renames(&self) -> &[PlannedRename] {
        &self.renames
    }

    pub fn timestamps(&self) -> &[PlannedTimestamps] {
        &self.timestamps
    }

    /// Path the legacy `info.csv` is preserved under
    pub fn legacy_backup_path(&self) -> PathBuf {
        self.rec_dir.join(self.generation.legacy_info_name())
    }

    /// Apply the plan to the bundle
    ///
    /// The first failing step aborts the run and leaves the marker behind.
    pub fn execute(self) -> Result<MigrationReport> {
        let marker = self.rec_dir.join(MIGRATION_MARKER);
        std::fs::write(&marker, format!("{} -> {}\n", self.source_version, CURRENT_SCHEMA_VERSION))
            .at_path(&marker)?;

        for rename in &self.renames {
            std::fs::rename(&rename.from, &rename.to).at_path(&rename.from)?;
            debug!("Renamed {} -> {}", rename.from.display(), rename.to.display());
        }

        for ts in &self.timestamps {
            write_timestamps(&ts.target, &ts.values)?;
            debug!("Wrote {} ({} frames)", ts.target.display(), ts.values.len());
        }

        self.info.save()?;
        info!("Saved canonical metadata {}", self.info.path().display());

        let legacy = self.rec_dir.join(LEGACY_INFO_FILE);
        let backup = self.legacy_backup_path();
        std::fs::rename(&legacy, &backup).at_path(&legacy)?;

        std::fs::remove_file(&marker).at_path(&marker)?;

        Ok(MigrationReport {
            rec_dir: self.rec_dir,
            generation: self.generation,
            source_version: self.source_version,
            target_version: self.info.meta_version(),
            recording_uuid: self.info.recording_uuid().unwrap_or_else(Uuid::nil),
            renamed: self.renames,
            timestamp_files: self.timestamps.into_iter().map(|ts| ts.target).collect(),
            legacy_backup: backup,
        })
    }
}

/// Summary of a completed migration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    pub rec_dir: PathBuf,
    pub generation: Generation,
    pub source_version: Version,
    pub target_version: Version,
    pub recording_uuid: Uuid,
    pub renamed: Vec<PlannedRename>,
    pub timestamp_files: Vec<PathBuf>,
    pub legacy_backup: PathBuf,
}

/// Result of [`Migrator::migrate`]
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    /// Bundle was canonical already; nothing changed
    AlreadyCanonical { version: Version },
    Migrated(MigrationReport),
}

/// Legacy-to-canonical migration pipeline
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    config: MigrationConfig,
}

impl Migrator {
    pub fn new(config: MigrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Identify the bundle's generation and version and apply the version gates
    pub fn detect(&self, rec_dir: &Path) -> Result<Detection> {
        self.detect_resolved(&resolve_directory(rec_dir)?)
    }

    fn detect_resolved(&self, rec_dir: &Path) -> Result<Detection> {
        let marker = rec_dir.join(MIGRATION_MARKER);
        if marker.exists() {
            return Err(RecordingError::MigrationInterrupted(marker));
        }

        if RecordingInfoFile::exists(rec_dir) {
            let version = RecordingInfoFile::declared_schema_version(rec_dir)?;
            if version >= NEXT_UNSUPPORTED_SCHEMA_VERSION {
                return Err(RecordingError::UnsupportedFutureVersion {
                    generation: Generation::Core,
                    detected: version,
                    ceiling: NEXT_UNSUPPORTED_SCHEMA_VERSION,
                });
            }
            return Ok(Detection::Canonical { version });
        }

        let legacy_path = rec_dir.join(LEGACY_INFO_FILE);
        if !legacy_path.is_file() {
            return Err(RecordingError::MissingMetadataFile(rec_dir.to_path_buf()));
        }
        let legacy = LegacyInfo::read(&legacy_path)?;

        let generation = Generation::from_capture_software(legacy.get(keys::CAPTURE_SOFTWARE));
        let version = legacy.require_version(keys::DATA_FORMAT_VERSION)?;
        let ceiling = ceiling_for(&self.config, generation);
        if version >= ceiling {
            return Err(RecordingError::UnsupportedFutureVersion {
                generation,
                detected: version,
                ceiling,
            });
        }

        debug!(
            "Detected {} recording, data format {} (ceiling {})",
            generation, version, ceiling
        );
        Ok(Detection::Legacy {
            generation,
            version,
            info: legacy,
        })
    }

    /// Compute the full migration without touching the bundle
    ///
    /// `None` when the bundle is canonical already.
    pub fn plan(&self, rec_dir: &Path) -> Result<Option<MigrationPlan>> {
        let rec_dir = resolve_directory(rec_dir)?;
        let detection = self.detect_resolved(&rec_dir)?;
        self.plan_detected(rec_dir, detection)
    }

    fn plan_detected(
        &self,
        rec_dir: PathBuf,
        detection: Detection,
    ) -> Result<Option<MigrationPlan>> {
        let (generation, source_version, legacy) = match detection {
            Detection::Canonical { .. } => return Ok(None),
            Detection::Legacy {
                generation,
                version,
                info,
            } => (generation, version, info),
        };

        let info = info_from_legacy(&rec_dir, &legacy)?;

        let files = FileFilter::new(&rec_dir)?;
        let renames = plan_renames(files.paths(), generation)?;

        let mut timestamps = Vec::new();
        match raw_time_format(generation) {
            Some(format) => {
                for source in files.clone().raw_time().iter() {
                    let values = read_raw_time(source, format)?;
                    let target = timestamps_path_for(&renamed_path(source, &renames));
                    timestamps.push(PlannedTimestamps {
                        source: source.clone(),
                        target,
                        values,
                    });
                }
            }
            None => {
                let raw = files.clone().raw_time();
                if !raw.is_empty() {
                    warn!(
                        "Ignoring {} raw time file(s) in {} recording",
                        raw.len(),
                        generation
                    );
                }
            }
        }

        Ok(Some(MigrationPlan {
            rec_dir,
            generation,
            source_version,
            info,
            renames,
            timestamps,
        }))
    }

    /// Migrate `rec_dir` in place
    pub fn migrate(&self, rec_dir: &Path) -> Result<MigrationOutcome> {
        let rec_dir = resolve_directory(rec_dir)?;
        let detection = self.detect_resolved(&rec_dir)?;
        if let Detection::Canonical { version } = detection {
            info!("Recording {} is already canonical (v{})", rec_dir.display(), version);
            return Ok(MigrationOutcome::AlreadyCanonical { version });
        }

        let Some(plan) = self.plan_detected(rec_dir, detection)? else {
            return Ok(MigrationOutcome::AlreadyCanonical {
                version: CURRENT_SCHEMA_VERSION,
            });
        };

        info!(
            "Migrating {} recording {}: v{} -> v{} \
             ({} rename(s), {} timestamp file(s), duration {})",
            plan.generation,
            plan.rec_dir.display(),
            plan.source_version,
            CURRENT_SCHEMA_VERSION,
            plan.renames.len(),
            plan.timestamps.len(),
            plan.info.duration_s().map(format_duration).unwrap_or_default()
        );

        let report = plan.execute()?;
        info!("✓ Migration of {} completed", report.rec_dir.display());
        Ok(MigrationOutcome::Migrated(report))
    }
}
