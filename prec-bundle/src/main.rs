//! prec - recording bundle tool
//!
//! Validates, inspects and migrates eye-tracking recording directories.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prec_bundle::classifier::classify_path;
use prec_bundle::migration::MigrationPlan;
use prec_bundle::{
    FilterKey, FilterMode, MigrationOutcome, Migrator, Recording, RecordingError, RecordingMeta,
};
use prec_common::config::{ConfigResolver, TomlConfig};
use prec_common::human_time::format_duration;
use tracing::{debug, info, warn};

/// Command-line arguments for prec
#[derive(Parser, Debug)]
#[command(name = "prec")]
#[command(about = "Validate, inspect and migrate eye-tracking recordings")]
#[command(version)]
struct Args {
    /// Configuration file (overrides PREC_CONFIG and the default location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directives (overrides the configuration file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that a directory is a valid recording
    Validate { dir: PathBuf },

    /// Print recording metadata
    Info { dir: PathBuf },

    /// List recording files with their roles
    List {
        dir: PathBuf,

        /// Keep only files matching KEY; repeat to narrow further
        #[arg(long = "filter", value_name = "KEY")]
        filters: Vec<String>,

        /// Then keep files matching any of the given keys
        #[arg(long, num_args = 1.., value_name = "KEY")]
        union: Vec<String>,
    },

    /// Migrate a legacy recording to the canonical layout in place
    Migrate {
        dir: PathBuf,

        /// Print the planned changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Print the migration report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(recovery) = e.downcast_ref::<RecordingError>().and_then(|r| r.recovery()) {
                eprintln!("Hint: {}", recovery);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    // Logging depends on the config file, so load problems are reported after init
    let (config, config_error) = match ConfigResolver::new(args.config.clone()).try_load() {
        Ok(config) => (config, None),
        Err(e) => (TomlConfig::default(), Some(e)),
    };
    let level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    prec_common::logging::init(&level).context("Failed to initialize logging")?;
    if let Some(e) = config_error {
        warn!("{} - using compiled defaults", e);
    }
    debug!("Configuration: {:?}", config);

    match args.command {
        Command::Validate { dir } => {
            let rec = load(&dir)?;
            println!(
                "OK: {} ({}, {} metadata)",
                rec.rec_dir().display(),
                rec.capture_software(),
                if rec.meta().is_canonical() { "canonical" } else { "legacy" }
            );
        }
        Command::Info { dir } => print_info(&load(&dir)?),
        Command::List {
            dir,
            filters,
            union,
        } => {
            let rec = load(&dir)?;
            let mut files = rec.files()?;
            for key in &filters {
                files = files.filter(key)?;
            }
            if !union.is_empty() {
                let keys = union
                    .iter()
                    .map(|k| k.parse::<FilterKey>())
                    .collect::<prec_bundle::Result<Vec<_>>>()?;
                files = files.filter_any_of(&keys, FilterMode::Union);
            }
            for path in &files {
                let roles: Vec<String> = classify_path(path)
                    .into_iter()
                    .map(|c| match c.generation {
                        Some(generation) => format!("{}:{}", generation, c.role),
                        None => c.role.to_string(),
                    })
                    .collect();
                let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                println!("{}\t{}", name, roles.join(","));
            }
        }
        Command::Migrate { dir, dry_run, json } => {
            let migrator = Migrator::new(config.migration);
            if dry_run {
                match migrator.plan(&dir)? {
                    Some(plan) => print_plan(&plan),
                    None => println!("Already canonical, nothing to do"),
                }
                return Ok(());
            }
            match migrator.migrate(&dir)? {
                MigrationOutcome::AlreadyCanonical { version } => {
                    println!("Already canonical (schema {}), nothing to do", version)
                }
                MigrationOutcome::Migrated(report) if json => {
                    let rendered = serde_json::to_string_pretty(&report)
                        .context("Failed to render migration report")?;
                    println!("{}", rendered);
                }
                MigrationOutcome::Migrated(report) => {
                    println!(
                        "Migrated {} recording {}: {} -> {}",
                        report.generation,
                        report.rec_dir.display(),
                        report.source_version,
                        report.target_version
                    );
                    for rename in &report.renamed {
                        println!(
                            "  renamed {} -> {}",
                            file_name(&rename.from),
                            file_name(&rename.to)
                        );
                    }
                    for ts in &report.timestamp_files {
                        println!("  wrote {}", file_name(ts));
                    }
                    println!("  legacy metadata kept as {}", file_name(&report.legacy_backup));
                }
            }
        }
    }

    Ok(())
}

fn load(dir: &Path) -> Result<Recording> {
    let rec = Recording::load(dir)?;
    info!("Loaded {}", rec.rec_dir().display());
    Ok(rec)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_info(rec: &Recording) {
    println!("Directory:        {}", rec.rec_dir().display());
    println!("Generation:       {}", rec.generation());
    match rec.meta() {
        RecordingMeta::Canonical(info) => {
            println!("Schema:           {}", info.meta_version());
            let field = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
            println!("Name:             {}", field(info.recording_name().map(str::to_owned)));
            println!("UUID:             {}", field(info.recording_uuid().map(|u| u.to_string())));
            println!(
                "Software:         {} {}",
                field(info.recording_software_name().map(str::to_owned)),
                field(info.recording_software_version().map(|v| v.to_string()))
            );
            println!("Started:          {}", field(info.start_datetime().map(|t| t.to_rfc3339())));
            println!("Duration:         {}", field(info.duration_s().map(format_duration)));
            println!("System:           {}", field(info.system_info().map(str::to_owned)));
        }
        RecordingMeta::Legacy(info) => {
            println!("Metadata:         {} (legacy)", info.path().display());
            for (key, value) in info.entries() {
                println!("  {}: {}", key, value);
            }
        }
    }
}

fn print_plan(plan: &MigrationPlan) {
    println!(
        "Would migrate {} recording {}: {} -> {}",
        plan.generation(),
        plan.rec_dir().display(),
        plan.source_version(),
        plan.info().meta_version()
    );
    for rename in plan.renames() {
        println!("  rename {} -> {}", file_name(&rename.from), file_name(&rename.to));
    }
    for ts in plan.timestamps() {
        println!("  write {} ({} frames)", file_name(&ts.target), ts.values.len());
    }
    println!("  keep legacy metadata as {}", file_name(&plan.legacy_backup_path()));
}
