//! Command-line interface for romverify.
//!
//! Provides commands for identifying and organizing ROM files, managing
//! installed DAT files, and configuring collection directories.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::catalog::{Catalog, DatStore, IngestOptions};
use crate::config::{Paths, SettingsStore};
use crate::organize::engine::default_jobs;
use crate::organize::{
    resolve_console, AliasTable, BatchSummary, EngineOptions, FileOutcome, FileStatus, Mode,
    ReorganizationEngine,
};

pub mod collection;
pub mod dat;

/// romverify - Verify and organize ROMs with No-Intro DAT files
#[derive(Parser, Debug)]
#[command(name = "romverify")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by the file-processing commands
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// ROM files to process
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Keep results uncompressed instead of zipping them
    #[arg(long)]
    pub no_compress: bool,

    /// Use this DAT file instead of the installed ones
    #[arg(short, long)]
    pub dat: Option<PathBuf>,

    /// Number of files processed concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Identify files and move them into their collection directories
    Organize {
        #[command(flatten)]
        scan: ScanArgs,

        /// Destination directory, overriding collection directories
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Identify files and rename them where they are
    Rename {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Identify files without changing anything
    Check {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Install DAT files from No-Intro DAT-o-MATIC
    DatAdd {
        /// DAT files (plain or zipped)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Allow replacing a newer or identical installed DAT
        #[arg(short, long)]
        force: bool,
    },

    /// Remove an installed DAT file
    DatRemove {
        /// Console name (full or without vendor)
        console: String,
    },

    /// List consoles with installed DAT files
    List,

    /// Set the collection directory for a console
    CollectionAdd {
        /// Console name (full or without vendor)
        console: String,

        /// Directory organized ROMs are moved to
        dir: PathBuf,
    },

    /// Unset the collection directory for a console
    CollectionRemove {
        /// Console name (full or without vendor)
        console: String,
    },

    /// List ROMs missing from collection directories
    CollectionMissing {
        /// Only check this console
        console: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved paths and settings
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let paths = Paths::resolve()?;

        match self.command {
            Commands::Organize { scan, output_dir } => {
                run_batch(&paths, Mode::Organize, scan, output_dir).await
            }
            Commands::Rename { scan } => run_batch(&paths, Mode::Rename, scan, None).await,
            Commands::Check { scan } => run_batch(&paths, Mode::Check, scan, None).await,
            Commands::DatAdd { files, force } => dat::add(&paths, &files, force),
            Commands::DatRemove { console } => dat::remove(&paths, &console),
            Commands::List => dat::list(&paths),
            Commands::CollectionAdd { console, dir } => collection::add(&paths, &console, &dir),
            Commands::CollectionRemove { console } => collection::remove(&paths, &console),
            Commands::CollectionMissing { console, json } => {
                collection::missing(&paths, console.as_deref(), json).await
            }
            Commands::Config => show_config(&paths),
        }
    }
}

/// Build the catalog from `--dat` or the installed DAT directory.
///
/// Fails when no console could be loaded at all.
pub async fn load_catalog(paths: &Paths, dat: Option<&Path>) -> Result<Catalog> {
    match dat {
        Some(file) => {
            let file = file.to_path_buf();
            tokio::task::spawn_blocking(move || {
                let mut catalog = Catalog::new();
                catalog
                    .ingest_file(&file, IngestOptions::default())
                    .with_context(|| format!("Failed to load DAT file: {}", file.display()))?;
                Ok::<_, anyhow::Error>(catalog)
            })
            .await?
        }
        None => {
            let store = DatStore::new(&paths.dat_dir);
            let catalog = tokio::task::spawn_blocking({
                let store = store.clone();
                move || store.load(false)
            })
            .await??;

            if !catalog.has_consoles() {
                anyhow::bail!(
                    "No DAT files loaded from {}. Install one with 'romverify dat-add <file>' or pass --dat",
                    store.dir().display()
                );
            }
            Ok(catalog)
        }
    }
}

/// Full name of a known console, given its full name or an unambiguous alias
pub fn known_console(name: &str, consoles: &BTreeSet<String>) -> Result<String> {
    let aliases = AliasTable::from_consoles(consoles);
    match resolve_console(name, consoles, &aliases) {
        Some(full) => Ok(full),
        None if aliases.is_ambiguous(name) => {
            anyhow::bail!("Ambiguous console name: {} (use the full name)", name)
        }
        None => anyhow::bail!(
            "Unknown console: {} (install its DAT file with 'romverify dat-add')",
            name
        ),
    }
}

/// Identify (and possibly move) a batch of files
async fn run_batch(
    paths: &Paths,
    mode: Mode,
    scan: ScanArgs,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let store = SettingsStore::load(&paths.config_file)?;
    let catalog = load_catalog(paths, scan.dat.as_deref()).await?;
    tracing::info!(
        consoles = catalog.consoles().len(),
        roms = catalog.len(),
        "Catalog loaded"
    );

    let settings = store.settings();
    let options = EngineOptions {
        mode,
        output_dir,
        compress: !scan.no_compress && settings.compress.unwrap_or(true),
        jobs: scan.jobs.or(settings.jobs).unwrap_or_else(default_jobs),
    };

    let engine = Arc::new(ReorganizationEngine::new(
        Arc::new(catalog),
        store.collections().clone(),
        options,
    ));
    let outcomes = engine.run(scan.files).await;

    if scan.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for outcome in &outcomes {
            print_outcome(outcome);
        }
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    eprintln!(
        "\n{} matched ({} moved), {} unmatched, {} skipped, {} failed",
        summary.matched, summary.moved, summary.unmatched, summary.skipped, summary.failed
    );

    Ok(())
}

/// Print one per-file report block
fn print_outcome(outcome: &FileOutcome) {
    println!("Processing: {}", outcome.path.display());

    match &outcome.status {
        FileStatus::Skipped { reason } => println!("  {}", reason),
        FileStatus::Unmatched { checksum } => {
            println!("  sha1sum:  {}", checksum);
            println!("  No match found");
        }
        FileStatus::Matched { entry, result } => {
            println!("  sha1sum:  {}", entry.checksum);
            println!("  Console:  {}", entry.console);
            println!("  ROM name: {}", entry.name);
            if let Some(result) = result {
                println!("  Moved to: {} ({})", result.path.display(), result.strategy);
            }
        }
        FileStatus::Failed { entry, error } => {
            if let Some(entry) = entry {
                println!("  sha1sum:  {}", entry.checksum);
                println!("  Console:  {}", entry.console);
                println!("  ROM name: {}", entry.name);
            }
            println!("  ERROR: {}", error);
        }
    }
}

/// Show the resolved configuration (for debugging)
fn show_config(paths: &Paths) -> Result<()> {
    let store = SettingsStore::load(&paths.config_file)?;
    let settings = store.settings();

    println!("Config file: {}", store.path().display());
    println!("DAT directory: {}", paths.dat_dir.display());
    println!();
    println!(
        "Compress: {}",
        settings
            .compress
            .map(|c| c.to_string())
            .unwrap_or_else(|| "true (default)".to_string())
    );
    println!(
        "Jobs: {}",
        settings
            .jobs
            .map(|j| j.to_string())
            .unwrap_or_else(|| format!("{} (default)", default_jobs()))
    );
    println!();
    println!("Collections:");
    if settings.collections.is_empty() {
        println!("  (none)");
    } else {
        for (console, dir) in &settings.collections {
            println!("  {}: {}", console, dir.display());
        }
    }

    Ok(())
}
