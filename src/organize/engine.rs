//! Batch identification and reorganization of ROM files.
//!
//! Each input runs the full pipeline on one blocking worker:
//! type check, checksum, catalog lookup, destination, transform. A failure
//! only affects its own file; the batch always visits every input.
//!
//! Two inputs that resolve to the same destination race; the later one
//! wins. The engine warns when it sees this but does not prevent it.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::resolver::{AliasTable, DestinationResolver};
use super::transform::{extract_path, leftover_extracts, ArchiveTransform, TransformResult};
use crate::catalog::{Catalog, Checksum, ChecksumEntry};
use crate::content::RomSource;

/// What to do with identified files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Identify only, never touch the file
    Check,

    /// Rename in place
    Rename,

    /// Move into the console's collection directory
    Organize,
}

/// Engine settings for one batch
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub mode: Mode,

    /// Overrides both collection directories and the source directory
    pub output_dir: Option<PathBuf>,

    /// Write results as zip archives
    pub compress: bool,

    /// Maximum files processed concurrently
    pub jobs: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Check,
            output_dir: None,
            compress: true,
            jobs: default_jobs(),
        }
    }
}

/// Default worker count, capped to avoid saturating a single disk
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(4)
}

/// Why an input was not processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    Directory,
    Symlink,
    SpecialFile,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "File does not exist"),
            SkipReason::Directory => write!(f, "Skipping directory"),
            SkipReason::Symlink => write!(f, "Skipping symbolic link"),
            SkipReason::SpecialFile => write!(f, "Skipping special file"),
        }
    }
}

/// Result of processing one input
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Not a regular file
    Skipped { reason: SkipReason },

    /// Hashed, but no catalog entry
    Unmatched { checksum: Checksum },

    /// Identified; `result` is set when the file was moved
    Matched {
        entry: ChecksumEntry,
        result: Option<TransformResult>,
    },

    /// Reading or transforming failed; `entry` is set if identification succeeded
    Failed {
        entry: Option<ChecksumEntry>,
        error: String,
    },
}

/// Per-file report line
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    fn new(path: &Path, status: FileStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
        }
    }

    /// Catalog entry, if the file was identified
    pub fn entry(&self) -> Option<&ChecksumEntry> {
        match &self.status {
            FileStatus::Matched { entry, .. } => Some(entry),
            FileStatus::Failed { entry, .. } => entry.as_ref(),
            _ => None,
        }
    }

    /// Where the file ended up, if it was moved
    pub fn final_path(&self) -> Option<&Path> {
        match &self.status {
            FileStatus::Matched {
                result: Some(result),
                ..
            } => Some(&result.path),
            _ => None,
        }
    }
}

/// Counts over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub matched: usize,
    pub moved: usize,
    pub unmatched: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match &outcome.status {
                FileStatus::Skipped { .. } => summary.skipped += 1,
                FileStatus::Unmatched { .. } => summary.unmatched += 1,
                FileStatus::Matched { result, .. } => {
                    summary.matched += 1;
                    if result.is_some() {
                        summary.moved += 1;
                    }
                }
                FileStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

/// Identifies inputs against a catalog and moves them into place
pub struct ReorganizationEngine {
    catalog: Arc<Catalog>,
    aliases: AliasTable,
    collections: BTreeMap<String, PathBuf>,
    options: EngineOptions,
    transform: ArchiveTransform,
    claimed: Mutex<HashSet<PathBuf>>,
    touched: Mutex<BTreeSet<PathBuf>>,
}

impl ReorganizationEngine {
    /// Create an engine over a fully built catalog.
    ///
    /// `collections` maps console names to collection directories.
    pub fn new(
        catalog: Arc<Catalog>,
        collections: BTreeMap<String, PathBuf>,
        options: EngineOptions,
    ) -> Self {
        let aliases = AliasTable::from_consoles(catalog.consoles());
        let transform = ArchiveTransform::new(options.compress);
        Self {
            catalog,
            aliases,
            collections,
            options,
            transform,
            claimed: Mutex::new(HashSet::new()),
            touched: Mutex::new(BTreeSet::new()),
        }
    }

    /// Process every input on a bounded pool of blocking workers.
    ///
    /// Outcomes are returned in input order.
    pub async fn run(self: Arc<Self>, paths: Vec<PathBuf>) -> Vec<FileOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.options.jobs.max(1)));
        let mut handles = Vec::with_capacity(paths.len());

        for path in paths {
            let engine = Arc::clone(&self);
            let permit = Arc::clone(&semaphore).acquire_owned().await;
            let task_path = path.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                engine.process_file(&task_path)
            });
            handles.push((path, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => FileOutcome::new(
                    &path,
                    FileStatus::Failed {
                        entry: None,
                        error: format!("Worker failed: {}", e),
                    },
                ),
            };
            outcomes.push(outcome);
        }

        for leftover in self.leftovers() {
            warn!(
                path = %leftover.display(),
                "Leftover extracted ROM from an interrupted repack; organize it again to finish"
            );
        }
        outcomes
    }

    /// Process a single input
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn process_file(&self, path: &Path) -> FileOutcome {
        if let Some(reason) = skip_reason(path) {
            debug!(%reason, "Skipped");
            return FileOutcome::new(path, FileStatus::Skipped { reason });
        }

        let (rom, checksum) = match RomSource::probe(path).and_then(|rom| {
            let checksum = rom.checksum()?;
            Ok((rom, checksum))
        }) {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Could not read file");
                return FileOutcome::new(
                    path,
                    FileStatus::Failed {
                        entry: None,
                        error: e.to_string(),
                    },
                );
            }
        };

        debug!(%checksum, archive = ?rom.entry_name(), "Checksum computed");

        let Some(entry) = self.catalog.lookup(&checksum).cloned() else {
            info!(%checksum, "No match found");
            return FileOutcome::new(path, FileStatus::Unmatched { checksum });
        };
        info!(console = %entry.console, name = %entry.name, "Identified");

        let dest_dir = match self.destination_dir(path, &entry.console) {
            Ok(Some(dir)) => dir,
            Ok(None) => {
                return FileOutcome::new(path, FileStatus::Matched { entry, result: None })
            }
            Err(error) => return FileOutcome::new(path, failed(entry, error)),
        };

        if !is_plain_file_name(&entry.name) {
            let error = format!("Refusing unsafe ROM name: {}", entry.name);
            return FileOutcome::new(path, failed(entry, error));
        }

        if let Err(e) = fs::create_dir_all(&dest_dir) {
            let error = format!("Failed to create {}: {}", dest_dir.display(), e);
            return FileOutcome::new(path, failed(entry, error));
        }

        let dest = dest_dir.join(&entry.name);
        self.claim(&dest);
        if let Ok(mut touched) = self.touched.lock() {
            touched.insert(dest_dir);
        }

        match self.transform.apply_source(&rom, &dest) {
            Ok(result) => {
                info!(to = %result.path.display(), strategy = %result.strategy, "Moved");
                FileOutcome::new(
                    path,
                    FileStatus::Matched {
                        entry,
                        result: Some(result),
                    },
                )
            }
            Err(e) => {
                warn!(error = %e, "Transform failed");
                let mut error = e.to_string();
                let extracted = extract_path(&dest);
                if extracted.exists() {
                    error.push_str(&format!("; ROM data kept at {}", extracted.display()));
                }
                FileOutcome::new(path, failed(entry, error))
            }
        }
    }

    /// Directory an identified file should end up in, `None` in check mode
    fn destination_dir(&self, source: &Path, console: &str) -> Result<Option<PathBuf>, String> {
        if self.options.mode == Mode::Check {
            return Ok(None);
        }
        if let Some(dir) = &self.options.output_dir {
            return Ok(Some(dir.clone()));
        }

        let collection = match self.options.mode {
            Mode::Organize => {
                DestinationResolver::new(&self.aliases, &self.collections).resolve(console)
            }
            _ => None,
        };

        match collection {
            Some(dir) => Ok(Some(dir)),
            None => source_dir(source)
                .map(Some)
                .map_err(|e| format!("Failed to resolve {}: {}", source.display(), e)),
        }
    }

    fn claim(&self, dest: &Path) {
        let Ok(mut claimed) = self.claimed.lock() else {
            return;
        };
        if !claimed.insert(dest.to_path_buf()) {
            warn!(
                dest = %dest.display(),
                "Several inputs share this destination; the last one processed wins"
            );
        }
    }

    /// Repack intermediates in every destination directory this engine wrote to
    pub fn leftovers(&self) -> Vec<PathBuf> {
        let Ok(touched) = self.touched.lock() else {
            return Vec::new();
        };
        touched.iter().flat_map(|dir| leftover_extracts(dir)).collect()
    }
}

fn failed(entry: ChecksumEntry, error: String) -> FileStatus {
    FileStatus::Failed {
        entry: Some(entry),
        error,
    }
}

/// Classify inputs that must not be processed
pub fn skip_reason(path: &Path) -> Option<SkipReason> {
    let Ok(meta) = fs::metadata(path) else {
        return Some(SkipReason::NotFound);
    };
    if meta.is_dir() {
        return Some(SkipReason::Directory);
    }
    if fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
    {
        return Some(SkipReason::Symlink);
    }
    if !meta.is_file() {
        return Some(SkipReason::SpecialFile);
    }
    None
}

/// Real directory containing `path`, with symlinks resolved
fn source_dir(path: &Path) -> std::io::Result<PathBuf> {
    let real = fs::canonicalize(path)?;
    Ok(real
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/")))
}

fn is_plain_file_name(name: &str) -> bool {
    Path::new(name).file_name() == Some(OsStr::new(name))
}
