//! Directory of installed DAT files, one per console.
//!
//! # Storage Layout
//!
//! ```text
//! <data dir>/dats/
//! ├── Nintendo - Game Boy.dat
//! └── Sega - Game Gear.dat
//! ```
//!
//! Versions are compared as plain strings. This orders the usual
//! `YYYYMMDD-HHMMSS` No-Intro stamps correctly but misorders bare numbers
//! such as `9` and `10`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{dat_file_name, Catalog, ConsoleRecord, DatSource, IngestOptions};
use crate::organize::transform::ArchiveTransform;

/// Result of installing a DAT file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// No DAT was installed for this console
    Installed,

    /// Replaced an older version
    Updated { previous: String },

    /// Replaced an equal or newer version because of `force`
    Overwrote { previous: String },

    /// Installed version is the same
    UpToDate,

    /// Installed version is newer
    InstalledIsNewer { installed: String },
}

impl InstallOutcome {
    /// Whether the file was copied into the store
    pub fn installed(&self) -> bool {
        matches!(
            self,
            Self::Installed | Self::Updated { .. } | Self::Overwrote { .. }
        )
    }
}

impl std::fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => write!(f, "Installed successfully"),
            Self::Updated { previous } => write!(f, "Installed updated dat file (was {})", previous),
            Self::Overwrote { previous } => write!(f, "Overwrote previous dat file (was {})", previous),
            Self::UpToDate => write!(
                f,
                "Skipping because installed dat file is already up to date; use --force to replace it"
            ),
            Self::InstalledIsNewer { installed } => write!(
                f,
                "Skipping because installed dat file is newer ({}); use --force to force a downgrade",
                installed
            ),
        }
    }
}

/// Decide what installing `new` over `installed` should do
pub fn install_decision(new: &str, installed: Option<&str>, force: bool) -> InstallOutcome {
    match installed {
        None => InstallOutcome::Installed,
        Some(old) if new > old => InstallOutcome::Updated {
            previous: old.to_string(),
        },
        Some(old) if force => InstallOutcome::Overwrote {
            previous: old.to_string(),
        },
        Some(old) if new == old => InstallOutcome::UpToDate,
        Some(old) => InstallOutcome::InstalledIsNewer {
            installed: old.to_string(),
        },
    }
}

/// Installed DAT directory
#[derive(Debug, Clone)]
pub struct DatStore {
    dir: PathBuf,
}

impl DatStore {
    /// Open a store rooted at `dir` (created lazily on install)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a console's DAT is stored at
    pub fn path_for(&self, console: &str) -> PathBuf {
        self.dir.join(dat_file_name(console))
    }

    /// Files currently in the store, sorted by name
    fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read DAT directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Build a catalog from every installed DAT.
    ///
    /// Stray and malformed files are reported and skipped.
    pub fn load(&self, header_only: bool) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        let options = IngestOptions {
            header_only,
            verify_filename: true,
        };

        for path in self.files()? {
            if let Err(e) = catalog.ingest_file(&path, options) {
                warn!("{}: {}", path.display(), e);
            }
        }

        Ok(catalog)
    }

    /// Version of the installed DAT for a console, if any
    pub fn installed_version(&self, console: &str) -> Option<String> {
        let path = self.path_for(console);
        if !path.exists() {
            return None;
        }
        DatSource::read(&path, true).ok().map(|dat| dat.version)
    }

    /// Install a DAT file into the store.
    ///
    /// The source file is moved (and unzipped if needed) into place when the
    /// outcome says so; otherwise it is left untouched.
    pub fn install(&self, source: &Path, force: bool) -> Result<(ConsoleRecord, InstallOutcome)> {
        let dat = DatSource::read(source, true)
            .with_context(|| format!("Failed to read DAT file: {}", source.display()))?;

        let installed = self.installed_version(&dat.console);
        let outcome = install_decision(&dat.version, installed.as_deref(), force);

        if outcome.installed() {
            std::fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to create DAT directory: {}", self.dir.display()))?;
            let dest = self.path_for(&dat.console);
            ArchiveTransform::new(false)
                .apply(source, &dest)
                .with_context(|| format!("Failed to install DAT file to {}", dest.display()))?;
            info!(console = %dat.console, version = %dat.version, "Installed DAT file");
        }

        let record = ConsoleRecord {
            name: dat.console,
            version: dat.version,
        };
        Ok((record, outcome))
    }

    /// Remove the installed DAT for a console.
    ///
    /// Returns false when nothing was installed.
    pub fn remove(&self, console: &str) -> Result<bool> {
        let path = self.path_for(console);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove DAT file: {}", path.display()))?;
        info!(%console, "Removed DAT file");
        Ok(true)
    }
}
