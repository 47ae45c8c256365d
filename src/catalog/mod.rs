//! In-memory ROM catalog built from DAT files.
//!
//! The catalog maps a content checksum to the console and canonical file
//! name declared for it. It is built once per invocation by ingesting DAT
//! sources and is read-only afterwards.
//!
//! # Ingestion rules
//!
//! - Later sources win: a checksum declared twice keeps the last entry.
//! - A source that fails to parse, or whose console name does not match its
//!   file name when verification is requested, leaves the catalog untouched.
//! - Ingesting a console again replaces its [`ConsoleRecord`].

pub mod checksum;
pub mod dat;
pub mod store;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use checksum::Checksum;
pub use dat::{dat_file_name, DatRom, DatSource};
pub use store::{DatStore, InstallOutcome};

/// Errors that reject a single DAT source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid DAT file: {0}")]
    Parse(String),

    #[error("Unreadable DAT file: {0}")]
    Unreadable(String),

    #[error("Stray file ignored: {file_name} (declares console \"{console}\")")]
    Stray { file_name: String, console: String },
}

/// A checksum resolved to its canonical identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumEntry {
    pub checksum: Checksum,
    pub console: String,
    pub name: String,
}

/// Installed database version for one console
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleRecord {
    pub name: String,
    pub version: String,
}

/// Options controlling how a DAT file is ingested
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Only register the console header, skip ROM entries
    pub header_only: bool,

    /// Reject files whose name does not match the declared console
    pub verify_filename: bool,
}

/// Checksum catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    consoles: BTreeMap<String, ConsoleRecord>,
    entries: HashMap<Checksum, ChecksumEntry>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-parsed source
    pub fn ingest(&mut self, source: DatSource) -> ConsoleRecord {
        let record = ConsoleRecord {
            name: source.console.clone(),
            version: source.version,
        };
        self.consoles.insert(record.name.clone(), record.clone());

        for rom in source.roms {
            let entry = ChecksumEntry {
                checksum: rom.checksum.clone(),
                console: source.console.clone(),
                name: rom.name,
            };
            if let Some(previous) = self.entries.insert(rom.checksum, entry) {
                debug!(
                    checksum = %previous.checksum,
                    previous_console = %previous.console,
                    console = %source.console,
                    "Checksum redeclared, keeping the later entry"
                );
            }
        }

        record
    }

    /// Parse a DAT file and ingest it.
    ///
    /// Nothing is mutated when this returns an error.
    pub fn ingest_file(
        &mut self,
        path: &Path,
        options: IngestOptions,
    ) -> Result<ConsoleRecord, SourceError> {
        let source = DatSource::read(path, options.header_only)?;

        if options.verify_filename {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if dat_file_name(&source.console) != file_name {
                return Err(SourceError::Stray {
                    file_name,
                    console: source.console,
                });
            }
        }

        Ok(self.ingest(source))
    }

    /// Look up a checksum
    pub fn lookup(&self, checksum: &Checksum) -> Option<&ChecksumEntry> {
        self.entries.get(checksum)
    }

    /// Names of every ingested console
    pub fn consoles(&self) -> BTreeSet<String> {
        self.consoles.keys().cloned().collect()
    }

    /// Console records in name order
    pub fn console_records(&self) -> impl Iterator<Item = &ConsoleRecord> {
        self.consoles.values()
    }

    /// Record for a single console
    pub fn console(&self, name: &str) -> Option<&ConsoleRecord> {
        self.consoles.get(name)
    }

    /// Entries belonging to one console, sorted by name
    pub fn entries_for(&self, console: &str) -> Vec<&ChecksumEntry> {
        let mut entries: Vec<_> = self
            .entries
            .values()
            .filter(|e| e.console == console)
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Number of checksum entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no checksum entries were ingested
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether no console was ingested
    pub fn has_consoles(&self) -> bool {
        !self.consoles.is_empty()
    }
}
