//! romverify - ROM identification and organization with No-Intro DAT files
//!
//! Identifies ROM files by the SHA-1 of their content, looks the checksum up
//! in a catalog built from No-Intro DAT files, and renames or moves matched
//! files to their canonical name inside a per-console collection directory.
//!
//! # Architecture
//!
//! - Content is hashed the same way whether it is stored raw or as the
//!   single entry of a zip container
//! - The catalog is built once per invocation and is read-only afterwards
//! - Every filesystem change writes a complete new file before the old one
//!   is removed
//!
//! # Modules
//!
//! - `content`: archive-transparent reading and checksums
//! - `catalog`: DAT parsing, installed DAT store, checksum catalog
//! - `organize`: destination resolution, archive transforms, batch engine
//! - `config`: paths and persisted settings
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Install a DAT file
//! romverify dat-add "Nintendo - Game Boy (20240101-000000).zip"
//!
//! # Set where Game Boy ROMs go
//! romverify collection-add "Game Boy" ~/roms/gb
//!
//! # Identify and move ROMs
//! romverify organize ~/Downloads/*.gb
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod content;
pub mod organize;

// Re-export main types at crate root for convenience
pub use catalog::{Catalog, Checksum, ChecksumEntry, ConsoleRecord, DatSource, DatStore};
pub use config::{Paths, Settings, SettingsStore};
pub use content::{compute_checksum, RomSource};
pub use organize::{
    ArchiveTransform, BatchSummary, EngineOptions, FileOutcome, FileStatus, Mode,
    ReorganizationEngine, Strategy,
};
