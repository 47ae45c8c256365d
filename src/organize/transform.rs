//! Move, rename, and repack ROM files.
//!
//! Which strategy runs depends on whether the source is a single-entry
//! archive and whether compression is requested:
//!
//! | source  | compress | strategy                                          |
//! |---------|----------|---------------------------------------------------|
//! | raw     | no       | [`Strategy::Move`]: rename (copy across devices)  |
//! | archive | no       | [`Strategy::Extract`]: unzip to the destination   |
//! | archive | yes      | [`Strategy::KeepArchive`] if the entry name is already right |
//! | archive | yes      | [`Strategy::Repack`]: extract beside the destination, then compress |
//! | raw     | yes      | [`Strategy::Compress`]: write a new deflated zip  |
//!
//! Every new file is written to a temporary name in the destination directory
//! and renamed into place, and a source is only removed after the file that
//! replaces it is complete. The one intermediate that outlives a failure is
//! the `*.romverify-extract` file of a repack, which then holds the full
//! payload and can be organized again like any raw ROM.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::content::{ContentError, RomSource};

/// Suffix of the extracted payload kept between the steps of a repack
pub const EXTRACT_SUFFIX: &str = ".romverify-extract";

/// Suffix of in-flight writes, removed automatically on failure
pub const TEMP_SUFFIX: &str = ".romverify-tmp";

/// Errors raised while transforming a file
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Destination has no file name: {0}")]
    InvalidDestination(PathBuf),
}

fn io_error<'a>(
    action: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> TransformError + 'a {
    move |source| TransformError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// Which transformation was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Move,
    Extract,
    KeepArchive,
    Repack,
    Compress,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Move => write!(f, "moved"),
            Strategy::Extract => write!(f, "extracted"),
            Strategy::KeepArchive => write!(f, "kept original zip"),
            Strategy::Repack => write!(f, "repacked"),
            Strategy::Compress => write!(f, "compressed"),
        }
    }
}

/// Final location of a transformed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformResult {
    pub path: PathBuf,
    pub strategy: Strategy,
}

/// Path of the zip that a compressed destination ends up at
pub fn archive_path(dest: &Path) -> PathBuf {
    dest.with_extension("zip")
}

/// Path of the intermediate file a repack extracts to
pub fn extract_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(EXTRACT_SUFFIX);
    dest.with_file_name(name)
}

/// Repack intermediates left in a directory by an interrupted run
pub fn leftover_extracts(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().ends_with(EXTRACT_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    found
}

/// Moves a ROM to its destination in the requested storage form
#[derive(Debug, Clone, Copy)]
pub struct ArchiveTransform {
    compress: bool,
}

impl ArchiveTransform {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    /// Probe `source` and transform it to `dest`.
    ///
    /// `dest` is the uncompressed destination path; with compression the
    /// result lands at [`archive_path`] of it.
    pub fn apply(&self, source: &Path, dest: &Path) -> Result<TransformResult, TransformError> {
        let rom = RomSource::probe(source)?;
        self.apply_source(&rom, dest)
    }

    /// Transform an already probed source
    pub fn apply_source(
        &self,
        rom: &RomSource,
        dest: &Path,
    ) -> Result<TransformResult, TransformError> {
        let dest_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransformError::InvalidDestination(dest.to_path_buf()))?;

        let (path, strategy) = match (rom, self.compress) {
            (RomSource::Raw(source), false) => {
                move_file(source, dest)?;
                (dest.to_path_buf(), Strategy::Move)
            }
            (RomSource::Archive { path: source, .. }, false) => {
                extract_to(rom, dest)?;
                remove_replaced(source, dest)?;
                (dest.to_path_buf(), Strategy::Extract)
            }
            (RomSource::Archive { path: source, entry }, true) if *entry == dest_name => {
                let zip = archive_path(dest);
                move_file(source, &zip)?;
                (zip, Strategy::KeepArchive)
            }
            (RomSource::Archive { path: source, .. }, true) => {
                let zip = archive_path(dest);
                let extracted = extract_path(dest);
                extract_to(rom, &extracted)?;
                remove_replaced(source, &extracted)?;
                debug!(path = %extracted.display(), "Extracted for repack");

                write_archive(&extracted, &dest_name, &zip)?;
                remove_replaced(&extracted, &zip)?;
                (zip, Strategy::Repack)
            }
            (RomSource::Raw(source), true) => {
                let zip = archive_path(dest);
                write_archive(source, &dest_name, &zip)?;
                remove_replaced(source, &zip)?;
                (zip, Strategy::Compress)
            }
        };

        Ok(TransformResult { path, strategy })
    }
}

/// Directory a path lives in, `.` for bare file names
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Whether two paths name the same directory entry.
///
/// Only the parents are canonicalized, so this works for a destination that
/// does not exist yet and does not follow a symlink in the last component.
fn same_location(a: &Path, b: &Path) -> bool {
    if a.file_name() != b.file_name() {
        return false;
    }
    match (
        fs::canonicalize(parent_dir(a)),
        fs::canonicalize(parent_dir(b)),
    ) {
        (Ok(pa), Ok(pb)) => pa == pb,
        _ => a == b,
    }
}

/// Remove `source` once `replacement` exists, unless they are the same file
fn remove_replaced(source: &Path, replacement: &Path) -> Result<(), TransformError> {
    if same_location(source, replacement) {
        return Ok(());
    }
    fs::remove_file(source).map_err(io_error("remove", source))
}

/// Temp file beside `dest`, deleted if dropped before being persisted
fn temp_beside(dest: &Path) -> Result<NamedTempFile, TransformError> {
    let dir = parent_dir(dest);
    Builder::new()
        .prefix(".")
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(io_error("create temporary file in", dir))
}

fn commit(tmp: NamedTempFile, dest: &Path) -> Result<(), TransformError> {
    tmp.as_file().sync_all().map_err(io_error("sync", tmp.path()))?;

    #[cfg(test)]
    fail_point::check(dest).map_err(io_error("commit", dest))?;

    tmp.persist(dest)
        .map(|_| ())
        .map_err(|e| TransformError::Io {
            action: "rename into",
            path: dest.to_path_buf(),
            source: e.error,
        })
}

fn move_file(source: &Path, dest: &Path) -> Result<(), TransformError> {
    if same_location(source, dest) {
        return Ok(());
    }

    match rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Usually a cross-device move; copy beside the destination instead
            debug!(source = %source.display(), error = %e, "Rename failed, copying");
            let mut tmp = temp_beside(dest)?;
            let mut input = File::open(source).map_err(io_error("open", source))?;
            io::copy(&mut input, tmp.as_file_mut()).map_err(io_error("copy", source))?;
            commit(tmp, dest)?;
            fs::remove_file(source).map_err(io_error("remove", source))
        }
    }
}

fn rename(source: &Path, dest: &Path) -> io::Result<()> {
    #[cfg(test)]
    fail_point::check_rename(dest)?;

    fs::rename(source, dest)
}

/// Stream the payload of `rom` into a new file at `dest`
fn extract_to(rom: &RomSource, dest: &Path) -> Result<(), TransformError> {
    let mut tmp = temp_beside(dest)?;
    let file = tmp.as_file_mut();
    rom.read_with(|reader| io::copy(reader, file))?;
    commit(tmp, dest)
}

/// Write `source` as the single deflated entry `entry_name` of a new zip
fn write_archive(source: &Path, entry_name: &str, zip_path: &Path) -> Result<(), TransformError> {
    let zip_error = |source| TransformError::Zip {
        path: zip_path.to_path_buf(),
        source,
    };

    let mut input = File::open(source).map_err(io_error("open", source))?;
    let size = input
        .metadata()
        .map_err(io_error("stat", source))?
        .len();

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size >= u64::from(u32::MAX));

    let mut writer = ZipWriter::new(temp_beside(zip_path)?);
    writer.start_file(entry_name, options).map_err(zip_error)?;
    io::copy(&mut input, &mut writer).map_err(io_error("compress", source))?;
    let tmp = writer.finish().map_err(zip_error)?;

    commit(tmp, zip_path)
}

#[cfg(test)]
mod fail_point {
    //! Fails the next commit (or rename) whose destination ends with a
    //! given suffix.

    use std::cell::RefCell;
    use std::io;
    use std::path::Path;

    thread_local! {
        static FAIL_ON: RefCell<Option<String>> = const { RefCell::new(None) };
        static FAIL_RENAME_ON: RefCell<Option<String>> = const { RefCell::new(None) };
    }

    pub fn arm(suffix: &str) {
        FAIL_ON.with(|f| *f.borrow_mut() = Some(suffix.to_string()));
    }

    pub fn arm_rename(suffix: &str) {
        FAIL_RENAME_ON.with(|f| *f.borrow_mut() = Some(suffix.to_string()));
    }

    pub fn check(dest: &Path) -> io::Result<()> {
        FAIL_ON.with(|f| trip(&mut f.borrow_mut(), dest))
    }

    pub fn check_rename(dest: &Path) -> io::Result<()> {
        FAIL_RENAME_ON.with(|f| trip(&mut f.borrow_mut(), dest))
    }

    fn trip(armed: &mut Option<String>, dest: &Path) -> io::Result<()> {
        match armed.as_deref() {
            Some(suffix) if dest.to_string_lossy().ends_with(suffix) => {
                *armed = None;
                Err(io::Error::new(io::ErrorKind::Other, "injected failure"))
            }
            _ => Ok(()),
        }
    }
}
