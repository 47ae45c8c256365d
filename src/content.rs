//! Archive-transparent access to ROM content.
//!
//! A ROM on disk is either a raw image or a zip archive holding exactly one
//! entry. [`RomSource`] resolves which one a path is once, and every read
//! afterwards goes through the same capability so checksums never depend on
//! how the payload happens to be stored.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use thiserror::Error;
use zip::ZipArchive;

use crate::catalog::Checksum;

/// Read size used when streaming content through the digest.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Errors raised while reading ROM content
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Archive must contain exactly one file, found {entries}: {path}")]
    InvalidContainer { path: PathBuf, entries: usize },

    #[error("Failed to read archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ContentError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(path: &Path, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where the payload of a ROM file lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RomSource {
    /// Plain file, read as-is
    Raw(PathBuf),

    /// Zip archive with a single entry
    Archive { path: PathBuf, entry: String },
}

impl RomSource {
    /// Classify a path, validating archive contents up front.
    ///
    /// Archives with zero or several entries fail with
    /// [`ContentError::InvalidContainer`].
    pub fn probe(path: &Path) -> Result<Self, ContentError> {
        let file = File::open(path).map_err(|e| ContentError::io(path, e))?;

        let mut archive = match ZipArchive::new(BufReader::new(file)) {
            Ok(archive) => archive,
            Err(_) => return Ok(Self::Raw(path.to_path_buf())),
        };

        if archive.len() != 1 {
            return Err(ContentError::InvalidContainer {
                path: path.to_path_buf(),
                entries: archive.len(),
            });
        }

        let entry = archive
            .by_index(0)
            .map_err(|e| ContentError::zip(path, e))?
            .name()
            .to_string();

        Ok(Self::Archive {
            path: path.to_path_buf(),
            entry,
        })
    }

    /// Whether the payload is wrapped in an archive
    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive { .. })
    }

    /// Name of the archived entry, if any
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Self::Raw(_) => None,
            Self::Archive { entry, .. } => Some(entry),
        }
    }

    /// Run `f` over the decompressed payload.
    ///
    /// The reader handed to `f` borrows the open archive.
    pub fn read_with<T>(
        &self,
        f: impl FnOnce(&mut dyn Read) -> io::Result<T>,
    ) -> Result<T, ContentError> {
        match self {
            Self::Raw(path) => {
                let mut file = File::open(path).map_err(|e| ContentError::io(path, e))?;
                f(&mut file).map_err(|e| ContentError::io(path, e))
            }
            Self::Archive { path, .. } => {
                let file = File::open(path).map_err(|e| ContentError::io(path, e))?;
                let mut archive =
                    ZipArchive::new(BufReader::new(file)).map_err(|e| ContentError::zip(path, e))?;

                // The archive may have changed since probing
                if archive.len() != 1 {
                    return Err(ContentError::InvalidContainer {
                        path: path.clone(),
                        entries: archive.len(),
                    });
                }

                let mut entry = archive
                    .by_index(0)
                    .map_err(|e| ContentError::zip(path, e))?;
                f(&mut entry).map_err(|e| ContentError::io(path, e))
            }
        }
    }

    /// SHA-1 over the decompressed payload, as uppercase hex.
    pub fn checksum(&self) -> Result<Checksum, ContentError> {
        self.read_with(|reader| {
            let mut hasher = Sha1::new();
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(Checksum::from_digest(&hasher.finalize()))
        })
    }

    /// Read the whole payload into a string (used for DAT sources).
    pub fn read_to_string(&self) -> Result<String, ContentError> {
        self.read_with(|reader| {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            Ok(text)
        })
    }
}

/// Probe a path and compute its checksum in one step.
pub fn compute_checksum(path: &Path) -> Result<Checksum, ContentError> {
    RomSource::probe(path)?.checksum()
}
