//! Report catalog entries absent from a collection directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use super::engine::skip_reason;
use crate::catalog::{Catalog, Checksum, ChecksumEntry};
use crate::content::compute_checksum;

/// Collection completeness for one console
#[derive(Debug, Clone, Serialize)]
pub struct MissingReport {
    pub console: String,
    pub dir: PathBuf,

    /// Catalog entries of this console found in the directory
    pub present: usize,

    /// Catalog entries of this console not found, sorted by name
    pub missing: Vec<ChecksumEntry>,
}

impl MissingReport {
    /// Total entries the catalog lists for the console
    pub fn total(&self) -> usize {
        self.present + self.missing.len()
    }
}

/// Hash every regular file directly inside `dir` and compare against the
/// catalog entries of `console`.
///
/// Unreadable files are logged and ignored.
pub fn missing_in_collection(catalog: &Catalog, console: &str, dir: &Path) -> Result<MissingReport> {
    let mut found: HashSet<Checksum> = HashSet::new();

    if dir.exists() {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read collection directory: {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if skip_reason(&path).is_some() {
                continue;
            }
            match compute_checksum(&path) {
                Ok(checksum) => {
                    found.insert(checksum);
                }
                Err(e) => warn!("{}", e),
            }
        }
    } else {
        warn!(dir = %dir.display(), "Collection directory does not exist");
    }

    let (present, missing): (Vec<&ChecksumEntry>, Vec<&ChecksumEntry>) = catalog
        .entries_for(console)
        .into_iter()
        .partition(|e| found.contains(&e.checksum));

    Ok(MissingReport {
        console: console.to_string(),
        dir: dir.to_path_buf(),
        present: present.len(),
        missing: missing.into_iter().cloned().collect(),
    })
}
