//! Configuration for romverify paths and settings.
//!
//! Path sources (highest priority first):
//! 1. Environment variables (ROMVERIFY_CONFIG, ROMVERIFY_DATA_DIR)
//! 2. Platform defaults (`<config dir>/romverify/config.yaml`,
//!    `<data dir>/romverify/dats`)
//!
//! The settings file holds the console → collection directory mapping and
//! a few defaults for the organize commands:
//!
//! ```yaml
//! version: "1"
//! compress: true
//! jobs: 4
//! collections:
//!   Nintendo - Game Boy: /home/user/roms/gb
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the settings file path
pub const CONFIG_ENV: &str = "ROMVERIFY_CONFIG";

/// Environment variable overriding the installed DAT directory
pub const DATA_DIR_ENV: &str = "ROMVERIFY_DATA_DIR";

const APP_DIR: &str = "romverify";

/// Resolved locations used by the tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Settings file
    pub config_file: PathBuf,

    /// Installed DAT directory
    pub dat_dir: PathBuf,
}

impl Paths {
    /// Resolve from the environment and platform defaults
    pub fn resolve() -> Result<Self> {
        Self::with_overrides(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            std::env::var_os(DATA_DIR_ENV).map(PathBuf::from),
        )
    }

    /// Resolve with explicit overrides, falling back to platform defaults
    pub fn with_overrides(config_file: Option<PathBuf>, dat_dir: Option<PathBuf>) -> Result<Self> {
        let config_file = match config_file {
            Some(path) => path,
            None => dirs::config_dir()
                .context("Failed to determine config directory")?
                .join(APP_DIR)
                .join("config.yaml"),
        };

        let dat_dir = match dat_dir {
            Some(path) => path,
            None => dirs::data_dir()
                .context("Failed to determine data directory")?
                .join(APP_DIR)
                .join("dats"),
        };

        Ok(Self {
            config_file,
            dat_dir,
        })
    }
}

fn default_version() -> String {
    "1".to_string()
}

/// Persisted settings (matches the YAML structure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: String,

    /// Default for compressing organized files (true when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,

    /// Default worker count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Console name to collection directory
    #[serde(default)]
    pub collections: BTreeMap<String, PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            compress: None,
            jobs: None,
            collections: BTreeMap::new(),
        }
    }
}

/// Settings file with load/save
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Load settings; a missing file yields defaults
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let settings = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
            if content.trim().is_empty() {
                Settings::default()
            } else {
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse settings file: {}", path.display()))?
            }
        } else {
            Settings::default()
        };

        Ok(Self { path, settings })
    }

    /// Settings file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Collection directory mapping
    pub fn collections(&self) -> &BTreeMap<String, PathBuf> {
        &self.settings.collections
    }

    /// Set a console's collection directory, returning the previous one
    pub fn set_collection(&mut self, console: &str, dir: PathBuf) -> Option<PathBuf> {
        self.settings.collections.insert(console.to_string(), dir)
    }

    /// Remove a console's collection directory
    pub fn remove_collection(&mut self, console: &str) -> Option<PathBuf> {
        self.settings.collections.remove(console)
    }

    /// Write settings atomically
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let content = serde_yaml::to_string(&self.settings)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write settings file: {}", self.path.display()))?;

        Ok(())
    }
}
