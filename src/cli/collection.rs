//! Collection directory commands: `collection-add`, `collection-remove`,
//! `collection-missing`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::{known_console, load_catalog};
use crate::catalog::DatStore;
use crate::config::{Paths, SettingsStore};
use crate::organize::{missing_in_collection, MissingReport};

/// A console's collection directory before and after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange {
    pub console: String,
    pub previous: Option<PathBuf>,
    pub current: Option<PathBuf>,
}

/// Map a console to `dir`, creating and canonicalizing the directory
pub fn assign(paths: &Paths, console: &str, dir: &Path) -> Result<CollectionChange> {
    let consoles = DatStore::new(&paths.dat_dir).load(true)?.consoles();
    let full = known_console(console, &consoles)?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", dir.display()))?;

    let mut store = SettingsStore::load(&paths.config_file)?;
    let previous = store.set_collection(&full, dir.clone());
    store.save()?;

    Ok(CollectionChange {
        console: full,
        previous,
        current: Some(dir),
    })
}

/// Drop a console's collection directory.
///
/// Consoles whose DAT was removed can still be named here.
pub fn unassign(paths: &Paths, console: &str) -> Result<CollectionChange> {
    let mut store = SettingsStore::load(&paths.config_file)?;

    let mut known: BTreeSet<String> = DatStore::new(&paths.dat_dir).load(true)?.consoles();
    known.extend(store.collections().keys().cloned());
    let full = known_console(console, &known).unwrap_or_else(|_| console.to_string());

    let previous = store.remove_collection(&full);
    if previous.is_some() {
        store.save()?;
    }

    Ok(CollectionChange {
        console: full,
        previous,
        current: None,
    })
}

/// Set a console's collection directory
pub fn add(paths: &Paths, console: &str, dir: &Path) -> Result<()> {
    let change = assign(paths, console, dir)?;

    println!("Console: {}", change.console);
    if let Some(old) = &change.previous {
        println!("Old path: {}", old.display());
    }
    if let Some(new) = &change.current {
        println!("New path: {}", new.display());
    }
    Ok(())
}

/// Unset a console's collection directory
pub fn remove(paths: &Paths, console: &str) -> Result<()> {
    let change = unassign(paths, console)?;

    match change.previous {
        Some(old) => println!(
            "Removed collection directory for {}: {}",
            change.console,
            old.display()
        ),
        None => println!("No collection directory set for {}", change.console),
    }
    Ok(())
}

/// Report catalog entries absent from collection directories
pub async fn missing(paths: &Paths, console: Option<&str>, json: bool) -> Result<()> {
    let store = SettingsStore::load(&paths.config_file)?;
    let catalog = load_catalog(paths, None).await?;
    let consoles = catalog.consoles();

    let targets: Vec<(String, PathBuf)> = match console {
        Some(name) => {
            let full = known_console(name, &consoles)?;
            let Some(dir) = store.collections().get(&full) else {
                anyhow::bail!("No collection directory set for {}", full);
            };
            vec![(full, dir.clone())]
        }
        None => store
            .collections()
            .iter()
            .filter(|(c, _)| consoles.contains(*c))
            .map(|(c, d)| (c.clone(), d.clone()))
            .collect(),
    };

    if targets.is_empty() {
        println!("No collection directories configured. Use 'romverify collection-add'.");
        return Ok(());
    }

    let catalog = Arc::new(catalog);
    let mut reports: Vec<MissingReport> = Vec::with_capacity(targets.len());
    for (console, dir) in targets {
        let catalog = Arc::clone(&catalog);
        let report = tokio::task::spawn_blocking(move || {
            missing_in_collection(&catalog, &console, &dir)
        })
        .await??;
        reports.push(report);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!("{} ({})", report.console, report.dir.display());
        println!("  Present: {}/{}", report.present, report.total());
        if !report.missing.is_empty() {
            println!("  Missing:");
            for entry in &report.missing {
                println!("    {}", entry.name);
            }
        }
    }

    Ok(())
}
