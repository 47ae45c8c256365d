//! DAT management commands: `dat-add`, `dat-remove`, `list`.

use std::path::PathBuf;

use anyhow::Result;

use super::known_console;
use crate::catalog::{ConsoleRecord, DatStore};
use crate::config::{Paths, SettingsStore};

/// Install DAT files, continuing past invalid ones
pub fn add(paths: &Paths, files: &[PathBuf], force: bool) -> Result<()> {
    let store = DatStore::new(&paths.dat_dir);

    for file in files {
        println!("Processing: {}", file.display());
        match store.install(file, force) {
            Ok((record, outcome)) => {
                println!("  Console: {}", record.name);
                println!("  Version: {}", record.version);
                println!("  {}", outcome);
            }
            Err(e) => println!("  ERROR: {:#}", e),
        }
    }

    Ok(())
}

/// Remove the installed DAT of a console, returning its full name
pub fn uninstall(paths: &Paths, console: &str) -> Result<String> {
    let store = DatStore::new(&paths.dat_dir);
    let consoles = store.load(true)?.consoles();
    let full = known_console(console, &consoles)?;

    if !store.remove(&full)? {
        anyhow::bail!("No DAT file installed for {}", full);
    }
    Ok(full)
}

pub fn remove(paths: &Paths, console: &str) -> Result<()> {
    let full = uninstall(paths, console)?;
    println!("Removed DAT file for {}", full);
    Ok(())
}

/// Installed consoles in name order, with their collection directories
pub fn installed(paths: &Paths) -> Result<Vec<(ConsoleRecord, Option<PathBuf>)>> {
    let catalog = DatStore::new(&paths.dat_dir).load(true)?;
    let settings = SettingsStore::load(&paths.config_file)?;

    Ok(catalog
        .console_records()
        .map(|record| {
            let dir = settings.collections().get(&record.name).cloned();
            (record.clone(), dir)
        })
        .collect())
}

/// List installed consoles with version and collection directory
pub fn list(paths: &Paths) -> Result<()> {
    let consoles = installed(paths)?;

    if consoles.is_empty() {
        println!("No DAT files installed. Use 'romverify dat-add <file>' to add one.");
        return Ok(());
    }

    for (record, dir) in consoles {
        println!("{}", record.name);
        println!("  Version: {}", record.version);
        if let Some(dir) = dir {
            println!("  Sort to: {}", dir.display());
        }
    }

    Ok(())
}
