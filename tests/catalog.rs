//! Catalog Integration Tests
//!
//! Tests for loading installed DAT files and managing the DAT store.

use std::io::Write;
use std::path::Path;

use romverify::catalog::{DatStore, InstallOutcome};
use romverify::Checksum;
use tempfile::TempDir;

fn dat_text(console: &str, version: &str, roms: &[(&str, char)]) -> String {
    let mut games = String::new();
    for (name, c) in roms {
        games.push_str(&format!(
            "  <game name=\"{name}\">\n    <rom name=\"{name}\" sha1=\"{}\"/>\n  </game>\n",
            c.to_string().repeat(40)
        ));
    }
    format!(
        "<?xml version=\"1.0\"?>\n<datafile>\n  <header>\n    <name>{console}</name>\n    <version>{version}</version>\n  </header>\n{games}</datafile>\n"
    )
}

fn write_zip(path: &Path, entry: &str, content: &[u8]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(entry, zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(content).unwrap();
    zip.finish().unwrap();
}

fn sum(c: char) -> Checksum {
    Checksum::parse(&c.to_string().repeat(40)).unwrap()
}

#[test]
fn test_load_installed_dats() {
    let temp = TempDir::new().unwrap();
    let store = DatStore::new(temp.path());
    std::fs::write(
        store.path_for("Nintendo - Game Boy"),
        dat_text("Nintendo - Game Boy", "20240101", &[("Tetris.gb", 'a')]),
    )
    .unwrap();
    std::fs::write(
        store.path_for("Sega - Game Gear"),
        dat_text("Sega - Game Gear", "20240202", &[("Sonic.gg", 'b')]),
    )
    .unwrap();

    let catalog = store.load(false).unwrap();
    assert_eq!(catalog.consoles().len(), 2);

    let entry = catalog.lookup(&sum('a')).unwrap();
    assert_eq!(entry.console, "Nintendo - Game Boy");
    assert_eq!(entry.name, "Tetris.gb");
    assert_eq!(catalog.lookup(&sum('b')).unwrap().name, "Sonic.gg");
    assert!(catalog.lookup(&sum('c')).is_none());
}

#[test]
fn test_missing_store_is_empty() {
    let temp = TempDir::new().unwrap();
    let catalog = DatStore::new(temp.path().join("nope")).load(false).unwrap();
    assert!(!catalog.has_consoles());
}

#[test]
fn test_stray_and_malformed_files_skipped() {
    let temp = TempDir::new().unwrap();
    let store = DatStore::new(temp.path());

    std::fs::write(
        store.path_for("Nintendo - Game Boy"),
        dat_text("Nintendo - Game Boy", "1", &[("Tetris.gb", 'a')]),
    )
    .unwrap();
    // File name does not match the console it declares
    std::fs::write(
        temp.path().join("renamed.dat"),
        dat_text("Sega - Game Gear", "1", &[("Sonic.gg", 'b')]),
    )
    .unwrap();
    std::fs::write(temp.path().join("Broken.dat"), "<datafile><header>").unwrap();

    let catalog = store.load(false).unwrap();
    assert_eq!(
        catalog.consoles().into_iter().collect::<Vec<_>>(),
        vec!["Nintendo - Game Boy".to_string()]
    );
    assert!(catalog.lookup(&sum('b')).is_none());
}

#[test]
fn test_header_only_load() {
    let temp = TempDir::new().unwrap();
    let store = DatStore::new(temp.path());
    std::fs::write(
        store.path_for("Nintendo - Game Boy"),
        dat_text("Nintendo - Game Boy", "7", &[("Tetris.gb", 'a')]),
    )
    .unwrap();

    let catalog = store.load(true).unwrap();
    assert_eq!(catalog.console("Nintendo - Game Boy").unwrap().version, "7");
    assert!(catalog.is_empty());
}

#[test]
fn test_later_file_wins_for_shared_checksum() {
    let temp = TempDir::new().unwrap();
    let store = DatStore::new(temp.path());
    std::fs::write(
        store.path_for("A - X"),
        dat_text("A - X", "1", &[("First.bin", 'a')]),
    )
    .unwrap();
    std::fs::write(
        store.path_for("B - X"),
        dat_text("B - X", "1", &[("Second.bin", 'a')]),
    )
    .unwrap();

    // Files load in name order, so "B - X.dat" comes last
    let entry = store.load(false).unwrap().lookup(&sum('a')).cloned().unwrap();
    assert_eq!(entry.console, "B - X");
    assert_eq!(entry.name, "Second.bin");
}

#[test]
fn test_install_update_and_force() {
    let temp = TempDir::new().unwrap();
    let incoming = temp.path().join("incoming");
    std::fs::create_dir_all(&incoming).unwrap();
    let store = DatStore::new(temp.path().join("dats"));

    let first = incoming.join("gb-1.dat");
    std::fs::write(&first, dat_text("Nintendo - Game Boy", "20240101", &[])).unwrap();
    let (record, outcome) = store.install(&first, false).unwrap();
    assert_eq!(record.name, "Nintendo - Game Boy");
    assert_eq!(outcome, InstallOutcome::Installed);
    assert!(!first.exists());
    assert!(store.path_for("Nintendo - Game Boy").exists());

    // Same version is skipped and the source stays in place
    let same = incoming.join("gb-same.dat");
    std::fs::write(&same, dat_text("Nintendo - Game Boy", "20240101", &[])).unwrap();
    let (_, outcome) = store.install(&same, false).unwrap();
    assert_eq!(outcome, InstallOutcome::UpToDate);
    assert!(same.exists());

    let newer = incoming.join("gb-2.dat");
    std::fs::write(&newer, dat_text("Nintendo - Game Boy", "20240301", &[])).unwrap();
    let (_, outcome) = store.install(&newer, false).unwrap();
    assert_eq!(
        outcome,
        InstallOutcome::Updated {
            previous: "20240101".to_string()
        }
    );

    let (_, outcome) = store.install(&same, false).unwrap();
    assert_eq!(
        outcome,
        InstallOutcome::InstalledIsNewer {
            installed: "20240301".to_string()
        }
    );

    let (_, outcome) = store.install(&same, true).unwrap();
    assert_eq!(
        outcome,
        InstallOutcome::Overwrote {
            previous: "20240301".to_string()
        }
    );
    assert_eq!(
        store.installed_version("Nintendo - Game Boy").as_deref(),
        Some("20240101")
    );
}

#[test]
fn test_install_zipped_dat_is_extracted() {
    let temp = TempDir::new().unwrap();
    let store = DatStore::new(temp.path().join("dats"));

    let zipped = temp.path().join("Nintendo - Game Boy (20240101).zip");
    write_zip(
        &zipped,
        "Nintendo - Game Boy (20240101).dat",
        dat_text("Nintendo - Game Boy", "20240101", &[("Tetris.gb", 'a')]).as_bytes(),
    );

    let (_, outcome) = store.install(&zipped, false).unwrap();
    assert_eq!(outcome, InstallOutcome::Installed);
    assert!(!zipped.exists());

    let installed = std::fs::read_to_string(store.path_for("Nintendo - Game Boy")).unwrap();
    assert!(installed.contains("<datafile>"));
    assert!(store.load(false).unwrap().lookup(&sum('a')).is_some());
}

#[test]
fn test_install_console_with_slash() {
    let temp = TempDir::new().unwrap();
    let store = DatStore::new(temp.path().join("dats"));
    let source = temp.path().join("pc.dat");
    std::fs::write(&source, dat_text("IBM - PC/AT", "1", &[])).unwrap();

    store.install(&source, false).unwrap();
    assert!(temp.path().join("dats").join("IBM - PC_AT.dat").exists());
    assert!(store.load(true).unwrap().console("IBM - PC/AT").is_some());
}

#[test]
fn test_install_invalid_dat_fails() {
    let temp = TempDir::new().unwrap();
    let store = DatStore::new(temp.path().join("dats"));
    let source = temp.path().join("junk.dat");
    std::fs::write(&source, "not xml at all").unwrap();

    assert!(store.install(&source, false).is_err());
    assert!(source.exists());
}

#[test]
fn test_remove() {
    let temp = TempDir::new().unwrap();
    let store = DatStore::new(temp.path());
    std::fs::write(
        store.path_for("Nintendo - Game Boy"),
        dat_text("Nintendo - Game Boy", "1", &[]),
    )
    .unwrap();

    assert!(store.remove("Nintendo - Game Boy").unwrap());
    assert!(!store.remove("Nintendo - Game Boy").unwrap());
    assert!(!store.load(true).unwrap().has_consoles());
}
