//! Archive Transform Integration Tests
//!
//! Tests for the five move/extract/repack cases and identification of
//! zipped content.

use std::io::{Read, Write};
use std::path::Path;

use romverify::content::{compute_checksum, RomSource};
use romverify::organize::transform::{extract_path, leftover_extracts};
use romverify::organize::{ArchiveTransform, Strategy};
use tempfile::TempDir;

const PAYLOAD: &[u8] = b"NINTENDO GAME BOY PAYLOAD \x00\x01\x02\x03";

fn write_zip(path: &Path, entry: &str, content: &[u8]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(entry, zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(content).unwrap();
    zip.finish().unwrap();
}

fn read_zip(path: &Path) -> (String, Vec<u8>) {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_index(0).unwrap();
    let name = entry.name().to_string();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    (name, data)
}

#[test]
fn test_zip_and_raw_identify_identically() {
    let temp = TempDir::new().unwrap();
    let raw = temp.path().join("a.gb");
    let zipped = temp.path().join("b.zip");
    std::fs::write(&raw, PAYLOAD).unwrap();
    write_zip(&zipped, "whatever.gb", PAYLOAD);

    assert_eq!(
        compute_checksum(&raw).unwrap(),
        compute_checksum(&zipped).unwrap()
    );
}

#[test]
fn test_raw_move_without_compression() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("dl.bin");
    std::fs::write(&source, PAYLOAD).unwrap();
    let dest = temp.path().join("out").join("Tetris.gb");
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();

    let result = ArchiveTransform::new(false).apply(&source, &dest).unwrap();
    assert_eq!(result.strategy, Strategy::Move);
    assert_eq!(result.path, dest);
    assert!(!source.exists());
    assert_eq!(std::fs::read(&dest).unwrap(), PAYLOAD);
}

#[test]
fn test_archive_extracted_without_compression() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("dl.zip");
    write_zip(&source, "junk.gb", PAYLOAD);
    let dest = temp.path().join("Tetris.gb");

    let result = ArchiveTransform::new(false).apply(&source, &dest).unwrap();
    assert_eq!(result.strategy, Strategy::Extract);
    assert!(!source.exists());
    assert_eq!(std::fs::read(&dest).unwrap(), PAYLOAD);
}

#[test]
fn test_archive_with_right_entry_is_moved_as_is() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("dl.zip");
    write_zip(&source, "Tetris.gb", PAYLOAD);
    let original = std::fs::read(&source).unwrap();
    let dest = temp.path().join("sorted").join("Tetris.gb");
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();

    let result = ArchiveTransform::new(true).apply(&source, &dest).unwrap();
    assert_eq!(result.strategy, Strategy::KeepArchive);
    assert_eq!(result.path, temp.path().join("sorted").join("Tetris.zip"));
    assert!(!source.exists());
    assert_eq!(std::fs::read(&result.path).unwrap(), original);
}

#[test]
fn test_archive_already_in_place_is_untouched() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("Tetris.zip");
    write_zip(&source, "Tetris.gb", PAYLOAD);
    let original = std::fs::read(&source).unwrap();

    let transform = ArchiveTransform::new(true);
    for _ in 0..2 {
        let result = transform
            .apply(&source, &temp.path().join("Tetris.gb"))
            .unwrap();
        assert_eq!(result.strategy, Strategy::KeepArchive);
        assert_eq!(result.path, source);
    }
    assert_eq!(std::fs::read(&source).unwrap(), original);
}

#[test]
fn test_archive_with_wrong_entry_is_repacked() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("dl.zip");
    write_zip(&source, "junk.bin", PAYLOAD);
    let dest = temp.path().join("Tetris.gb");

    let result = ArchiveTransform::new(true).apply(&source, &dest).unwrap();
    assert_eq!(result.strategy, Strategy::Repack);
    assert_eq!(result.path, temp.path().join("Tetris.zip"));
    assert!(!source.exists());
    assert!(!extract_path(&dest).exists());
    assert!(leftover_extracts(temp.path()).is_empty());

    let (name, data) = read_zip(&result.path);
    assert_eq!(name, "Tetris.gb");
    assert_eq!(data, PAYLOAD);
}

#[test]
fn test_raw_compressed() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("dl.bin");
    std::fs::write(&source, PAYLOAD).unwrap();
    let dest = temp.path().join("Tetris (World).gb");

    let result = ArchiveTransform::new(true).apply(&source, &dest).unwrap();
    assert_eq!(result.strategy, Strategy::Compress);
    assert_eq!(result.path, temp.path().join("Tetris (World).zip"));
    assert!(!source.exists());

    let (name, data) = read_zip(&result.path);
    assert_eq!(name, "Tetris (World).gb");
    assert_eq!(data, PAYLOAD);

    // The produced archive identifies like the original raw file
    let rom = RomSource::probe(&result.path).unwrap();
    assert!(rom.is_archive());
    assert_eq!(rom.entry_name(), Some("Tetris (World).gb"));
}

#[test]
fn test_multi_entry_archive_rejected_untouched() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("two.zip");
    {
        let file = std::fs::File::create(&source).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for name in ["a.gb", "b.gb"] {
            zip.start_file(name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(PAYLOAD).unwrap();
        }
        zip.finish().unwrap();
    }
    let original = std::fs::read(&source).unwrap();

    let result = ArchiveTransform::new(true).apply(&source, &temp.path().join("Tetris.gb"));
    assert!(result.is_err());
    assert_eq!(std::fs::read(&source).unwrap(), original);
    assert!(!temp.path().join("Tetris.zip").exists());
}

#[test]
fn test_leftover_extract_can_be_organized() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("Tetris.gb");
    let leftover = extract_path(&dest);
    std::fs::write(&leftover, PAYLOAD).unwrap();
    assert_eq!(leftover_extracts(temp.path()), vec![leftover.clone()]);

    let result = ArchiveTransform::new(true).apply(&leftover, &dest).unwrap();
    assert_eq!(result.strategy, Strategy::Compress);
    assert!(!leftover.exists());
    assert!(leftover_extracts(temp.path()).is_empty());
}
