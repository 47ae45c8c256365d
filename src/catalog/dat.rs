//! No-Intro DAT parsing.
//!
//! A DAT is an XML document with a `header` naming the console and its
//! database version, followed by one `game` element per known ROM.

use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};

use super::checksum::Checksum;
use super::SourceError;
use crate::content::RomSource;

/// A single known-good ROM declared by a DAT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatRom {
    pub checksum: Checksum,
    pub name: String,
}

/// Parsed contents of one DAT file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatSource {
    /// Console display name from the header
    pub console: String,

    /// Database version string from the header
    pub version: String,

    /// ROM entries (empty when only the header was read)
    pub roms: Vec<DatRom>,
}

impl DatSource {
    /// Parse DAT text.
    ///
    /// With `header_only` the game list is not collected.
    pub fn parse(text: &str, header_only: bool) -> Result<Self, SourceError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options)
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        let root = doc.root_element();

        let header = child(root, "header")
            .ok_or_else(|| SourceError::Parse("missing <header> element".to_string()))?;
        let console = child_text(header, "name")
            .ok_or_else(|| SourceError::Parse("missing header <name>".to_string()))?;
        let version = child_text(header, "version")
            .ok_or_else(|| SourceError::Parse("missing header <version>".to_string()))?;

        let roms = if header_only {
            Vec::new()
        } else {
            root.children()
                .filter(|n| n.has_tag_name("game"))
                .filter_map(|game| child(game, "rom"))
                .filter_map(|rom| {
                    let name = rom.attribute("name")?;
                    let checksum = Checksum::parse(rom.attribute("sha1")?)?;
                    Some(DatRom {
                        checksum,
                        name: name.to_string(),
                    })
                })
                .collect()
        };

        Ok(Self {
            console,
            version,
            roms,
        })
    }

    /// Read and parse a DAT file, which may itself be zipped.
    pub fn read(path: &Path, header_only: bool) -> Result<Self, SourceError> {
        let text = RomSource::probe(path)
            .and_then(|source| source.read_to_string())
            .map_err(|e| SourceError::Unreadable(e.to_string()))?;
        Self::parse(&text, header_only)
    }
}

/// File name a console's DAT is stored under.
///
/// Path separators in the display name would escape the store directory.
pub fn dat_file_name(console: &str) -> String {
    format!("{}.dat", console.replace('/', "_"))
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
