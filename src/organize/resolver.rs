//! Console name aliases and collection directory lookup.
//!
//! Console names follow a `Vendor - Model` convention. The model part alone
//! is accepted as a shorthand unless two consoles share it.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Separator between vendor and model in a console name
pub const VENDOR_SEPARATOR: &str = " - ";

/// Short console names mapped to full names.
///
/// Ambiguous short names are kept with a `None` target so they never resolve.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, Option<String>>,
}

impl AliasTable {
    /// Derive aliases from a set of full console names
    pub fn from_consoles<I, S>(consoles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut aliases: HashMap<String, Option<String>> = HashMap::new();

        for console in consoles {
            let console = console.as_ref();
            let Some((_, short)) = console.split_once(VENDOR_SEPARATOR) else {
                continue;
            };

            match aliases.get(short) {
                Some(Some(existing)) if existing != console => {
                    aliases.insert(short.to_string(), None);
                }
                Some(_) => {}
                None => {
                    aliases.insert(short.to_string(), Some(console.to_string()));
                }
            }
        }

        Self { aliases }
    }

    /// Full console name for an unambiguous short name
    pub fn get(&self, short: &str) -> Option<&str> {
        self.aliases.get(short).and_then(|c| c.as_deref())
    }

    /// Whether a short name is known but shared by several consoles
    pub fn is_ambiguous(&self, short: &str) -> bool {
        matches!(self.aliases.get(short), Some(None))
    }
}

/// Resolve a user-supplied console name to a known full name
pub fn resolve_console<'a>(
    name: &str,
    known: impl IntoIterator<Item = &'a String>,
    aliases: &AliasTable,
) -> Option<String> {
    let mut known = known.into_iter();
    if known.any(|c| c == name) {
        return Some(name.to_string());
    }
    aliases.get(name).map(str::to_string)
}

/// Maps consoles to their collection directories
pub struct DestinationResolver<'a> {
    aliases: &'a AliasTable,
    collections: &'a BTreeMap<String, PathBuf>,
}

impl<'a> DestinationResolver<'a> {
    pub fn new(aliases: &'a AliasTable, collections: &'a BTreeMap<String, PathBuf>) -> Self {
        Self {
            aliases,
            collections,
        }
    }

    /// Collection directory for a console, by full name first and alias second
    pub fn resolve(&self, console: &str) -> Option<PathBuf> {
        if let Some(dir) = self.collections.get(console) {
            return Some(dir.clone());
        }

        self.aliases
            .get(console)
            .and_then(|full| self.collections.get(full))
            .cloned()
    }
}
