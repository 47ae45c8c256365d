//! SHA-1 checksum keys.

use serde::{Deserialize, Serialize};

/// Length of a SHA-1 digest in hex characters
pub const CHECKSUM_HEX_LEN: usize = 40;

/// Uppercase hex SHA-1 digest, the catalog's lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum(String);

impl Checksum {
    /// Parse a hex digest of either case.
    ///
    /// Returns `None` unless the input is exactly 40 hex digits.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() != CHECKSUM_HEX_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(s.to_ascii_uppercase()))
    }

    /// Build from raw digest bytes
    pub fn from_digest(bytes: &[u8]) -> Self {
        Self(hex::encode_upper(bytes))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Checksum {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("invalid SHA-1 checksum: {}", s))
    }
}

impl From<Checksum> for String {
    fn from(c: Checksum) -> Self {
        c.0
    }
}
