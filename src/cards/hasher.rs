//! Content-addressed card identity.
//!
//! A card is identified by what it says, not where it lives: the identity
//! is the first 16 hex characters of the SHA-256 digest of the card text
//! with whitespace runs collapsed to single spaces. Identities already
//! persisted depend on this exact derivation.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{CardError, Result};

/// Number of hex characters kept from the digest (64 bits)
pub const HASH_LEN: usize = 16;

/// Stable identity of a card, derived from its normalized content
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardHash(String);

impl CardHash {
    /// Validate an identity read back from storage or user input
    pub fn parse(value: &str) -> Result<Self> {
        let valid = value.len() == HASH_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(CardError::InvalidHash(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CardHash {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CardHash {
    type Error = CardError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CardHash> for String {
    fn from(hash: CardHash) -> Self {
        hash.0
    }
}

/// Collapse every whitespace run to one space and trim the ends.
///
/// The ASCII file, group, record and unit separators (`\x1c`..=`\x1f`)
/// count as whitespace too, matching identities in existing databases.
pub fn normalize(content: &str) -> String {
    content
        .split(is_separator)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Identity of a card from its raw text
pub fn hash_card(content: &str) -> CardHash {
    truncated_digest(normalize(content).as_bytes())
}

/// Hash of a whole deck file, for detecting deck changes
pub fn hash_file(path: &Path) -> Result<CardHash> {
    let bytes = fs::read(path).map_err(|source| CardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(truncated_digest(&bytes))
}

fn truncated_digest(bytes: &[u8]) -> CardHash {
    let digest = Sha256::digest(bytes);
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LEN);
    CardHash(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_does_not_change_identity() {
        let spaced = hash_card("Q: A  \n\nA:  6");
        let compact = hash_card("Q: A A: 6");
        assert_eq!(spaced, compact);
        assert_eq!(hash_card("  Q: A A: 6\t"), compact);
    }

    #[test]
    fn test_control_separators_are_whitespace() {
        assert_eq!(normalize("a\x1fb"), "a b");
        assert_eq!(normalize("\x1cQ: A\x1d\x1eA: 6\u{3000}"), "Q: A A: 6");
        assert_eq!(hash_card("Q: A\x1fA: 6").as_str(), "32cdd3599fdbc079");
        // other control characters stay part of the text
        assert_eq!(normalize("a\x1bb"), "a\x1bb");
    }

    #[test]
    fn test_content_change_changes_identity() {
        assert_ne!(hash_card("Q: A A: 6"), hash_card("Q: A A: 7"));
        assert_ne!(hash_card("Q: A A: 6"), hash_card("Q: a A: 6"));
    }

    /// Identities must match those already persisted by existing databases.
    #[test]
    fn test_known_identities() {
        assert_eq!(hash_card("Q: A A: 6").as_str(), "32cdd3599fdbc079");
        assert_eq!(
            hash_card("Q: What is the atomic number of carbon?\nA: 6").as_str(),
            "82e174825a4583a2"
        );
    }

    #[test]
    fn test_hash_file_uses_raw_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("math.md");
        fs::write(&path, "Q: 2+2?\nA: 4\n").unwrap();
        assert_eq!(hash_file(&path).unwrap().as_str(), "f22742b338c7b09d");

        let missing = hash_file(&dir.path().join("missing.md"));
        assert!(matches!(missing, Err(CardError::Io { .. })));
    }

    #[test]
    fn test_parse_validates_shape() {
        assert!(CardHash::parse("32cdd3599fdbc079").is_ok());
        assert!(CardHash::parse("32CDD3599FDBC079").is_err());
        assert!(CardHash::parse("32cdd3599fdbc07").is_err());
        assert!(CardHash::parse("32cdd3599fdbc07z").is_err());
        assert_eq!(
            "32cdd3599fdbc079".parse::<CardHash>().unwrap(),
            hash_card("Q: A A: 6")
        );
    }

    #[test]
    fn test_serde_as_plain_string() {
        let hash = hash_card("Q: A A: 6");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"32cdd3599fdbc079\"");
        let back: CardHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert!(serde_json::from_str::<CardHash>("\"nothex\"").is_err());
    }
}
