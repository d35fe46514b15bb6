//! Card content: Markdown parsing, deck loading and content-addressed identity
//!
//! Cards live in plain Markdown files, one deck per file:
//! ```text
//! Q: What is the atomic number of carbon?
//! A: 6
//!
//! C: The atomic number of [carbon] is [6].
//! ```
//! Only scheduling state is persisted; the files stay the source of truth
//! for content.

pub mod deck;
pub mod hasher;
pub mod parser;

use std::path::PathBuf;

use thiserror::Error;

pub use deck::{deck_files, load_decks, DeckCollection, DeckSummary};
pub use hasher::{hash_card, hash_file, CardHash};
pub use parser::{format_cloze, parse_content, parse_file, reveal_cloze, Card, CardContent, CardType};

#[derive(Error, Debug)]
pub enum CardError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Cards directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Invalid card hash: {0:?}")]
    InvalidHash(String),
}

pub type Result<T> = std::result::Result<T, CardError>;
