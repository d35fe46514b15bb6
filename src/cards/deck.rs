//! Loading every deck file from a cards directory

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use serde::Serialize;

use super::hasher::CardHash;
use super::parser::{parse_file, Card};
use super::{CardError, Result};

/// Card count for one deck file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSummary {
    pub name: String,
    pub path: PathBuf,
    pub count: usize,
}

/// All cards found in a cards directory, keyed by identity
#[derive(Debug, Default)]
pub struct DeckCollection {
    pub cards: HashMap<CardHash, Card>,
    pub decks: Vec<DeckSummary>,
    /// Files that could not be read, with the reason
    pub failures: Vec<(PathBuf, CardError)>,
}

impl DeckCollection {
    pub fn get(&self, hash: &CardHash) -> Option<&Card> {
        self.cards.get(hash)
    }

    pub fn contains(&self, hash: &CardHash) -> bool {
        self.cards.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards of one deck, in file order
    pub fn deck_cards(&self, deck_name: &str) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self
            .cards
            .values()
            .filter(|c| c.deck_name == deck_name)
            .collect();
        cards.sort_by_key(|c| c.line_number);
        cards
    }

    /// Whether the file backing `deck_name` failed to load. Content of such
    /// a deck is unknown rather than gone.
    pub fn is_unreadable(&self, deck_name: &str) -> bool {
        self.failures
            .iter()
            .any(|(path, _)| path.file_stem().is_some_and(|stem| stem.to_string_lossy() == deck_name))
    }
}

/// Markdown deck files directly inside `dir`, sorted by path
pub fn deck_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CardError::DirectoryNotFound(dir.to_path_buf()));
    }

    let pattern = format!("{}/*.md", Pattern::escape(&dir.to_string_lossy()));
    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Error accessing deck path: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

/// Parse every deck in `dir`. Unreadable files are collected in
/// `failures` rather than aborting the load.
pub fn load_decks(dir: &Path) -> Result<DeckCollection> {
    let mut collection = DeckCollection::default();
    let mut counts: BTreeMap<String, (PathBuf, usize)> = BTreeMap::new();

    for path in deck_files(dir)? {
        let cards = match parse_file(&path) {
            Ok(cards) => cards,
            Err(e) => {
                log::warn!("Skipping unreadable deck {:?}: {}", path, e);
                collection.failures.push((path, e));
                continue;
            }
        };

        let entry = counts
            .entry(deck_name_of(&path, &cards))
            .or_insert_with(|| (path.clone(), 0));

        for card in cards {
            if let Some(existing) = collection.cards.get(&card.hash) {
                log::warn!(
                    "Duplicate card {} in deck '{}' line {} (already in '{}' line {})",
                    card.hash,
                    card.deck_name,
                    card.line_number,
                    existing.deck_name,
                    existing.line_number
                );
                continue;
            }
            entry.1 += 1;
            collection.cards.insert(card.hash.clone(), card);
        }
    }

    collection.decks = counts
        .into_iter()
        .map(|(name, (path, count))| DeckSummary { name, path, count })
        .collect();

    log::info!(
        "Loaded {} cards from {} decks in {:?}",
        collection.cards.len(),
        collection.decks.len(),
        dir
    );

    Ok(collection)
}

fn deck_name_of(path: &Path, cards: &[Card]) -> String {
    cards
        .first()
        .map(|c| c.deck_name.clone())
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().to_string()))
        .unwrap_or_else(|| "default".to_string())
}
