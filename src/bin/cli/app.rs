use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;

use hashcards_lib::cards::load_decks;
use hashcards_lib::config::HashcardsConfig;
use hashcards_lib::flashcards::{ReviewSession, ScheduleStore, Scheduler};

/// Shared application state for CLI commands
pub struct App {
    pub cards_dir: PathBuf,
    pub config: HashcardsConfig,
    pub session: ReviewSession,
}

impl App {
    /// Load config and decks for `cards_dir`, open its schedule store and
    /// schedule any cards seen for the first time
    pub fn open(cards_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = HashcardsConfig::load(config_path, cards_dir)
            .context("Failed to load configuration")?;

        let cards = load_decks(cards_dir)
            .with_context(|| format!("Failed to load decks from {}", cards_dir.display()))?;
        for (path, err) in &cards.failures {
            eprintln!("warning: skipped {}: {}", path.display(), err);
        }

        let db_path = config.database_path(cards_dir);
        let store = ScheduleStore::open(db_path.clone())
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        let scheduler = Scheduler::new(config.scheduler.clone())
            .context("Invalid scheduler parameters")?;

        let session = ReviewSession::new(store, scheduler, cards);
        session
            .sync(Utc::now())
            .context("Failed to schedule new cards")?;

        Ok(Self {
            cards_dir: cards_dir.to_path_buf(),
            config,
            session,
        })
    }

    /// Find a deck by name (case-insensitive prefix match)
    pub fn find_deck(&self, name: &str) -> Result<String> {
        let mut decks: Vec<String> = self
            .session
            .cards()
            .decks
            .iter()
            .map(|d| d.name.clone())
            .collect();
        for stored in self.session.store().decks().context("Failed to list decks")? {
            if !decks.contains(&stored.name) {
                decks.push(stored.name);
            }
        }
        decks.sort();

        let name_lower = name.to_lowercase();

        // Exact match first
        if let Some(deck) = decks.iter().find(|d| d.to_lowercase() == name_lower) {
            return Ok(deck.clone());
        }

        let matches: Vec<&String> = decks
            .iter()
            .filter(|d| d.to_lowercase().starts_with(&name_lower))
            .collect();

        match matches.len() {
            0 => bail!(
                "No deck matching '{}' in {}. Available decks:\n{}",
                name,
                self.cards_dir.display(),
                list(&decks)
            ),
            1 => Ok(matches[0].clone()),
            _ => bail!("Ambiguous deck name '{}'. Matches:\n{}", name, list(&matches)),
        }
    }
}

fn list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| format!("  - {}", n.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}
