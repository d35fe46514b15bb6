//! Review session: parsed deck content on one side, stored schedules on
//! the other.
//!
//! Content comes from the deck files and scheduling state comes from the
//! store. A card is only drilled while both exist. Stored identities whose
//! content has disappeared are removed along with their history. Cards of a
//! deck whose file failed to load are kept, since their content is unknown.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::algorithm::Scheduler;
use super::models::{CardSchedule, Rating, ReviewLog};
use super::storage::{ScheduleStore, StoreError};
use crate::cards::{Card, CardHash, DeckCollection};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Card {0} is not in any loaded deck")]
    UnknownCard(CardHash),

    #[error("Card {0} has no stored schedule")]
    Unscheduled(CardHash),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// A card ready for review, with its current schedule
#[derive(Debug, Clone)]
pub struct DueCard<'a> {
    pub card: &'a Card,
    pub schedule: CardSchedule,
}

pub struct ReviewSession {
    store: ScheduleStore,
    scheduler: Scheduler,
    cards: DeckCollection,
}

impl ReviewSession {
    pub fn new(store: ScheduleStore, scheduler: Scheduler, cards: DeckCollection) -> Self {
        Self {
            store,
            scheduler,
            cards,
        }
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn cards(&self) -> &DeckCollection {
        &self.cards
    }

    /// Swap in freshly parsed deck content
    pub fn reload(&mut self, cards: DeckCollection) {
        self.cards = cards;
    }

    /// Create a NEW schedule for every loaded card the store does not know
    /// yet. Returns the number of cards added.
    pub fn sync(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut hashes: Vec<&CardHash> = self.cards.cards.keys().collect();
        hashes.sort();

        let mut added = 0;
        for hash in hashes {
            if self.store.get(hash)?.is_some() {
                continue;
            }
            let card = &self.cards.cards[hash];
            let schedule = self.scheduler.initialize(hash.clone(), now);
            self.store.upsert(&schedule, &card.deck_name)?;
            added += 1;
        }

        if added > 0 {
            log::info!("Scheduled {} new cards", added);
        }
        Ok(added)
    }

    /// Most overdue card that still has content. Stored identities without
    /// content are removed on the way.
    pub fn next_due(&self, deck_name: Option<&str>, now: DateTime<Utc>) -> Result<Option<DueCard<'_>>> {
        for hash in self.store.due(deck_name, now, None)? {
            if let Some(due) = self.resolve(&hash)? {
                return Ok(Some(due));
            }
        }
        Ok(None)
    }

    /// Due cards with content, most overdue first
    pub fn due_cards(
        &self,
        deck_name: Option<&str>,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<DueCard<'_>>> {
        let mut due = Vec::new();
        for hash in self.store.due(deck_name, now, None)? {
            if limit.is_some_and(|l| due.len() >= l) {
                break;
            }
            if let Some(card) = self.resolve(&hash)? {
                due.push(card);
            }
        }
        Ok(due)
    }

    /// Every loaded card with its stored schedule, ordered by deck then
    /// position in the file. A card the store has never seen has no schedule.
    pub fn browse(&self, deck_name: Option<&str>) -> Result<Vec<(&Card, Option<CardSchedule>)>> {
        let mut cards: Vec<&Card> = self
            .cards
            .cards
            .values()
            .filter(|card| deck_name.map_or(true, |d| card.deck_name == d))
            .collect();
        cards.sort_by(|a, b| {
            (&a.deck_name, a.line_number, &a.hash).cmp(&(&b.deck_name, b.line_number, &b.hash))
        });

        let mut listed = Vec::with_capacity(cards.len());
        for card in cards {
            listed.push((card, self.store.get(&card.hash)?));
        }
        Ok(listed)
    }

    /// Apply a rating to a card and persist the new schedule together with
    /// its log entry
    pub fn review(&self, card_hash: &CardHash, rating: Rating, now: DateTime<Utc>) -> Result<(CardSchedule, ReviewLog)> {
        if !self.cards.contains(card_hash) {
            return Err(SessionError::UnknownCard(card_hash.clone()));
        }

        self.store
            .apply_review(card_hash, |current| self.scheduler.review(current, rating, now))?
            .ok_or_else(|| SessionError::Unscheduled(card_hash.clone()))
    }

    /// Stored cards whose content is gone
    pub fn orphans(&self) -> Result<Vec<CardHash>> {
        let mut orphans = Vec::new();
        for hash in self.store.card_hashes()? {
            if self.is_orphan(&hash)? {
                orphans.push(hash);
            }
        }
        Ok(orphans)
    }

    /// Remove every stored card whose content is gone. Returns how many.
    pub fn prune(&self) -> Result<usize> {
        let mut removed = 0;
        for hash in self.orphans()? {
            if self.store.remove(&hash)? {
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!("Pruned {} cards whose content disappeared", removed);
        }
        Ok(removed)
    }

    fn resolve(&self, hash: &CardHash) -> Result<Option<DueCard<'_>>> {
        let Some(card) = self.cards.get(hash) else {
            if self.is_orphan(hash)? {
                log::debug!("Card {} no longer has content, removing", hash);
                self.store.remove(hash)?;
            }
            return Ok(None);
        };
        Ok(self
            .store
            .get(hash)?
            .map(|schedule| DueCard { card, schedule }))
    }

    /// No loaded content, and the deck it was stored under loaded cleanly
    fn is_orphan(&self, hash: &CardHash) -> Result<bool> {
        if self.cards.contains(hash) {
            return Ok(false);
        }
        match self.store.deck_of(hash)? {
            Some(deck) if self.cards.is_unreadable(&deck) => {
                log::warn!("Keeping card {}: deck '{}' could not be read", hash, deck);
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}
