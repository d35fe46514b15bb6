//! hashcards: spaced repetition over plain Markdown flashcards.
//!
//! Cards are parsed from `*.md` decks ([`cards`]), scheduled by the
//! memory model in [`flashcards`], and their schedules persisted in SQLite.

pub mod cards;
pub mod config;
pub mod flashcards;

pub use cards::{Card, CardHash};
pub use config::HashcardsConfig;
pub use flashcards::{Rating, ReviewSession, ScheduleStore, Scheduler};
