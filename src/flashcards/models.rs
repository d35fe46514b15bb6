//! Data models for the flashcard scheduler

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::CardHash;

use super::algorithm::SchedulerError;

/// Learner's judgment of recall quality, supplied at review time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rating {
    /// Complete failure
    Again = 1,
    /// Recalled with serious effort
    Hard = 2,
    /// Recalled with some effort
    Good = 3,
    /// Perfect recall
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn value(self) -> i64 {
        self as i64
    }

    /// Zero-based index into the initial-stability weights (w0..w3)
    pub(crate) fn index(self) -> usize {
        self as usize - 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

impl TryFrom<i64> for Rating {
    type Error = SchedulerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(SchedulerError::InvalidRating(other)),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle phase of a card in the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardState {
    /// Never reviewed
    New = 0,
    /// Failed on first sight, stepping through short learning intervals
    Learning = 1,
    /// Regular spaced review
    Review = 2,
    /// Forgotten while in review, stepping through relearning intervals
    Relearning = 3,
}

impl Default for CardState {
    fn default() -> Self {
        Self::New
    }
}

impl CardState {
    pub const ALL: [CardState; 4] = [
        CardState::New,
        CardState::Learning,
        CardState::Review,
        CardState::Relearning,
    ];

    pub fn value(self) -> i64 {
        self as i64
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(CardState::New),
            1 => Some(CardState::Learning),
            2 => Some(CardState::Review),
            3 => Some(CardState::Relearning),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CardState::New => "NEW",
            CardState::Learning => "LEARNING",
            CardState::Review => "REVIEW",
            CardState::Relearning => "RELEARNING",
        }
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Memory model snapshot for one card.
///
/// Values of this type are never mutated by the scheduler; each review
/// builds a fresh snapshot from the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSchedule {
    pub card_hash: CardHash,
    pub state: CardState,
    /// Memory stability in days
    pub stability: f64,
    /// Intrinsic difficulty, kept within [1, 10] once reviewed
    pub difficulty: f64,
    /// Whole days between the previous review and the latest one
    pub elapsed_days: u32,
    /// Interval scheduled by the latest review
    pub scheduled_days: u32,
    pub reps: u32,
    pub lapses: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    pub due: DateTime<Utc>,
}

impl CardSchedule {
    /// Check if the card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

/// Immutable record of a single review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLog {
    pub card_hash: CardHash,
    pub rating: Rating,
    /// State of the card before this review was applied
    pub state: CardState,
    pub review_time: DateTime<Utc>,
    /// Interval that was in force when the card was reviewed
    pub scheduled_days: u32,
    pub elapsed_days: u32,
}

/// Aggregate counts over the schedule store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_cards: usize,
    pub due_cards: usize,
    pub by_state: BTreeMap<CardState, usize>,
    pub reviews_today: usize,
}

impl Default for ReviewStats {
    fn default() -> Self {
        Self {
            total_cards: 0,
            due_cards: 0,
            by_state: CardState::ALL.iter().map(|s| (*s, 0)).collect(),
            reviews_today: 0,
        }
    }
}

/// Number of cards stored under one deck label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCount {
    pub name: String,
    pub count: usize,
}

/// Card whose stored repetition count disagrees with its review history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFinding {
    pub card_hash: CardHash,
    pub reps: u32,
    pub logged_reviews: u32,
}

/// Largest accepted `maximum_interval`, about a thousand years. Keeps every
/// due date inside four-digit years.
pub const MAX_INTERVAL_DAYS: u32 = 365_000;

fn default_weights() -> [f64; 17] {
    [
        0.4, 0.6, 2.4, 5.8, // w0-w3: initial stability per rating
        4.93, 0.94, 0.86, 0.01, // w4-w7: difficulty
        1.49, 0.14, 0.94, // w8-w10: stability growth on recall
        2.18, 0.05, 0.34, 1.26, // w11-w14: stability after a lapse
        0.29, 2.61, // w15-w16: hard penalty, easy bonus
    ]
}

fn default_request_retention() -> f64 {
    0.9
}

fn default_maximum_interval() -> u32 {
    36500
}

fn default_learning_steps() -> Vec<u32> {
    vec![1, 10]
}

fn default_relearning_steps() -> Vec<u32> {
    vec![10]
}

/// Tunables for the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerParams {
    #[serde(default = "default_weights")]
    pub w: [f64; 17],
    /// Target probability of recall at the scheduled review
    #[serde(default = "default_request_retention")]
    pub request_retention: f64,
    /// Interval cap in days
    #[serde(default = "default_maximum_interval")]
    pub maximum_interval: u32,
    /// Learning steps in minutes
    #[serde(default = "default_learning_steps")]
    pub learning_steps: Vec<u32>,
    /// Relearning steps in minutes
    #[serde(default = "default_relearning_steps")]
    pub relearning_steps: Vec<u32>,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            w: default_weights(),
            request_retention: default_request_retention(),
            maximum_interval: default_maximum_interval(),
            learning_steps: default_learning_steps(),
            relearning_steps: default_relearning_steps(),
        }
    }
}

impl SchedulerParams {
    /// Reject tunables the scheduler formulas are undefined for
    pub fn validate(&self) -> Result<(), String> {
        if let Some(i) = self.w.iter().position(|w| !w.is_finite()) {
            return Err(format!("weight w{} is not a finite number", i));
        }
        if !(self.request_retention > 0.0 && self.request_retention < 1.0) {
            return Err(format!(
                "request_retention must be within (0, 1), got {}",
                self.request_retention
            ));
        }
        if !(1..=MAX_INTERVAL_DAYS).contains(&self.maximum_interval) {
            return Err(format!(
                "maximum_interval must be within 1..={} days, got {}",
                MAX_INTERVAL_DAYS, self.maximum_interval
            ));
        }
        if self.learning_steps.is_empty() {
            return Err("learning_steps must not be empty".to_string());
        }
        if self.relearning_steps.is_empty() {
            return Err("relearning_steps must not be empty".to_string());
        }
        let max_step = MAX_INTERVAL_DAYS * 24 * 60;
        if let Some(step) = self
            .learning_steps
            .iter()
            .chain(&self.relearning_steps)
            .find(|&&step| step > max_step)
        {
            return Err(format!("step of {} minutes is longer than {} days", step, MAX_INTERVAL_DAYS));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_ordering_and_conversion() {
        assert!(Rating::Again < Rating::Hard);
        assert!(Rating::Good < Rating::Easy);
        assert_eq!(Rating::try_from(3).unwrap(), Rating::Good);
        assert!(matches!(
            Rating::try_from(0),
            Err(SchedulerError::InvalidRating(0))
        ));
        assert!(Rating::try_from(5).is_err());
    }

    #[test]
    fn test_state_values_roundtrip() {
        for state in CardState::ALL {
            assert_eq!(CardState::from_value(state.value()), Some(state));
        }
        assert_eq!(CardState::from_value(7), None);
    }

    #[test]
    fn test_default_params_valid() {
        let params = SchedulerParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.w[2], 2.4);
        assert_eq!(params.learning_steps, vec![1, 10]);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = SchedulerParams::default();
        params.request_retention = 1.0;
        assert!(params.validate().is_err());

        let mut params = SchedulerParams::default();
        params.relearning_steps.clear();
        assert!(params.validate().is_err());

        let mut params = SchedulerParams::default();
        params.w[9] = f64::NAN;
        assert!(params.validate().unwrap_err().contains("w9"));
    }

    #[test]
    fn test_maximum_interval_is_capped() {
        let mut params = SchedulerParams::default();
        params.maximum_interval = 3_000_000;
        assert!(params.validate().unwrap_err().contains("maximum_interval"));

        params.maximum_interval = 0;
        assert!(params.validate().is_err());

        params.maximum_interval = MAX_INTERVAL_DAYS;
        assert!(params.validate().is_ok());

        params.learning_steps = vec![1, u32::MAX];
        assert!(params.validate().unwrap_err().contains("minutes"));
    }

    #[test]
    fn test_stats_default_lists_every_state() {
        let stats = ReviewStats::default();
        assert_eq!(stats.by_state.len(), 4);
        assert!(stats.by_state.values().all(|c| *c == 0));
    }
}
