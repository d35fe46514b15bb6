//! Memory-model spaced repetition scheduler
//!
//! Each card carries a stability (days until recall probability decays to
//! the target retention) and a difficulty in [1, 10]. A review outcome moves
//! the card through its lifecycle and recomputes both values:
//!
//! - NEW cards take their initial stability straight from the weight vector
//! - LEARNING / RELEARNING cards step through short minute intervals until
//!   they are recalled, then graduate to REVIEW
//! - REVIEW cards grow stability multiplicatively on recall and collapse it
//!   on a lapse
//!
//! The scheduler is a pure function of its arguments. The caller supplies
//! the clock.

use chrono::{DateTime, Datelike, Duration, Utc};
use thiserror::Error;

use super::models::{CardSchedule, CardState, Rating, ReviewLog, SchedulerParams};
use crate::cards::CardHash;

/// Difficulty assigned to a card before its first review
pub const INITIAL_DIFFICULTY: f64 = 5.0;

/// Stability floor after a lapse
const MIN_STABILITY: f64 = 0.1;

const MIN_DIFFICULTY: f64 = 1.0;
const MAX_DIFFICULTY: f64 = 10.0;

/// Due dates past this year cannot be stored
const MAX_DUE_YEAR: i32 = 9999;

/// Caller contract violations. These are bugs in the caller, never clamped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Invalid rating: {0} (expected 1-4)")]
    InvalidRating(i64),

    #[error("Review of {card_hash} at {now} precedes its last review at {last_review}")]
    ReviewBeforeLastReview {
        card_hash: CardHash,
        last_review: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Card {card_hash} in state {state} has invalid memory model (stability {stability}, difficulty {difficulty})")]
    InvalidMemoryModel {
        card_hash: CardHash,
        state: CardState,
        stability: f64,
        difficulty: f64,
    },

    #[error("Invalid scheduler parameters: {0}")]
    InvalidParams(String),

    #[error("Card {card_hash} reviewed at {now} would fall due {wait} later, past year 9999")]
    DueOutOfRange {
        card_hash: CardHash,
        now: DateTime<Utc>,
        wait: Duration,
    },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Stateless scheduler bound to one set of tunables
#[derive(Debug, Clone)]
pub struct Scheduler {
    params: SchedulerParams,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            params: SchedulerParams::default(),
        }
    }
}

impl Scheduler {
    pub fn new(params: SchedulerParams) -> Result<Self> {
        params.validate().map_err(SchedulerError::InvalidParams)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    /// Memory model for a card seen for the first time, due immediately
    pub fn initialize(&self, card_hash: CardHash, now: DateTime<Utc>) -> CardSchedule {
        CardSchedule {
            card_hash,
            state: CardState::New,
            stability: 0.0,
            difficulty: INITIAL_DIFFICULTY,
            elapsed_days: 0,
            scheduled_days: 0,
            reps: 0,
            lapses: 0,
            last_review: None,
            due: now,
        }
    }

    /// Apply one review to `schedule`, returning the next snapshot and the
    /// log entry describing the review. The input is left untouched.
    pub fn review(
        &self,
        schedule: &CardSchedule,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<(CardSchedule, ReviewLog)> {
        check_memory_model(schedule)?;
        let elapsed_days = elapsed_days(schedule, now)?;

        let next = match schedule.state {
            CardState::New => self.review_new(schedule, rating, now)?,
            CardState::Learning | CardState::Relearning => {
                self.review_learning(schedule, rating, now, elapsed_days)?
            }
            CardState::Review => self.review_mature(schedule, rating, now, elapsed_days)?,
        };

        let log = ReviewLog {
            card_hash: schedule.card_hash.clone(),
            rating,
            state: schedule.state,
            review_time: now,
            scheduled_days: schedule.scheduled_days,
            elapsed_days,
        };

        log::debug!(
            "Reviewed {} as {}: {} -> {}, stability {:.2}, due {}",
            schedule.card_hash,
            rating,
            schedule.state,
            next.state,
            next.stability,
            next.due
        );

        Ok((next, log))
    }

    /// Outcome of every rating for `schedule`, in rating order
    pub fn preview(
        &self,
        schedule: &CardSchedule,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Rating, CardSchedule)>> {
        Rating::ALL
            .iter()
            .map(|rating| {
                self.review(schedule, *rating, now)
                    .map(|(next, _)| (*rating, next))
            })
            .collect()
    }

    fn review_new(&self, schedule: &CardSchedule, rating: Rating, now: DateTime<Utc>) -> Result<CardSchedule> {
        let difficulty = self.init_difficulty(rating);

        if rating == Rating::Again {
            return Ok(CardSchedule {
                state: CardState::Learning,
                difficulty,
                scheduled_days: 0,
                reps: 1,
                last_review: Some(now),
                due: due_after(&schedule.card_hash, now, minutes(self.params.learning_steps[0]))?,
                ..schedule.clone()
            });
        }

        let stability = self.init_stability(rating);
        let scheduled_days = self.next_interval(stability);
        Ok(CardSchedule {
            state: CardState::Review,
            stability,
            difficulty,
            scheduled_days,
            reps: 1,
            last_review: Some(now),
            due: due_after(&schedule.card_hash, now, Duration::days(scheduled_days as i64))?,
            ..schedule.clone()
        })
    }

    fn review_learning(
        &self,
        schedule: &CardSchedule,
        rating: Rating,
        now: DateTime<Utc>,
        elapsed_days: u32,
    ) -> Result<CardSchedule> {
        if rating == Rating::Again {
            let step = match schedule.state {
                CardState::Relearning => self.params.relearning_steps[0],
                _ => self.params.learning_steps[0],
            };
            return Ok(CardSchedule {
                elapsed_days,
                scheduled_days: 0,
                reps: schedule.reps + 1,
                last_review: Some(now),
                due: due_after(&schedule.card_hash, now, minutes(step))?,
                ..schedule.clone()
            });
        }

        let stability = self.init_stability(rating);
        let scheduled_days = self.next_interval(stability);
        Ok(CardSchedule {
            state: CardState::Review,
            stability,
            elapsed_days,
            scheduled_days,
            reps: schedule.reps + 1,
            last_review: Some(now),
            due: due_after(&schedule.card_hash, now, Duration::days(scheduled_days as i64))?,
            ..schedule.clone()
        })
    }

    fn review_mature(
        &self,
        schedule: &CardSchedule,
        rating: Rating,
        now: DateTime<Utc>,
        elapsed_days: u32,
    ) -> Result<CardSchedule> {
        let retrievability = retrievability(schedule.stability, elapsed_days);

        if rating == Rating::Again {
            return Ok(CardSchedule {
                state: CardState::Relearning,
                stability: self.stability_after_failure(
                    schedule.stability,
                    schedule.difficulty,
                    retrievability,
                ),
                elapsed_days,
                scheduled_days: 0,
                reps: schedule.reps + 1,
                lapses: schedule.lapses + 1,
                last_review: Some(now),
                due: due_after(&schedule.card_hash, now, minutes(self.params.relearning_steps[0]))?,
                ..schedule.clone()
            });
        }

        let stability = self.stability_after_success(
            schedule.stability,
            schedule.difficulty,
            rating,
            retrievability,
        );
        let scheduled_days = self.next_interval(stability);
        Ok(CardSchedule {
            stability,
            difficulty: self.next_difficulty(schedule.difficulty, rating),
            elapsed_days,
            scheduled_days,
            reps: schedule.reps + 1,
            last_review: Some(now),
            due: due_after(&schedule.card_hash, now, Duration::days(scheduled_days as i64))?,
            ..schedule.clone()
        })
    }

    fn init_difficulty(&self, rating: Rating) -> f64 {
        let w = &self.params.w;
        (w[4] - (rating.value() - 3) as f64 * w[5]).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }

    fn init_stability(&self, rating: Rating) -> f64 {
        self.params.w[rating.index()]
    }

    fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let next = difficulty - self.params.w[6] * (rating.value() - 3) as f64;
        next.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }

    fn stability_after_success(
        &self,
        stability: f64,
        difficulty: f64,
        rating: Rating,
        retrievability: f64,
    ) -> f64 {
        let w = &self.params.w;
        let hard_penalty = if rating == Rating::Hard { w[15] } else { 1.0 };
        let easy_bonus = if rating == Rating::Easy { w[16] } else { 1.0 };

        stability
            * (1.0
                + w[8].exp()
                    * (11.0 - difficulty)
                    * stability.powf(-w[9])
                    * (((1.0 - retrievability) * w[10]).exp() - 1.0)
                    * hard_penalty
                    * easy_bonus)
    }

    fn stability_after_failure(&self, stability: f64, difficulty: f64, retrievability: f64) -> f64 {
        let w = &self.params.w;
        let next = w[11]
            * difficulty.powf(-w[12])
            * ((stability + 1.0).powf(w[13]) - 1.0)
            * ((1.0 - retrievability) * w[14]).exp();
        next.max(MIN_STABILITY)
    }

    /// Interval in days that keeps recall at the target retention,
    /// within [1, maximum_interval]
    pub fn next_interval(&self, stability: f64) -> u32 {
        let p = &self.params;
        let interval = stability * (p.request_retention.ln() / 0.9_f64.ln());
        interval
            .min(p.maximum_interval as f64)
            .max(1.0)
            .round_ties_even() as u32
    }
}

/// Probability of recall after `elapsed_days` for a memory of `stability`.
///
/// Only defined for positive stability.
pub fn retrievability(stability: f64, elapsed_days: u32) -> f64 {
    (1.0 + elapsed_days as f64 / (9.0 * stability)).powi(-1)
}

fn elapsed_days(schedule: &CardSchedule, now: DateTime<Utc>) -> Result<u32> {
    let Some(last_review) = schedule.last_review else {
        return Ok(0);
    };

    let elapsed = now.signed_duration_since(last_review);
    if elapsed < Duration::zero() {
        return Err(SchedulerError::ReviewBeforeLastReview {
            card_hash: schedule.card_hash.clone(),
            last_review,
            now,
        });
    }

    // Whole 24-hour periods, not calendar dates
    Ok(u32::try_from(elapsed.num_days()).unwrap_or(u32::MAX))
}

fn check_memory_model(schedule: &CardSchedule) -> Result<()> {
    let stability_ok = match schedule.state {
        CardState::Review => schedule.stability.is_finite() && schedule.stability > 0.0,
        _ => schedule.stability.is_finite() && schedule.stability >= 0.0,
    };

    if stability_ok && schedule.difficulty.is_finite() {
        Ok(())
    } else {
        Err(SchedulerError::InvalidMemoryModel {
            card_hash: schedule.card_hash.clone(),
            state: schedule.state,
            stability: schedule.stability,
            difficulty: schedule.difficulty,
        })
    }
}

fn minutes(steps: u32) -> Duration {
    Duration::minutes(steps as i64)
}

fn due_after(card_hash: &CardHash, now: DateTime<Utc>, wait: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(wait)
        .filter(|due| due.year() <= MAX_DUE_YEAR)
        .ok_or_else(|| SchedulerError::DueOutOfRange {
            card_hash: card_hash.clone(),
            now,
            wait,
        })
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    if days == 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}

/// Format the wait until `due`, using minutes and hours for learning steps
pub fn format_due(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let wait = due.signed_duration_since(now);
    if wait <= Duration::zero() {
        "now".to_string()
    } else if wait < Duration::hours(1) {
        format!("{}m", wait.num_minutes().max(1))
    } else if wait < Duration::days(1) {
        format!("{}h", wait.num_hours())
    } else {
        format_interval(u32::try_from(wait.num_days()).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn card() -> CardHash {
        CardHash::parse("0123456789abcdef").unwrap()
    }

    fn review_card(stability: f64, difficulty: f64, last_review: DateTime<Utc>) -> CardSchedule {
        CardSchedule {
            card_hash: card(),
            state: CardState::Review,
            stability,
            difficulty,
            elapsed_days: 0,
            scheduled_days: 10,
            reps: 3,
            lapses: 0,
            last_review: Some(last_review),
            due: last_review + Duration::days(10),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_initialize_new_card() {
        let scheduler = Scheduler::default();
        let schedule = scheduler.initialize(card(), t0());

        assert_eq!(schedule.state, CardState::New);
        assert_eq!(schedule.stability, 0.0);
        assert_eq!(schedule.difficulty, 5.0);
        assert_eq!(schedule.reps, 0);
        assert_eq!(schedule.lapses, 0);
        assert_eq!(schedule.last_review, None);
        assert_eq!(schedule.due, t0());
        assert!(schedule.is_due(t0()));
    }

    #[test]
    fn test_first_review_good() {
        let scheduler = Scheduler::default();
        let schedule = scheduler.initialize(card(), t0());
        let (next, log) = scheduler.review(&schedule, Rating::Good, t0()).unwrap();

        assert_eq!(next.state, CardState::Review);
        assert_eq!(next.reps, 1);
        assert_eq!(next.stability, 2.4);
        assert!(approx(next.difficulty, 4.93));
        assert_eq!(next.scheduled_days, 2);
        assert_eq!(next.due, t0() + Duration::days(2));
        assert_eq!(next.last_review, Some(t0()));

        assert_eq!(log.state, CardState::New);
        assert_eq!(log.rating, Rating::Good);
        assert_eq!(log.elapsed_days, 0);
        assert_eq!(log.review_time, t0());
        // input snapshot untouched
        assert_eq!(schedule.state, CardState::New);
        assert_eq!(schedule.reps, 0);
    }

    #[test]
    fn test_first_review_easy_and_hard() {
        let scheduler = Scheduler::default();
        let schedule = scheduler.initialize(card(), t0());

        let (easy, _) = scheduler.review(&schedule, Rating::Easy, t0()).unwrap();
        assert_eq!(easy.stability, 5.8);
        assert!(approx(easy.difficulty, 4.93 - 0.94));
        assert_eq!(easy.scheduled_days, 6);

        let (hard, _) = scheduler.review(&schedule, Rating::Hard, t0()).unwrap();
        assert_eq!(hard.stability, 0.6);
        assert!(approx(hard.difficulty, 4.93 + 0.94));
        assert_eq!(hard.scheduled_days, 1);
    }

    #[test]
    fn test_first_review_again_enters_learning() {
        let scheduler = Scheduler::default();
        let schedule = scheduler.initialize(card(), t0());
        let (next, _) = scheduler.review(&schedule, Rating::Again, t0()).unwrap();

        assert_eq!(next.state, CardState::Learning);
        assert_eq!(next.reps, 1);
        assert_eq!(next.stability, 0.0);
        assert_eq!(next.scheduled_days, 0);
        assert_eq!(next.lapses, 0);
        assert_eq!(next.due, t0() + Duration::minutes(1));
    }

    #[test]
    fn test_learning_again_restarts_steps() {
        let scheduler = Scheduler::default();
        let schedule = scheduler.initialize(card(), t0());
        let (learning, _) = scheduler.review(&schedule, Rating::Again, t0()).unwrap();

        let later = t0() + Duration::minutes(3);
        let (again, log) = scheduler.review(&learning, Rating::Again, later).unwrap();
        assert_eq!(again.state, CardState::Learning);
        assert_eq!(again.reps, 2);
        assert_eq!(again.lapses, 0);
        assert_eq!(again.due, later + Duration::minutes(1));
        assert_eq!(log.state, CardState::Learning);
    }

    #[test]
    fn test_learning_graduates_to_review() {
        let scheduler = Scheduler::default();
        let schedule = scheduler.initialize(card(), t0());
        let (learning, _) = scheduler.review(&schedule, Rating::Again, t0()).unwrap();

        let later = t0() + Duration::minutes(2);
        let (next, _) = scheduler.review(&learning, Rating::Good, later).unwrap();
        assert_eq!(next.state, CardState::Review);
        assert_eq!(next.stability, 2.4);
        assert_eq!(next.scheduled_days, 2);
        assert_eq!(next.reps, 2);
        // difficulty keeps the value from the first rating
        assert!(approx(next.difficulty, learning.difficulty));
    }

    #[test]
    fn test_review_lapse_enters_relearning() {
        let scheduler = Scheduler::default();
        let last = t0();
        let schedule = review_card(10.0, 5.0, last);
        let now = last + Duration::days(5);

        let (next, log) = scheduler.review(&schedule, Rating::Again, now).unwrap();

        assert_eq!(next.state, CardState::Relearning);
        assert_eq!(next.lapses, 1);
        assert_eq!(next.reps, 4);
        assert_eq!(next.elapsed_days, 5);
        assert_eq!(next.scheduled_days, 0);
        assert_eq!(next.due, now + Duration::minutes(10));
        assert!(next.stability >= 0.1);
        assert!((next.stability - 2.7075).abs() < 0.01);
        assert_eq!(log.state, CardState::Review);
        assert_eq!(log.elapsed_days, 5);
        assert_eq!(log.scheduled_days, 10);
    }

    #[test]
    fn test_review_success_grows_stability() {
        let scheduler = Scheduler::default();
        let last = t0();
        let schedule = review_card(10.0, 5.0, last);
        let now = last + Duration::days(5);

        let (good, _) = scheduler.review(&schedule, Rating::Good, now).unwrap();
        assert_eq!(good.state, CardState::Review);
        assert!((good.stability - 19.78).abs() < 0.05);
        assert_eq!(good.difficulty, 5.0);
        assert_eq!(good.scheduled_days, scheduler.next_interval(good.stability));

        let (hard, _) = scheduler.review(&schedule, Rating::Hard, now).unwrap();
        let (easy, _) = scheduler.review(&schedule, Rating::Easy, now).unwrap();
        assert!(hard.stability < good.stability);
        assert!(easy.stability > good.stability);
        assert!(approx(hard.difficulty, 5.86));
        assert!(approx(easy.difficulty, 4.14));
    }

    #[test]
    fn test_difficulty_stays_in_bounds() {
        let scheduler = Scheduler::default();
        let mut schedule = review_card(3.0, 9.5, t0());
        let mut now = t0();
        for _ in 0..20 {
            now = now + Duration::days(1);
            let (next, _) = scheduler.review(&schedule, Rating::Hard, now).unwrap();
            assert!((1.0..=10.0).contains(&next.difficulty));
            schedule = next;
        }
        assert_eq!(schedule.difficulty, 10.0);

        for _ in 0..20 {
            now = now + Duration::days(1);
            let (next, _) = scheduler.review(&schedule, Rating::Easy, now).unwrap();
            assert!((1.0..=10.0).contains(&next.difficulty));
            schedule = next;
        }
        assert_eq!(schedule.difficulty, 1.0);
    }

    #[test]
    fn test_reps_and_lapses_across_sequence() {
        let scheduler = Scheduler::default();
        let mut schedule = scheduler.initialize(card(), t0());
        let mut now = t0();
        let ratings = [
            Rating::Again,
            Rating::Good,
            Rating::Good,
            Rating::Again,
            Rating::Again,
            Rating::Hard,
            Rating::Easy,
            Rating::Again,
        ];

        for (i, rating) in ratings.iter().enumerate() {
            let (next, log) = scheduler.review(&schedule, *rating, now).unwrap();
            assert_eq!(next.reps, schedule.reps + 1);
            let lapsed = log.state == CardState::Review && *rating == Rating::Again;
            assert_eq!(next.lapses, schedule.lapses + u32::from(lapsed), "step {}", i);
            if next.state == CardState::Review {
                assert!(next.scheduled_days >= 1);
                assert!(next.scheduled_days <= scheduler.params().maximum_interval);
            }
            now = next.due;
            schedule = next;
        }
        assert_eq!(schedule.lapses, 2);
    }

    #[test]
    fn test_review_is_deterministic() {
        let scheduler = Scheduler::default();
        let schedule = review_card(7.5, 6.2, t0());
        let now = t0() + Duration::days(9);
        let a = scheduler.review(&schedule, Rating::Good, now).unwrap();
        let b = scheduler.review(&schedule, Rating::Good, now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_interval_bounds() {
        let scheduler = Scheduler::default();
        assert_eq!(scheduler.next_interval(0.1), 1);
        assert_eq!(scheduler.next_interval(2.4), 2);
        assert_eq!(scheduler.next_interval(1.0e9), 36500);

        let params = SchedulerParams {
            maximum_interval: 30,
            ..SchedulerParams::default()
        };
        let capped = Scheduler::new(params).unwrap();
        assert_eq!(capped.next_interval(400.0), 30);
    }

    #[test]
    fn test_interval_follows_retention() {
        let params = SchedulerParams {
            request_retention: 0.8,
            ..SchedulerParams::default()
        };
        let lenient = Scheduler::new(params).unwrap();
        // ln(0.8)/ln(0.9) ~= 2.118
        assert_eq!(lenient.next_interval(10.0), 21);
    }

    #[test]
    fn test_elapsed_days_truncates_to_whole_days() {
        let scheduler = Scheduler::default();
        let last = t0();
        let schedule = review_card(10.0, 5.0, last);
        let now = last + Duration::hours(47);
        let (next, _) = scheduler.review(&schedule, Rating::Good, now).unwrap();
        assert_eq!(next.elapsed_days, 1);
    }

    #[test]
    fn test_review_before_last_review_rejected() {
        let scheduler = Scheduler::default();
        let schedule = review_card(10.0, 5.0, t0());
        let err = scheduler
            .review(&schedule, Rating::Good, t0() - Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::ReviewBeforeLastReview { .. }));
    }

    #[test]
    fn test_invalid_memory_model_rejected() {
        let scheduler = Scheduler::default();
        let schedule = review_card(0.0, 5.0, t0());
        let err = scheduler.review(&schedule, Rating::Good, t0()).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidMemoryModel { .. }));

        let schedule = review_card(f64::NAN, 5.0, t0());
        assert!(scheduler.review(&schedule, Rating::Again, t0()).is_err());
    }

    #[test]
    fn test_lapse_stability_floor() {
        let scheduler = Scheduler::default();
        // unclamped lapse stability would be about 0.064
        let schedule = review_card(0.1, 10.0, t0());
        let (next, _) = scheduler.review(&schedule, Rating::Again, t0()).unwrap();

        assert_eq!(next.state, CardState::Relearning);
        assert_eq!(next.stability, MIN_STABILITY);
    }

    #[test]
    fn test_initial_difficulty_clamped() {
        let mut params = SchedulerParams::default();
        params.w[4] = 12.0;
        let scheduler = Scheduler::new(params).unwrap();
        let schedule = scheduler.initialize(card(), t0());

        let (again, _) = scheduler.review(&schedule, Rating::Again, t0()).unwrap();
        assert_eq!(again.difficulty, MAX_DIFFICULTY);

        let mut params = SchedulerParams::default();
        params.w[4] = -3.0;
        let scheduler = Scheduler::new(params).unwrap();
        let (easy, _) = scheduler.review(&schedule, Rating::Easy, t0()).unwrap();
        assert_eq!(easy.difficulty, MIN_DIFFICULTY);
    }

    #[test]
    fn test_due_past_year_9999_is_an_error() {
        let params = SchedulerParams {
            maximum_interval: u32::MAX,
            ..SchedulerParams::default()
        };
        // bypasses validation to reach the date arithmetic
        let scheduler = Scheduler { params };
        let schedule = review_card(1e12, 5.0, t0());

        let err = scheduler.review(&schedule, Rating::Good, t0()).unwrap_err();
        assert!(matches!(err, SchedulerError::DueOutOfRange { .. }));

        let late = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 0).unwrap();
        let schedule = review_card(10.0, 5.0, late);
        let err = Scheduler::default()
            .review(&schedule, Rating::Again, late)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::DueOutOfRange { .. }));
    }

    #[test]
    fn test_maximum_interval_cap_stays_storable() {
        let params = SchedulerParams {
            maximum_interval: crate::flashcards::models::MAX_INTERVAL_DAYS,
            ..SchedulerParams::default()
        };
        let scheduler = Scheduler::new(params).unwrap();
        let schedule = review_card(1e12, 5.0, t0());

        let (next, _) = scheduler.review(&schedule, Rating::Good, t0()).unwrap();
        assert_eq!(next.scheduled_days, crate::flashcards::models::MAX_INTERVAL_DAYS);
        assert!(next.due.year() <= 9999);

        let params = SchedulerParams {
            maximum_interval: 3_000_000,
            ..SchedulerParams::default()
        };
        assert!(matches!(
            Scheduler::new(params),
            Err(SchedulerError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = SchedulerParams {
            learning_steps: Vec::new(),
            ..SchedulerParams::default()
        };
        assert!(matches!(
            Scheduler::new(params),
            Err(SchedulerError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_preview_covers_all_ratings() {
        let scheduler = Scheduler::default();
        let schedule = scheduler.initialize(card(), t0());
        let preview = scheduler.preview(&schedule, t0()).unwrap();
        let states: Vec<CardState> = preview.iter().map(|(_, s)| s.state).collect();
        assert_eq!(
            states,
            vec![
                CardState::Learning,
                CardState::Review,
                CardState::Review,
                CardState::Review
            ]
        );
    }

    #[test]
    fn test_retrievability() {
        assert_eq!(retrievability(10.0, 0), 1.0);
        assert!(approx(retrievability(10.0, 90), 0.5));
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(5), "5d");
        assert_eq!(format_interval(14), "2w");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(730), "2y");
    }

    #[test]
    fn test_format_due() {
        let now = t0();
        assert_eq!(format_due(now - Duration::minutes(5), now), "now");
        assert_eq!(format_due(now + Duration::minutes(10), now), "10m");
        assert_eq!(format_due(now + Duration::hours(5), now), "5h");
        assert_eq!(format_due(now + Duration::days(3), now), "3d");
    }
}
