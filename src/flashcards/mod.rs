//! Spaced repetition core
//!
//! This module provides:
//! - The memory model (stability, difficulty, lifecycle state) per card
//! - The scheduler that advances it from a review rating
//! - SQLite persistence for schedules and the review log
//! - A review session joining parsed decks with stored schedules

pub mod algorithm;
pub mod models;
pub mod session;
pub mod storage;

pub use algorithm::{format_due, format_interval, retrievability, Scheduler, SchedulerError};
pub use models::*;
pub use session::{DueCard, ReviewSession, SessionError};
pub use storage::{ScheduleStore, StoreError};
