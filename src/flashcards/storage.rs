//! SQLite persistence for card schedules and review history
//!
//! Card content lives in Markdown files; only scheduling state is stored
//! here.
//!
//! Schema:
//! - `schedules`: current memory model per card identity, with its deck
//! - `reviews`: append-only review log, one row per review
//!
//! Timestamps are stored as UTC RFC 3339 text with fixed nanosecond
//! precision, so string comparison in SQL matches time order and reads
//! return exactly what was written.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use thiserror::Error;

use super::algorithm::SchedulerError;
use super::models::*;
use crate::cards::CardHash;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} failed for card {card_hash}: {source}")]
    Operation {
        operation: &'static str,
        card_hash: CardHash,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Corrupt record for card {card_hash}: {reason}")]
    Corrupt { card_hash: String, reason: String },

    #[error("Schedule store lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Review rejected: {0}")]
    ReviewRejected(#[from] SchedulerError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

trait CardContext<T> {
    fn for_card(self, operation: &'static str, card_hash: &CardHash) -> Result<T>;
}

impl<T> CardContext<T> for rusqlite::Result<T> {
    fn for_card(self, operation: &'static str, card_hash: &CardHash) -> Result<T> {
        self.map_err(|source| StoreError::Operation {
            operation,
            card_hash: card_hash.clone(),
            source,
        })
    }
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS schedules (
        card_hash TEXT PRIMARY KEY,
        deck_name TEXT NOT NULL,
        state INTEGER NOT NULL,
        stability REAL NOT NULL,
        difficulty REAL NOT NULL,
        elapsed_days INTEGER NOT NULL,
        scheduled_days INTEGER NOT NULL,
        reps INTEGER NOT NULL,
        lapses INTEGER NOT NULL,
        last_review TEXT,
        due TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS reviews (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_hash TEXT NOT NULL,
        rating INTEGER NOT NULL,
        state INTEGER NOT NULL,
        review_time TEXT NOT NULL,
        scheduled_days INTEGER NOT NULL,
        elapsed_days INTEGER NOT NULL,
        FOREIGN KEY (card_hash) REFERENCES schedules(card_hash) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_schedules_due ON schedules(due);
    CREATE INDEX IF NOT EXISTS idx_schedules_deck ON schedules(deck_name);
    CREATE INDEX IF NOT EXISTS idx_reviews_card ON reviews(card_hash);
    CREATE INDEX IF NOT EXISTS idx_reviews_time ON reviews(review_time);
"#;

const SELECT_SCHEDULE: &str = "SELECT card_hash, state, stability, difficulty, elapsed_days, \
     scheduled_days, reps, lapses, last_review, due, deck_name FROM schedules";

/// Durable store of card schedules and their review log.
///
/// Every operation holds the connection lock for its duration, so updates
/// to the same card never interleave.
pub struct ScheduleStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl ScheduleStore {
    /// Open (or create) the store at `db_path`
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        conn.execute_batch(SCHEMA)?;
        log::info!("Opened schedule store at {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        })
    }

    /// Store backed by an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    // ==================== Schedule Operations ====================

    /// Insert or fully replace the schedule for a card
    pub fn upsert(&self, schedule: &CardSchedule, deck_name: &str) -> Result<()> {
        let conn = self.lock()?;
        write_schedule(&conn, schedule, deck_name)
    }

    /// Current schedule for a card, or `None` if the card is unknown
    pub fn get(&self, card_hash: &CardHash) -> Result<Option<CardSchedule>> {
        let conn = self.lock()?;
        read_schedule(&conn, card_hash).map(|found| found.map(|(schedule, _)| schedule))
    }

    /// Deck label a card is stored under
    pub fn deck_of(&self, card_hash: &CardHash) -> Result<Option<String>> {
        let conn = self.lock()?;
        read_schedule(&conn, card_hash).map(|found| found.map(|(_, deck)| deck))
    }

    /// Delete a card's schedule and its whole review history.
    /// Returns whether the card was stored.
    pub fn remove(&self, card_hash: &CardHash) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM reviews WHERE card_hash = ?1",
            params![card_hash.as_str()],
        )
        .for_card("Delete reviews", card_hash)?;
        let removed = tx
            .execute(
                "DELETE FROM schedules WHERE card_hash = ?1",
                params![card_hash.as_str()],
            )
            .for_card("Delete schedule", card_hash)?;
        tx.commit().for_card("Commit removal", card_hash)?;

        if removed > 0 {
            log::info!("Removed card {} and its review history", card_hash);
        }
        Ok(removed > 0)
    }

    /// Every stored card identity
    pub fn card_hashes(&self) -> Result<Vec<CardHash>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT card_hash FROM schedules ORDER BY card_hash")?;
        let raw: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        raw.iter().map(|h| parse_hash(h)).collect()
    }

    // ==================== Review Log ====================

    /// Append one review to the log
    pub fn append_log(&self, log: &ReviewLog) -> Result<()> {
        let conn = self.lock()?;
        write_log(&conn, log)
    }

    /// Persist a review's new schedule together with its log entry.
    ///
    /// Both rows are written in one transaction: either both become visible
    /// or neither does.
    pub fn record_review(&self, schedule: &CardSchedule, log: &ReviewLog, deck_name: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        write_pair(&tx, schedule, log, deck_name)?;
        tx.commit().for_card("Commit review", &schedule.card_hash)?;
        Ok(())
    }

    /// Read a card's schedule, compute its next state with `review` and
    /// persist the result, all under the store lock and in one transaction.
    ///
    /// Returns `None` when the card is not stored. The deck label is kept.
    pub fn apply_review<F>(&self, card_hash: &CardHash, review: F) -> Result<Option<(CardSchedule, ReviewLog)>>
    where
        F: FnOnce(&CardSchedule) -> std::result::Result<(CardSchedule, ReviewLog), SchedulerError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some((current, deck_name)) = read_schedule(&tx, card_hash)? else {
            return Ok(None);
        };

        let (next, log) = review(&current)?;
        write_pair(&tx, &next, &log, &deck_name)?;
        tx.commit().for_card("Commit review", card_hash)?;

        Ok(Some((next, log)))
    }

    /// Review log of one card, oldest first
    pub fn reviews_for(&self, card_hash: &CardHash) -> Result<Vec<ReviewLog>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT card_hash, rating, state, review_time, scheduled_days, elapsed_days
             FROM reviews WHERE card_hash = ?1 ORDER BY review_time ASC, id ASC",
        )?;
        let rows: Vec<RawLog> = stmt
            .query_map(params![card_hash.as_str()], RawLog::from_row)
            .and_then(|rows| rows.collect())
            .for_card("Read reviews", card_hash)?;
        rows.into_iter().map(RawLog::into_log).collect()
    }

    // ==================== Queries ====================

    /// Cards due at `now`, most overdue first. Ties are broken by identity
    /// so repeated calls return the same order.
    pub fn due(&self, deck_name: Option<&str>, now: DateTime<Utc>, limit: Option<usize>) -> Result<Vec<CardHash>> {
        let conn = self.lock()?;
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)).unwrap_or(-1);

        let mut stmt = conn.prepare(
            "SELECT card_hash FROM schedules
             WHERE due <= ?1 AND (?2 IS NULL OR deck_name = ?2)
             ORDER BY due ASC, card_hash ASC
             LIMIT ?3",
        )?;
        let raw: Vec<String> = stmt
            .query_map(params![encode_time(&now), deck_name, limit], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        raw.iter().map(|h| parse_hash(h)).collect()
    }

    /// Aggregate counts. "Today" is the calendar day of `now` in its own
    /// time zone.
    pub fn stats<Tz: TimeZone>(&self, deck_name: Option<&str>, now: &DateTime<Tz>) -> Result<ReviewStats> {
        let conn = self.lock()?;
        let now_utc = now.with_timezone(&Utc);
        let mut stats = ReviewStats::default();

        stats.total_cards = count(
            &conn,
            "SELECT COUNT(*) FROM schedules WHERE (?1 IS NULL OR deck_name = ?1)",
            params![deck_name],
        )?;

        stats.due_cards = count(
            &conn,
            "SELECT COUNT(*) FROM schedules WHERE (?1 IS NULL OR deck_name = ?1) AND due <= ?2",
            params![deck_name, encode_time(&now_utc)],
        )?;

        let mut stmt = conn.prepare(
            "SELECT state, COUNT(*) FROM schedules
             WHERE (?1 IS NULL OR deck_name = ?1)
             GROUP BY state",
        )?;
        let by_state: Vec<(i64, i64)> = stmt
            .query_map(params![deck_name], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        for (value, n) in by_state {
            let state = CardState::from_value(value).ok_or_else(|| StoreError::Corrupt {
                card_hash: "*".to_string(),
                reason: format!("unknown state {}", value),
            })?;
            stats.by_state.insert(state, n as usize);
        }

        let tz = now.timezone();
        let today = now.date_naive();
        let day_start = start_of_day(&tz, today);
        let day_end = today
            .succ_opt()
            .map(|tomorrow| start_of_day(&tz, tomorrow))
            .unwrap_or_else(|| day_start + Duration::days(1));

        stats.reviews_today = count(
            &conn,
            "SELECT COUNT(*) FROM reviews r
             JOIN schedules s ON s.card_hash = r.card_hash
             WHERE (?1 IS NULL OR s.deck_name = ?1)
               AND r.review_time >= ?2 AND r.review_time < ?3",
            params![deck_name, encode_time(&day_start), encode_time(&day_end)],
        )?;

        Ok(stats)
    }

    /// Deck labels with the number of cards stored under each
    pub fn decks(&self) -> Result<Vec<DeckCount>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT deck_name, COUNT(*) FROM schedules GROUP BY deck_name ORDER BY deck_name",
        )?;
        let decks = stmt
            .query_map([], |row| {
                Ok(DeckCount {
                    name: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(decks)
    }

    /// Cards whose repetition count differs from their number of logged
    /// reviews, i.e. a schedule advanced without its log entry (or the
    /// reverse).
    pub fn audit(&self) -> Result<Vec<AuditFinding>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT s.card_hash, s.reps, COUNT(r.id) AS logged
             FROM schedules s
             LEFT JOIN reviews r ON r.card_hash = s.card_hash
             GROUP BY s.card_hash, s.reps
             HAVING s.reps != logged
             ORDER BY s.card_hash",
        )?;
        let rows: Vec<(String, u32, u32)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let findings = rows
            .into_iter()
            .map(|(hash, reps, logged_reviews)| {
                Ok(AuditFinding {
                    card_hash: parse_hash(&hash)?,
                    reps,
                    logged_reviews,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for finding in &findings {
            log::warn!(
                "Card {} has {} reps but {} logged reviews",
                finding.card_hash,
                finding.reps,
                finding.logged_reviews
            );
        }
        Ok(findings)
    }
}

// ==================== Row Helpers ====================

fn write_schedule(conn: &Connection, schedule: &CardSchedule, deck_name: &str) -> Result<()> {
    let now = encode_time(&Utc::now());
    conn.execute(
        "INSERT INTO schedules (
            card_hash, deck_name, state, stability, difficulty,
            elapsed_days, scheduled_days, reps, lapses,
            last_review, due, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        ON CONFLICT(card_hash) DO UPDATE SET
            deck_name = excluded.deck_name,
            state = excluded.state,
            stability = excluded.stability,
            difficulty = excluded.difficulty,
            elapsed_days = excluded.elapsed_days,
            scheduled_days = excluded.scheduled_days,
            reps = excluded.reps,
            lapses = excluded.lapses,
            last_review = excluded.last_review,
            due = excluded.due,
            updated_at = excluded.updated_at",
        params![
            schedule.card_hash.as_str(),
            deck_name,
            schedule.state.value(),
            schedule.stability,
            schedule.difficulty,
            schedule.elapsed_days,
            schedule.scheduled_days,
            schedule.reps,
            schedule.lapses,
            schedule.last_review.as_ref().map(encode_time),
            encode_time(&schedule.due),
            now,
        ],
    )
    .for_card("Save schedule", &schedule.card_hash)?;
    Ok(())
}

fn write_log(conn: &Connection, log: &ReviewLog) -> Result<()> {
    conn.execute(
        "INSERT INTO reviews (
            card_hash, rating, state, review_time, scheduled_days, elapsed_days
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            log.card_hash.as_str(),
            log.rating.value(),
            log.state.value(),
            encode_time(&log.review_time),
            log.scheduled_days,
            log.elapsed_days,
        ],
    )
    .for_card("Append review log", &log.card_hash)?;
    Ok(())
}

fn write_pair(tx: &Transaction<'_>, schedule: &CardSchedule, log: &ReviewLog, deck_name: &str) -> Result<()> {
    if schedule.card_hash != log.card_hash {
        return Err(StoreError::Corrupt {
            card_hash: schedule.card_hash.to_string(),
            reason: format!("review log belongs to {}", log.card_hash),
        });
    }
    write_schedule(tx, schedule, deck_name)?;
    write_log(tx, log)
}

fn read_schedule(conn: &Connection, card_hash: &CardHash) -> Result<Option<(CardSchedule, String)>> {
    let raw = conn
        .query_row(
            &format!("{} WHERE card_hash = ?1", SELECT_SCHEDULE),
            params![card_hash.as_str()],
            RawSchedule::from_row,
        )
        .optional()
        .for_card("Read schedule", card_hash)?;

    raw.map(RawSchedule::into_schedule).transpose()
}

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<usize> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(n as usize)
}

/// Row exactly as stored, before validation
struct RawSchedule {
    card_hash: String,
    state: i64,
    stability: f64,
    difficulty: f64,
    elapsed_days: u32,
    scheduled_days: u32,
    reps: u32,
    lapses: u32,
    last_review: Option<String>,
    due: String,
    deck_name: String,
}

impl RawSchedule {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            card_hash: row.get(0)?,
            state: row.get(1)?,
            stability: row.get(2)?,
            difficulty: row.get(3)?,
            elapsed_days: row.get(4)?,
            scheduled_days: row.get(5)?,
            reps: row.get(6)?,
            lapses: row.get(7)?,
            last_review: row.get(8)?,
            due: row.get(9)?,
            deck_name: row.get(10)?,
        })
    }

    fn into_schedule(self) -> Result<(CardSchedule, String)> {
        let card_hash = parse_hash(&self.card_hash)?;
        let state = CardState::from_value(self.state).ok_or_else(|| corrupt(&self.card_hash, format!("unknown state {}", self.state)))?;
        let last_review = self
            .last_review
            .as_deref()
            .map(|t| decode_time(&self.card_hash, t))
            .transpose()?;
        let due = decode_time(&self.card_hash, &self.due)?;

        let schedule = CardSchedule {
            card_hash,
            state,
            stability: self.stability,
            difficulty: self.difficulty,
            elapsed_days: self.elapsed_days,
            scheduled_days: self.scheduled_days,
            reps: self.reps,
            lapses: self.lapses,
            last_review,
            due,
        };
        Ok((schedule, self.deck_name))
    }
}

struct RawLog {
    card_hash: String,
    rating: i64,
    state: i64,
    review_time: String,
    scheduled_days: u32,
    elapsed_days: u32,
}

impl RawLog {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            card_hash: row.get(0)?,
            rating: row.get(1)?,
            state: row.get(2)?,
            review_time: row.get(3)?,
            scheduled_days: row.get(4)?,
            elapsed_days: row.get(5)?,
        })
    }

    fn into_log(self) -> Result<ReviewLog> {
        Ok(ReviewLog {
            card_hash: parse_hash(&self.card_hash)?,
            rating: Rating::try_from(self.rating).map_err(|e| corrupt(&self.card_hash, e.to_string()))?,
            state: CardState::from_value(self.state)
                .ok_or_else(|| corrupt(&self.card_hash, format!("unknown state {}", self.state)))?,
            review_time: decode_time(&self.card_hash, &self.review_time)?,
            scheduled_days: self.scheduled_days,
            elapsed_days: self.elapsed_days,
        })
    }
}

fn corrupt(card_hash: &str, reason: String) -> StoreError {
    StoreError::Corrupt {
        card_hash: card_hash.to_string(),
        reason,
    }
}

fn parse_hash(value: &str) -> Result<CardHash> {
    CardHash::parse(value).map_err(|e| corrupt(value, e.to_string()))
}

fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(card_hash: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(card_hash, format!("bad timestamp {:?}: {}", value, e)))
}

/// First instant of `date` in `tz`, as UTC
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        // midnight skipped by a DST change
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}
