use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use anyhow::Result;
use chrono::Utc;

use hashcards_lib::flashcards::{format_due, Rating, ReviewSession};

use crate::app::App;
use crate::render::terminal::{paint, render_card_text, state_color, Color};

pub fn run(app: &App, deck: Option<&str>, limit: Option<usize>, use_color: bool) -> Result<()> {
    let deck = deck.map(|d| app.find_deck(d)).transpose()?;
    let limit = limit.or(app.config.session_limit);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let summary = drill(
        &app.session,
        deck.as_deref(),
        limit,
        &mut stdin.lock(),
        &mut stdout.lock(),
        use_color,
    )?;
    if summary.quit {
        log::debug!("Drill stopped by user after {} reviews", summary.reviewed);
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct DrillSummary {
    pub reviewed: usize,
    pub ratings: BTreeMap<Rating, usize>,
    pub quit: bool,
}

enum Reply {
    Rate(Rating),
    Quit,
}

/// Study loop: front, wait, back with interval hints, rating
fn drill<R: BufRead, W: Write>(
    session: &ReviewSession,
    deck: Option<&str>,
    limit: Option<usize>,
    input: &mut R,
    out: &mut W,
    use_color: bool,
) -> Result<DrillSummary> {
    let mut summary = DrillSummary::default();

    loop {
        if limit.is_some_and(|l| summary.reviewed >= l) {
            break;
        }

        let now = Utc::now();
        let Some(due) = session.next_due(deck, now)? else {
            writeln!(out, "No cards due.")?;
            break;
        };
        let card = due.card;

        writeln!(
            out,
            "\n{} {}",
            paint(&card.deck_name, Color::CYAN, use_color),
            paint(due.schedule.state.name(), state_color(due.schedule.state), use_color)
        )?;
        writeln!(out, "{}", render_card_text(&card.front(), use_color, "  "))?;

        write!(out, "{}", paint("[Enter] reveal, [q] quit: ", Color::DIM, use_color))?;
        out.flush()?;
        match read_line(input)? {
            Some(line) if !is_quit(&line) => {}
            _ => {
                summary.quit = true;
                break;
            }
        }

        writeln!(out, "{}", render_card_text(&card.back(), use_color, "  "))?;

        let hints: Vec<String> = session
            .scheduler()
            .preview(&due.schedule, now)?
            .iter()
            .map(|(rating, next)| {
                format!("{} {} ({})", rating.value(), rating.label(), format_due(next.due, now))
            })
            .collect();
        writeln!(out, "{}", paint(&hints.join("  "), Color::GRAY, use_color))?;

        let Some(rating) = ask_rating(input, out)? else {
            summary.quit = true;
            break;
        };

        let reviewed_at = Utc::now();
        let (next, _) = session.review(&card.hash, rating, reviewed_at)?;
        writeln!(out, "Next review in {}", format_due(next.due, reviewed_at))?;

        summary.reviewed += 1;
        *summary.ratings.entry(rating).or_insert(0) += 1;
    }

    if summary.reviewed > 0 {
        let tally: Vec<String> = summary
            .ratings
            .iter()
            .map(|(rating, count)| format!("{} {}", rating.label(), count))
            .collect();
        writeln!(out, "\nReviewed {} cards ({})", summary.reviewed, tally.join(", "))?;
    }

    Ok(summary)
}

/// Prompt until a rating or quit; `None` on quit or end of input
fn ask_rating<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Option<Rating>> {
    loop {
        write!(out, "Rating [1-4, q]: ")?;
        out.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match parse_reply(&line) {
            Some(Reply::Rate(rating)) => return Ok(Some(rating)),
            Some(Reply::Quit) => return Ok(None),
            None => writeln!(out, "Enter 1-4 or one of again/hard/good/easy")?,
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "q" | "quit")
}

fn parse_reply(line: &str) -> Option<Reply> {
    if is_quit(line) {
        return Some(Reply::Quit);
    }

    let answer = line.trim().to_lowercase();
    if answer.is_empty() {
        return None;
    }
    if let Ok(value) = answer.parse::<i64>() {
        return Rating::try_from(value).ok().map(Reply::Rate);
    }
    Rating::ALL
        .into_iter()
        .find(|rating| rating.label().starts_with(&answer))
        .map(Reply::Rate)
}
