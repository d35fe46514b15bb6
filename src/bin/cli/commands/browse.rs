use anyhow::{Context, Result};
use chrono::Utc;

use hashcards_lib::flashcards::format_due;

use crate::app::App;
use crate::render::terminal::{paint, state_color, truncate, Color};
use crate::OutputFormat;

/// List every card with its schedule, due or not
pub fn run(app: &App, deck: Option<&str>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let deck = deck.map(|d| app.find_deck(d)).transpose()?;
    let now = Utc::now();
    let cards = app
        .session
        .browse(deck.as_deref())
        .context("Failed to read card schedules")?;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = cards
                .iter()
                .map(|(card, schedule)| {
                    serde_json::json!({
                        "hash": card.hash,
                        "deck": card.deck_name,
                        "line": card.line_number,
                        "front": card.front(),
                        "back": card.back(),
                        "schedule": schedule,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if cards.is_empty() {
                println!("No cards found.");
                return Ok(());
            }

            let deck_w = cards
                .iter()
                .map(|(c, _)| c.deck_name.len())
                .max()
                .unwrap_or(4)
                .clamp(4, 20);

            println!(
                "{:<16} {:<deck_w$} {:<10} {:<6} {:>4} Front",
                "Card", "Deck", "State", "Due", "Reps",
                deck_w = deck_w
            );
            println!(
                "{} {} {} {} {} {}",
                "\u{2500}".repeat(16),
                "\u{2500}".repeat(deck_w),
                "\u{2500}".repeat(10),
                "\u{2500}".repeat(6),
                "\u{2500}".repeat(4),
                "\u{2500}".repeat(30)
            );

            for (card, schedule) in &cards {
                let (state, due, reps) = match schedule {
                    Some(s) => (
                        paint(&format!("{:<10}", s.state.name()), state_color(s.state), use_color),
                        format_due(s.due, now),
                        s.reps.to_string(),
                    ),
                    None => (
                        paint(&format!("{:<10}", "unsynced"), Color::GRAY, use_color),
                        "-".to_string(),
                        "-".to_string(),
                    ),
                };
                println!(
                    "{:<16} {:<deck_w$} {} {:<6} {:>4} {}",
                    card.hash,
                    truncate(&card.deck_name, deck_w),
                    state,
                    due,
                    reps,
                    truncate(&card.front(), 40),
                    deck_w = deck_w
                );
            }

            println!("\n{} cards", cards.len());
        }
    }

    Ok(())
}
