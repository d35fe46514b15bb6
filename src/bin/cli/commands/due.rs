use anyhow::{Context, Result};
use chrono::Utc;

use hashcards_lib::flashcards::format_due;

use crate::app::App;
use crate::render::terminal::{paint, state_color, truncate};
use crate::OutputFormat;

pub fn run(
    app: &App,
    deck: Option<&str>,
    limit: Option<usize>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let deck = deck.map(|d| app.find_deck(d)).transpose()?;
    let now = Utc::now();
    let due = app
        .session
        .due_cards(deck.as_deref(), now, limit)
        .context("Failed to list due cards")?;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = due
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "hash": d.card.hash,
                        "deck": d.card.deck_name,
                        "line": d.card.line_number,
                        "state": d.schedule.state,
                        "due": d.schedule.due,
                        "front": d.card.front(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("No cards due.");
                return Ok(());
            }

            let deck_w = due
                .iter()
                .map(|d| d.card.deck_name.len())
                .max()
                .unwrap_or(4)
                .clamp(4, 20);

            println!(
                "{:<16} {:<deck_w$} {:<10} {:<6} Front",
                "Card", "Deck", "State", "Due",
                deck_w = deck_w
            );
            println!(
                "{} {} {} {} {}",
                "\u{2500}".repeat(16),
                "\u{2500}".repeat(deck_w),
                "\u{2500}".repeat(10),
                "\u{2500}".repeat(6),
                "\u{2500}".repeat(30)
            );

            for d in &due {
                let state = format!("{:<10}", d.schedule.state.name());
                // due is in the past, so show how overdue it is
                let overdue = format_due(now, d.schedule.due);
                println!(
                    "{:<16} {:<deck_w$} {} {:<6} {}",
                    d.card.hash,
                    truncate(&d.card.deck_name, deck_w),
                    paint(&state, state_color(d.schedule.state), use_color),
                    overdue,
                    truncate(&d.card.front(), 40),
                    deck_w = deck_w
                );
            }

            println!("\n{} cards due", due.len());
        }
    }

    Ok(())
}
