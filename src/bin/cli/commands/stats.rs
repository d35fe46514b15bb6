use anyhow::{Context, Result};
use chrono::Local;

use hashcards_lib::flashcards::CardState;

use crate::app::App;
use crate::render::terminal::{paint, state_color, Color};
use crate::OutputFormat;

pub fn run(app: &App, deck: Option<&str>, format: &OutputFormat, use_color: bool) -> Result<()> {
    let deck = deck.map(|d| app.find_deck(d)).transpose()?;
    let stats = app
        .session
        .store()
        .stats(deck.as_deref(), &Local::now())
        .context("Failed to compute statistics")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "deck": deck,
                "totalCards": stats.total_cards,
                "dueCards": stats.due_cards,
                "reviewsToday": stats.reviews_today,
                "byState": stats
                    .by_state
                    .iter()
                    .map(|(state, count)| (state.name().to_lowercase(), *count))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            let title = deck.as_deref().unwrap_or("All decks");
            println!("{}", paint(title, Color::BOLD, use_color));
            println!("{}", "\u{2500}".repeat(24));
            println!("{:<16} {:>6}", "Total cards", stats.total_cards);
            println!("{:<16} {:>6}", "Due now", stats.due_cards);
            println!("{:<16} {:>6}", "Reviewed today", stats.reviews_today);
            println!();
            for state in CardState::ALL {
                let count = stats.by_state.get(&state).copied().unwrap_or(0);
                let label = format!("{:<16}", state.name());
                println!("{} {:>6}", paint(&label, state_color(state), use_color), count);
            }
        }
    }

    Ok(())
}
