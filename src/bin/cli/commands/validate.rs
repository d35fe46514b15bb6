use std::path::Path;

use anyhow::{bail, Context, Result};

use hashcards_lib::cards::load_decks;

use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

/// Parse every deck without touching the database. Fails if any deck
/// could not be read.
pub fn run(cards_dir: &Path, format: &OutputFormat, use_color: bool) -> Result<()> {
    let collection = load_decks(cards_dir)
        .with_context(|| format!("Failed to load decks from {}", cards_dir.display()))?;

    match format {
        OutputFormat::Json => {
            let errors: Vec<serde_json::Value> = collection
                .failures
                .iter()
                .map(|(path, err)| {
                    serde_json::json!({
                        "path": path,
                        "error": err.to_string(),
                    })
                })
                .collect();
            let output = serde_json::json!({
                "totalCards": collection.len(),
                "decks": collection.decks,
                "errors": errors,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            let name_w = collection
                .decks
                .iter()
                .map(|d| d.name.len())
                .max()
                .unwrap_or(4)
                .max(4);

            println!("{:<name_w$} Cards", "Deck", name_w = name_w);
            println!("{} {}", "\u{2500}".repeat(name_w), "\u{2500}".repeat(6));
            for deck in &collection.decks {
                println!("{:<name_w$} {}", deck.name, deck.count, name_w = name_w);
            }

            for (path, err) in &collection.failures {
                let label = paint("error:", Color::RED, use_color);
                println!("{} {}: {}", label, path.display(), err);
            }

            println!(
                "\n{} cards in {} decks",
                collection.len(),
                collection.decks.len()
            );
        }
    }

    if !collection.failures.is_empty() {
        bail!("{} deck(s) could not be read", collection.failures.len());
    }
    Ok(())
}
