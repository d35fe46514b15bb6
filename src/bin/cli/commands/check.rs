use anyhow::{Context, Result};

use hashcards_lib::cards::CardHash;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

/// Report schedules whose repetition count disagrees with their review
/// log, and stored cards whose content is gone. `prune` removes the latter.
pub fn run(app: &App, prune: bool, format: &OutputFormat, use_color: bool) -> Result<()> {
    let store = app.session.store();
    let findings = store.audit().context("Failed to audit review history")?;

    let orphans: Vec<CardHash> = app
        .session
        .orphans()
        .context("Failed to list stored cards")?;

    let pruned = if prune {
        app.session.prune().context("Failed to prune cards")?
    } else {
        0
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "inconsistencies": findings,
                "orphans": orphans,
                "pruned": pruned,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if findings.is_empty() {
                println!("{}", paint("Review history is consistent.", Color::GREEN, use_color));
            } else {
                println!("{:<16} {:>6} {:>8}", "Card", "Reps", "Logged");
                println!(
                    "{} {} {}",
                    "\u{2500}".repeat(16),
                    "\u{2500}".repeat(6),
                    "\u{2500}".repeat(8)
                );
                for f in &findings {
                    println!("{:<16} {:>6} {:>8}", f.card_hash, f.reps, f.logged_reviews);
                }
                println!(
                    "\n{}",
                    paint(
                        &format!("{} cards advanced without matching log entries", findings.len()),
                        Color::RED,
                        use_color
                    )
                );
            }

            if !orphans.is_empty() {
                println!(
                    "{} stored cards no longer exist in {}",
                    orphans.len(),
                    app.cards_dir.display()
                );
                if prune {
                    println!("Removed {} cards and their review history", pruned);
                } else {
                    println!("Run with --prune to remove them");
                }
            }

            for (path, _) in &app.session.cards().failures {
                println!(
                    "{}",
                    paint(
                        &format!("Kept cards of {} since it could not be read", path.display()),
                        Color::YELLOW,
                        use_color
                    )
                );
            }
        }
    }

    Ok(())
}
