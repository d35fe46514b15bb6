mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hashcards", about = "Spaced repetition for Markdown flashcards", version)]
struct Cli {
    /// Config file (default: <cards_dir>/hashcards.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Review due cards interactively
    Drill {
        /// Directory containing the *.md decks
        cards_dir: PathBuf,
        /// Only drill one deck (case-insensitive prefix match)
        #[arg(long)]
        deck: Option<String>,
        /// Stop after this many reviews
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show review statistics
    Stats {
        /// Directory containing the *.md decks
        cards_dir: PathBuf,
        /// Restrict to one deck
        #[arg(long)]
        deck: Option<String>,
    },

    /// List cards that are due now
    Due {
        /// Directory containing the *.md decks
        cards_dir: PathBuf,
        /// Restrict to one deck
        #[arg(long)]
        deck: Option<String>,
        /// Maximum number of cards to list
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List every card with its schedule
    Browse {
        /// Directory containing the *.md decks
        cards_dir: PathBuf,
        /// Restrict to one deck
        #[arg(long)]
        deck: Option<String>,
    },

    /// Parse every deck and report errors
    Validate {
        /// Directory containing the *.md decks
        cards_dir: PathBuf,
    },

    /// Check stored schedules against their review history
    Check {
        /// Directory containing the *.md decks
        cards_dir: PathBuf,
        /// Remove stored cards whose content no longer exists
        #[arg(long)]
        prune: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        Command::Drill { cards_dir, deck, limit } => {
            let app = app::App::open(&cards_dir, cli.config.as_deref())?;
            commands::drill::run(&app, deck.as_deref(), limit, use_color)?;
        }
        Command::Stats { cards_dir, deck } => {
            let app = app::App::open(&cards_dir, cli.config.as_deref())?;
            commands::stats::run(&app, deck.as_deref(), &cli.format, use_color)?;
        }
        Command::Due { cards_dir, deck, limit } => {
            let app = app::App::open(&cards_dir, cli.config.as_deref())?;
            commands::due::run(&app, deck.as_deref(), limit, &cli.format, use_color)?;
        }
        Command::Browse { cards_dir, deck } => {
            let app = app::App::open(&cards_dir, cli.config.as_deref())?;
            commands::browse::run(&app, deck.as_deref(), &cli.format, use_color)?;
        }
        Command::Validate { cards_dir } => {
            commands::validate::run(&cards_dir, &cli.format, use_color)?;
        }
        Command::Check { cards_dir, prune } => {
            let app = app::App::open(&cards_dir, cli.config.as_deref())?;
            commands::check::run(&app, prune, &cli.format, use_color)?;
        }
    }

    Ok(())
}
