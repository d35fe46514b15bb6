//! Markdown card parser
//!
//! Two card shapes are recognized:
//! - Q/A: a `Q:` line followed by an `A:` line (the question may wrap)
//! - Cloze: a `C:` line with one or more `[bracketed]` deletions

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::hasher::{hash_card, CardHash};
use super::{CardError, Result};

/// Placeholder shown for a hidden cloze deletion
pub const CLOZE_PLACEHOLDER: &str = "[...]";

fn qa_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?ms)^Q:\s*(.+?)$\s*^A:\s*(.+?)$").expect("valid Q/A pattern"))
}

fn cloze_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^C:\s*(.+?)$").expect("valid cloze pattern"))
}

fn deletion_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").expect("valid deletion pattern"))
}

/// Type of flashcard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardType {
    /// Question and answer
    Qa,
    /// Fill-in-the-blank
    Cloze,
}

/// Parsed content of a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CardContent {
    Qa { question: String, answer: String },
    Cloze { text: String, deletions: Vec<String> },
}

/// A single flashcard as it appears in a deck file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub hash: CardHash,
    pub content: CardContent,
    pub deck_name: String,
    /// 1-based line where the card starts
    pub line_number: usize,
    /// Matched source text; the identity is derived from this
    pub raw_text: String,
}

impl Card {
    pub fn new(content: CardContent, deck_name: String, line_number: usize, raw_text: String) -> Self {
        Self {
            hash: hash_card(&raw_text),
            content,
            deck_name,
            line_number,
            raw_text,
        }
    }

    pub fn card_type(&self) -> CardType {
        match self.content {
            CardContent::Qa { .. } => CardType::Qa,
            CardContent::Cloze { .. } => CardType::Cloze,
        }
    }

    /// Prompt side: the question, or the cloze text with every deletion hidden
    pub fn front(&self) -> String {
        match &self.content {
            CardContent::Qa { question, .. } => question.clone(),
            CardContent::Cloze { text, .. } => format_cloze(text, None),
        }
    }

    /// Answer side: the answer, or the cloze text with every deletion revealed
    pub fn back(&self) -> String {
        match &self.content {
            CardContent::Qa { answer, .. } => answer.clone(),
            CardContent::Cloze { text, .. } => reveal_cloze(text),
        }
    }
}

/// Parse a deck file; the deck is named after the file stem
pub fn parse_file(path: &Path) -> Result<Vec<Card>> {
    let content = fs::read_to_string(path).map_err(|source| CardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_content(&content, &deck_name(path)))
}

/// Parse every card in a Markdown string, in source order
pub fn parse_content(content: &str, deck_name: &str) -> Vec<Card> {
    let mut cards = Vec::new();

    for caps in qa_pattern().captures_iter(content) {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let start = caps.get(0).map_or(0, |m| m.start());
        cards.push(Card::new(
            CardContent::Qa {
                question: capture(&caps, 1),
                answer: capture(&caps, 2),
            },
            deck_name.to_string(),
            line_at(content, start),
            whole.to_string(),
        ));
    }

    for caps in cloze_pattern().captures_iter(content) {
        let text = capture(&caps, 1);
        let deletions: Vec<String> = deletion_pattern()
            .captures_iter(&text)
            .map(|d| capture(&d, 1))
            .collect();
        if deletions.is_empty() {
            continue;
        }

        let whole = caps.get(0).map_or("", |m| m.as_str());
        let start = caps.get(0).map_or(0, |m| m.start());
        cards.push(Card::new(
            CardContent::Cloze { text, deletions },
            deck_name.to_string(),
            line_at(content, start),
            whole.to_string(),
        ));
    }

    cards.sort_by_key(|c| c.line_number);
    cards
}

/// Render cloze text with deletions hidden. `reveal` shows one deletion
/// (by position) in bold instead.
pub fn format_cloze(text: &str, reveal: Option<usize>) -> String {
    let mut index = 0;
    deletion_pattern()
        .replace_all(text, |caps: &Captures| {
            let shown = reveal == Some(index);
            index += 1;
            if shown {
                format!("**{}**", &caps[1])
            } else {
                CLOZE_PLACEHOLDER.to_string()
            }
        })
        .into_owned()
}

/// Render cloze text with every deletion shown in bold
pub fn reveal_cloze(text: &str) -> String {
    deletion_pattern().replace_all(text, "**${1}**").into_owned()
}

fn capture(caps: &Captures, group: usize) -> String {
    caps.get(group).map_or("", |m| m.as_str()).trim().to_string()
}

fn line_at(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

fn deck_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "default".to_string())
}
