//! Relevance Selector - keyword pruning of the catalog per question
//!
//! Small catalogs are passed through whole. Larger ones keep only the tables
//! whose name or description shares a keyword with the question; when nothing
//! matches the whole catalog is used so generation never sees an empty schema.

use crate::catalog::{Catalog, TableDescriptor};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Catalogs at or below this size skip pruning.
pub const PASSTHROUGH_TABLE_LIMIT: usize = 5;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\b\w+\b").unwrap();
    static ref STOP_WORDS: HashSet<&'static str> = [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "is", "are", "was", "were", "what", "how", "when", "where", "who", "which", "do",
        "does", "did", "can", "could", "would", "should", "will", "have", "has", "had",
    ]
    .into_iter()
    .collect();
}

/// Lowercased word tokens of `text`.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Question tokens minus stop words.
pub fn keywords(question: &str) -> HashSet<String> {
    tokenize(question)
        .into_iter()
        .filter(|w| !STOP_WORDS.contains(w.as_str()))
        .collect()
}

fn table_tokens(table: &TableDescriptor) -> HashSet<String> {
    let mut tokens = tokenize(&table.name);
    if let Some(description) = &table.description {
        tokens.extend(tokenize(description));
    }
    tokens
}

/// Sub-catalog of the tables relevant to `question`.
pub fn select_relevant(catalog: &Catalog, question: &str) -> Catalog {
    if catalog.len() <= PASSTHROUGH_TABLE_LIMIT {
        return catalog.clone();
    }

    let keywords = keywords(question);
    let selected = catalog.filtered(|table| !table_tokens(table).is_disjoint(&keywords));

    if selected.is_empty() {
        debug!("no table matched question keywords, using full catalog");
        return catalog.clone();
    }

    debug!(
        selected = selected.len(),
        total = catalog.len(),
        tables = ?selected.table_names(),
        "pruned schema"
    );
    selected
}
