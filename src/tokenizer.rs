//! Query normalization.
//!
//! Turns a free-text query into the list of terms the text filter matches
//! against: lowercased, split into word tokens, reduced to purely
//! alphanumeric tokens, with stopwords removed. Order is preserved and
//! duplicates are kept.
//!
//! Tokens follow Unicode word boundaries with two adjustments: words joined
//! by a hyphen stay one token (`covid-19`, so it is not alphanumeric and is
//! dropped), and English contraction suffixes are split off their stem
//! (`don't` becomes `do` + `n't`).

use anyhow::{Context, Result};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::QueryConfig;

const SPANISH: &str = include_str!("stopwords/spanish.txt");

pub type Stopwords = HashSet<String>;

/// Normalize a query into search terms.
///
/// An empty or whitespace-only query yields no terms, which the filter treats
/// as "no text constraint".
pub fn normalize(query: &str, stopwords: &Stopwords) -> Vec<String> {
    let lowered = query.to_lowercase();
    tokenize(&lowered)
        .into_iter()
        .filter(|token| is_alphanumeric(token))
        .filter(|token| !stopwords.contains(*token))
        .map(str::to_string)
        .collect()
}

const CONTRACTIONS: &[&str] = &[
    "n't", "'s", "'m", "'d", "'ll", "'re", "'ve", "n\u{2019}t", "\u{2019}s", "\u{2019}m",
    "\u{2019}d", "\u{2019}ll", "\u{2019}re", "\u{2019}ve",
];

/// Split text into word tokens, keeping punctuation tokens.
fn tokenize(text: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for (start, segment) in text.split_word_bound_indices() {
        let end = start + segment.len();
        if segment.chars().all(char::is_whitespace) {
            continue;
        }
        if let Some(last) = spans.last_mut() {
            let prev = &text[last.0..last.1];
            let adjacent = last.1 == start;
            let opens_join = segment == "-" && prev.chars().last().is_some_and(char::is_alphanumeric);
            let closes_join = prev.len() > 1
                && prev.ends_with('-')
                && segment.chars().next().is_some_and(char::is_alphanumeric);
            if adjacent && (opens_join || closes_join) {
                last.1 = end;
                continue;
            }
        }
        spans.push((start, end));
    }

    spans
        .into_iter()
        .flat_map(|(start, end)| split_contraction(&text[start..end]))
        .collect()
}

fn split_contraction(token: &str) -> Vec<&str> {
    for suffix in CONTRACTIONS {
        if token.len() > suffix.len() && token.ends_with(suffix) {
            let (stem, rest) = token.split_at(token.len() - suffix.len());
            return vec![stem, rest];
        }
    }
    vec![token]
}

fn is_alphanumeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphanumeric)
}

/// The built-in Spanish stopword list.
pub fn spanish_stopwords() -> Stopwords {
    parse_list(SPANISH)
}

/// Build the stopword set described by the `[query]` config section.
///
/// `stopwords_file`, when set, replaces the named built-in set;
/// `extra_stopwords` are always added on top.
pub fn load_stopwords(config: &QueryConfig) -> Result<Stopwords> {
    let mut set = match &config.stopwords_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read stopwords file: {}", path.display()))?;
            parse_list(&content)
        }
        None => match config.stopwords.as_str() {
            "none" => Stopwords::new(),
            _ => spanish_stopwords(),
        },
    };

    set.extend(
        config
            .extra_stopwords
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty()),
    );
    Ok(set)
}

fn parse_list(content: &str) -> Stopwords {
    content
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}
