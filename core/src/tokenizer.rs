use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub const MIN_TOKEN_CHARS: usize = 2;

lazy_static! {
    // Runs of word characters; everything else acts as a separator.
    static ref WORD: Regex = Regex::new(r"\w+").expect("valid regex");
}

/// Split text into word tokens of at least two characters, case preserved.
///
/// The iterator borrows `text` and is cheap to recreate, so calling this again
/// on the same input restarts the sequence.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> + '_ {
    WORD.find_iter(text)
        .map(|m| m.as_str())
        .filter(|tok| tok.chars().count() >= MIN_TOKEN_CHARS)
}

/// Lowercased query terms in first-occurrence order, without repeats.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .map(str::to_lowercase)
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

/// Count lowercased occurrences of each token.
pub fn word_frequencies<'a, I>(tokens: I) -> HashMap<String, u32>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, u32> = HashMap::new();
    for tok in tokens {
        *counts.entry(tok.to_lowercase()).or_insert(0) += 1;
    }
    counts
}
