//! Relevance ranking over the word index.
//!
//! Each query term scores [`EXACT_MATCH_WEIGHT`] for every document that
//! contains it and [`PREFIX_MATCH_WEIGHT`] for every longer vocabulary word it
//! prefixes. Scored documents then earn a term-frequency bonus of
//! [`TERM_FREQUENCY_WEIGHT`] per occurrence of a query term.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Bound;

use crate::index::IndexState;

pub const EXACT_MATCH_WEIGHT: f64 = 2.0;
pub const PREFIX_MATCH_WEIGHT: f64 = 1.0;
pub const TERM_FREQUENCY_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub name: String,
    pub doc_type: String,
    /// Content preview with matched words wrapped in `**`.
    pub preview: String,
    pub score: f64,
}

/// One page of ranked results plus the number of documents that matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    /// Matches before the result cap was applied.
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

/// Score, order and truncate matches for already-normalized query terms.
pub(crate) fn rank(state: &IndexState, terms: &[String], max_results: usize) -> SearchHits {
    let mut scores: HashMap<&str, f64> = HashMap::new();
    for term in terms {
        if let Some(ids) = state.words.get(term) {
            for id in ids {
                *scores.entry(id.as_str()).or_insert(0.0) += EXACT_MATCH_WEIGHT;
            }
        }
        let longer = (Bound::Excluded(term.as_str()), Bound::Unbounded);
        for (word, ids) in state.words.range::<str, _>(longer) {
            if !word.starts_with(term.as_str()) {
                break;
            }
            for id in ids {
                *scores.entry(id.as_str()).or_insert(0.0) += PREFIX_MATCH_WEIGHT;
            }
        }
    }

    let mut scored: Vec<(&str, f64)> = scores
        .into_iter()
        .filter_map(|(id, score)| {
            let doc = state.documents.get(id)?;
            let occurrences: u32 = terms
                .iter()
                .filter_map(|t| doc.word_frequencies.get(t))
                .sum();
            Some((id, score + f64::from(occurrences) * TERM_FREQUENCY_WEIGHT))
        })
        .collect();
    scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(b.0),
        ord => ord,
    });
    let total_hits = scored.len();
    scored.truncate(max_results);

    let highlighter = Highlighter::new(terms);
    let results = scored
        .into_iter()
        .filter_map(|(id, score)| {
            let doc = state.documents.get(id)?;
            Some(SearchResult {
                document_id: doc.id.clone(),
                name: doc.name.clone(),
                doc_type: doc.doc_type.clone(),
                preview: highlighter.apply(&doc.content_preview),
                score,
            })
        })
        .collect();
    SearchHits { total_hits, results }
}

/// Wraps every word that starts with a query term (case-insensitively) in `**`.
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    pub fn new(terms: &[String]) -> Self {
        let alternatives: Vec<String> = terms
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| regex::escape(t))
            .collect();
        if alternatives.is_empty() {
            return Self { pattern: None };
        }
        let pattern = format!(r"\b(?:{})\w*", alternatives.join("|"));
        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => Self { pattern: Some(re) },
            Err(e) => {
                tracing::warn!(error = %e, "highlight pattern rejected");
                Self { pattern: None }
            }
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Some(re) => re.replace_all(text, "**$0**").into_owned(),
            None => text.to_string(),
        }
    }
}
