use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{IndexError, Result};
use crate::search::{rank, SearchHits, SearchResult};
use crate::tokenizer::{query_terms, tokenize, word_frequencies};

pub type DocId = String;

/// A document as held by the index. Replaced wholesale when re-indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: DocId,
    pub name: String,
    pub doc_type: String,
    /// Leading characters of the content, used for result previews.
    pub content_preview: String,
    pub word_count: usize,
    pub word_frequencies: HashMap<String, u32>,
    /// Milliseconds since the Unix epoch.
    pub indexed_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub vocabulary_size: usize,
    pub total_words: usize,
    pub last_indexed_at: Option<i64>,
}

/// Document store and word index, always mutated together.
#[derive(Debug, Default)]
pub(crate) struct IndexState {
    pub(crate) documents: HashMap<DocId, IndexedDocument>,
    /// Sorted so prefix lookups are range scans.
    pub(crate) words: BTreeMap<String, BTreeSet<DocId>>,
    last_indexed_at: i64,
    stats: IndexStats,
}

impl IndexState {
    fn link(&mut self, doc: &IndexedDocument) {
        for word in doc.word_frequencies.keys() {
            self.words.entry(word.clone()).or_default().insert(doc.id.clone());
        }
    }

    fn unlink(&mut self, doc: &IndexedDocument) {
        for word in doc.word_frequencies.keys() {
            let emptied = match self.words.get_mut(word) {
                Some(ids) => {
                    ids.remove(&doc.id);
                    ids.is_empty()
                }
                None => false,
            };
            if emptied {
                self.words.remove(word);
            }
        }
    }

    fn next_timestamp(&mut self) -> i64 {
        let ts = now_millis().max(self.last_indexed_at + 1);
        self.last_indexed_at = ts;
        ts
    }

    fn refresh_stats(&mut self) {
        self.stats = IndexStats {
            document_count: self.documents.len(),
            vocabulary_size: self.words.len(),
            total_words: self.documents.values().map(|d| d.word_count).sum(),
            last_indexed_at: self.documents.values().map(|d| d.indexed_at).max(),
        };
    }
}

/// In-memory inverted index over document text.
#[derive(Debug)]
pub struct DocumentIndex {
    state: RwLock<IndexState>,
    preview_chars: usize,
}

impl DocumentIndex {
    pub fn new(preview_chars: usize) -> Self {
        Self { state: RwLock::new(IndexState::default()), preview_chars }
    }

    /// Rebuild the word index from previously stored documents.
    pub fn from_documents(documents: HashMap<DocId, IndexedDocument>, preview_chars: usize) -> Self {
        let mut state = IndexState::default();
        for doc in documents.values() {
            state.link(doc);
        }
        state.last_indexed_at = documents.values().map(|d| d.indexed_at).max().unwrap_or(0);
        state.documents = documents;
        state.refresh_stats();
        Self { state: RwLock::new(state), preview_chars }
    }

    /// Index `content` under `id`, replacing any previous version of the document.
    pub fn index_document(&self, id: &str, name: &str, doc_type: &str, content: &str) -> Result<IndexedDocument> {
        if id.trim().is_empty() {
            return Err(IndexError::Indexing(format!("document {name:?} has an empty id")));
        }
        let word_count = tokenize(content).count();
        let frequencies = word_frequencies(tokenize(content));
        let preview: String = content.chars().take(self.preview_chars).collect();

        let mut state = self.state.write();
        let doc = IndexedDocument {
            id: id.to_string(),
            name: name.to_string(),
            doc_type: doc_type.to_string(),
            content_preview: preview,
            word_count,
            word_frequencies: frequencies,
            indexed_at: state.next_timestamp(),
        };
        if let Some(old) = state.documents.remove(id) {
            state.unlink(&old);
        }
        state.link(&doc);
        state.documents.insert(doc.id.clone(), doc.clone());
        state.refresh_stats();
        tracing::debug!(id, words = doc.word_frequencies.len(), "indexed document");
        Ok(doc)
    }

    /// Drop a document and its word links. Returns whether it was present.
    pub fn remove_document(&self, id: &str) -> bool {
        let mut state = self.state.write();
        let Some(old) = state.documents.remove(id) else {
            return false;
        };
        state.unlink(&old);
        state.refresh_stats();
        true
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.documents.clear();
        state.words.clear();
        state.refresh_stats();
    }

    pub fn get(&self, id: &str) -> Option<IndexedDocument> {
        self.state.read().documents.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> IndexStats {
        self.state.read().stats.clone()
    }

    /// Ids stored under `word` (lowercased) in the word index.
    pub fn documents_with_word(&self, word: &str) -> Vec<DocId> {
        self.state
            .read()
            .words
            .get(&word.to_lowercase())
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recently indexed documents first.
    pub fn recently_indexed(&self, limit: usize) -> Vec<IndexedDocument> {
        let state = self.state.read();
        let mut docs: Vec<&IndexedDocument> = state.documents.values().collect();
        docs.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at).then_with(|| a.id.cmp(&b.id)));
        docs.into_iter().take(limit).cloned().collect()
    }

    /// Ranked keyword search. A blank query yields no results.
    pub fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        self.search_hits(query, max_results).results
    }

    /// Like [`search`](Self::search), also reporting how many documents matched.
    pub fn search_hits(&self, query: &str, max_results: usize) -> SearchHits {
        let terms = query_terms(query);
        if terms.is_empty() {
            return SearchHits::default();
        }
        rank(&self.state.read(), &terms, max_results)
    }

    /// Run `f` against the document map under the read lock.
    pub fn with_documents<R>(&self, f: impl FnOnce(&HashMap<DocId, IndexedDocument>) -> R) -> R {
        f(&self.state.read().documents)
    }
}

fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DocumentIndex {
        DocumentIndex::new(500)
    }

    #[test]
    fn builds_record_and_word_links() {
        let idx = index();
        let doc = idx.index_document("a.txt", "a.txt", "txt", "Invoice total due, total 500").unwrap();
        assert_eq!(doc.word_count, 5);
        assert_eq!(doc.word_frequencies.get("total"), Some(&2));
        assert_eq!(idx.documents_with_word("INVOICE"), vec!["a.txt".to_string()]);
        assert_eq!(idx.documents_with_word("500"), vec!["a.txt".to_string()]);
    }

    #[test]
    fn preview_is_bounded_by_chars() {
        let idx = DocumentIndex::new(4);
        let doc = idx.index_document("d", "d", "md", "żółw żyje długo").unwrap();
        assert_eq!(doc.content_preview, "żółw");
    }

    #[test]
    fn rejects_empty_id() {
        let err = index().index_document("  ", "n", "txt", "text").unwrap_err();
        assert!(matches!(err, IndexError::Indexing(_)));
    }

    #[test]
    fn reindex_replaces_record_and_prunes_stale_words() {
        let idx = index();
        idx.index_document("doc", "doc", "txt", "alpha beta").unwrap();
        idx.index_document("doc", "doc v2", "txt", "beta gamma").unwrap();

        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("doc").unwrap().name, "doc v2");
        assert!(idx.documents_with_word("alpha").is_empty());
        assert_eq!(idx.documents_with_word("gamma"), vec!["doc".to_string()]);
        assert_eq!(idx.stats().vocabulary_size, 2);
    }

    #[test]
    fn remove_unlinks_words() {
        let idx = index();
        idx.index_document("a", "a", "txt", "shared only_a").unwrap();
        idx.index_document("b", "b", "txt", "shared").unwrap();

        assert!(idx.remove_document("a"));
        assert!(!idx.remove_document("a"));
        assert!(idx.documents_with_word("only_a").is_empty());
        assert_eq!(idx.documents_with_word("shared"), vec!["b".to_string()]);
    }

    #[test]
    fn clear_empties_everything() {
        let idx = index();
        idx.index_document("a", "a", "txt", "some words here").unwrap();
        idx.clear();
        assert!(idx.is_empty());
        assert!(idx.recently_indexed(10).is_empty());
        assert_eq!(idx.stats(), IndexStats::default());
    }

    #[test]
    fn recent_is_newest_first_and_truncated() {
        let idx = index();
        for id in ["one", "two", "three"] {
            idx.index_document(id, id, "txt", "text body").unwrap();
        }
        let recent: Vec<String> = idx.recently_indexed(2).into_iter().map(|d| d.id).collect();
        assert_eq!(recent, vec!["three".to_string(), "two".to_string()]);
    }

    #[test]
    fn stats_track_mutations() {
        let idx = index();
        idx.index_document("a", "a", "txt", "one two three").unwrap();
        idx.index_document("b", "b", "txt", "three four").unwrap();
        let stats = idx.stats();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.vocabulary_size, 4);
        assert_eq!(stats.total_words, 5);
        assert_eq!(stats.last_indexed_at, idx.get("b").map(|d| d.indexed_at));
    }

    #[test]
    fn from_documents_restores_word_index() {
        let idx = index();
        idx.index_document("a", "a", "txt", "restored words").unwrap();
        let docs = idx.with_documents(|docs| docs.clone());

        let loaded = DocumentIndex::from_documents(docs, 500);
        assert_eq!(loaded.documents_with_word("restored"), vec!["a".to_string()]);
        assert_eq!(loaded.stats(), idx.stats());

        let next = loaded.index_document("b", "b", "txt", "later").unwrap();
        assert!(next.indexed_at > loaded.get("a").unwrap().indexed_at);
    }
}
