//! Asynchronous front of the document index.
//!
//! Work runs on tokio's blocking pool. Every mutation updates memory and then
//! writes the full snapshot while holding one writer lock, so the stored blob
//! always reflects the latest completed mutation.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::index::{DocumentIndex, IndexStats, IndexedDocument};
use crate::persist::{IndexStore, SnapshotStore};
use crate::search::{SearchHits, SearchResult};
use crate::state::IndexingState;

/// Plain text handed over by an extractor, ready to index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub name: String,
    pub doc_type: String,
    pub content: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>, doc_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), doc_type: doc_type.into(), content: content.into() }
    }

    /// Derive name and type from a locator such as a path or URI.
    pub fn from_locator(locator: &str, content: impl Into<String>) -> Self {
        let is_separator = |c: char| c == '/' || c == '\\';
        let name = locator
            .trim_end_matches(is_separator)
            .rsplit(is_separator)
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(locator)
            .to_string();
        let doc_type = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
            _ => "unknown".to_string(),
        };
        Self { id: locator.to_string(), name, doc_type, content: content.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    pub indexed: usize,
    pub failed: usize,
}

struct Inner {
    index: DocumentIndex,
    store: Box<dyn SnapshotStore>,
    config: IndexConfig,
    writer: Mutex<()>,
    state: watch::Sender<IndexingState>,
    closed: AtomicBool,
}

impl Inner {
    fn set_state(&self, state: IndexingState) {
        self.state.send_replace(state);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(IndexError::ShutDown);
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        self.index.with_documents(|docs| self.store.save(docs)).map_err(|e| {
            tracing::error!(error = %e, "saving index snapshot failed");
            e
        })
    }

    fn index_one(&self, doc: &SourceDocument) -> Result<IndexedDocument> {
        let _writer = self.writer.lock();
        let indexed = self.index.index_document(&doc.id, &doc.name, &doc.doc_type, &doc.content)?;
        self.persist()?;
        Ok(indexed)
    }

    fn rebuild(&self, documents: &[SourceDocument]) -> Result<RebuildSummary> {
        let _writer = self.writer.lock();
        self.index.clear();
        let mut summary = RebuildSummary::default();
        for doc in documents {
            self.set_state(IndexingState::Indexing { name: doc.name.clone() });
            match self.index.index_document(&doc.id, &doc.name, &doc.doc_type, &doc.content) {
                Ok(_) => {
                    summary.indexed += 1;
                    self.set_state(IndexingState::Complete { name: doc.name.clone() });
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(id = %doc.id, error = %e, "skipping document during rebuild");
                    self.set_state(IndexingState::Error { message: e.to_string() });
                }
            }
        }
        let saved = self.persist();
        self.set_state(IndexingState::Idle);
        saved?;
        tracing::info!(indexed = summary.indexed, failed = summary.failed, "rebuilt index");
        Ok(summary)
    }
}

/// Shared handle to the index. Clones refer to the same index.
#[derive(Clone)]
pub struct IndexingService {
    inner: Arc<Inner>,
}

impl IndexingService {
    /// Open (or create) the on-disk store at `path` and load its snapshot.
    pub fn open<P: AsRef<Path>>(path: P, config: IndexConfig) -> Result<Self> {
        let store = IndexStore::open(path, &config)?;
        Ok(Self::new(store, config))
    }

    /// Build a service over any snapshot store, loading what it holds.
    pub fn new(store: impl SnapshotStore + 'static, config: IndexConfig) -> Self {
        let index = DocumentIndex::from_documents(store.load(), config.preview_chars);
        let (state, _) = watch::channel(IndexingState::Idle);
        Self {
            inner: Arc::new(Inner {
                index,
                store: Box::new(store),
                config,
                writer: Mutex::new(()),
                state,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    pub fn state(&self) -> IndexingState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<IndexingState> {
        self.inner.state.subscribe()
    }

    pub fn reset_state(&self) {
        self.inner.set_state(IndexingState::Idle);
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
    {
        self.inner.ensure_open()?;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            inner.ensure_open()?;
            f(inner.as_ref())
        })
        .await
        .map_err(|e| IndexError::Join(e.to_string()))?
    }

    pub async fn index_document(&self, doc: SourceDocument) -> Result<IndexedDocument> {
        self.run(move |inner| {
            inner.set_state(IndexingState::Indexing { name: doc.name.clone() });
            match inner.index_one(&doc) {
                Ok(indexed) => {
                    inner.set_state(IndexingState::Complete { name: doc.name.clone() });
                    Ok(indexed)
                }
                Err(e) => {
                    inner.set_state(IndexingState::Error { message: e.to_string() });
                    Err(e)
                }
            }
        })
        .await
    }

    pub async fn remove_document(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.run(move |inner| {
            let _writer = inner.writer.lock();
            if !inner.index.remove_document(&id) {
                return Ok(false);
            }
            inner.persist()?;
            tracing::debug!(%id, "removed document");
            Ok(true)
        })
        .await
    }

    pub async fn clear_index(&self) -> Result<()> {
        self.run(|inner| {
            let _writer = inner.writer.lock();
            inner.index.clear();
            inner.store.clear()?;
            tracing::info!("cleared index");
            Ok(())
        })
        .await
    }

    /// Replace the whole index with `documents`, indexed in order.
    pub async fn rebuild_index(&self, documents: Vec<SourceDocument>) -> Result<RebuildSummary> {
        self.run(move |inner| inner.rebuild(&documents)).await
    }

    /// Ranked search; `max_results` defaults to the configured cap.
    pub async fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<SearchResult>> {
        Ok(self.search_hits(query, max_results).await?.results)
    }

    /// Ranked search that also reports how many documents matched before the cap.
    pub async fn search_hits(&self, query: &str, max_results: Option<usize>) -> Result<SearchHits> {
        let query = query.to_string();
        self.run(move |inner| {
            let limit = max_results.unwrap_or(inner.config.default_max_results);
            Ok(inner.index.search_hits(&query, limit))
        })
        .await
    }

    pub async fn recently_indexed(&self, limit: usize) -> Result<Vec<IndexedDocument>> {
        self.run(move |inner| Ok(inner.index.recently_indexed(limit))).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<IndexedDocument>> {
        let id = id.to_string();
        self.run(move |inner| Ok(inner.index.get(&id))).await
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        self.run(|inner| Ok(inner.index.stats())).await
    }

    /// Stop accepting work, wait for the current writer and flush the store.
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _writer = inner.writer.lock();
            inner.store.flush()
        })
        .await
        .map_err(|e| IndexError::Join(e.to_string()))??;
        tracing::info!("indexing service shut down");
        Ok(())
    }
}
