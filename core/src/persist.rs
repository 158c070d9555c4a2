use sled::Tree;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::index::{DocId, IndexedDocument};

/// Where the service keeps its document snapshot between runs.
pub trait SnapshotStore: Send + Sync {
    /// Persisted documents, or an empty map when there is nothing usable.
    fn load(&self) -> HashMap<DocId, IndexedDocument>;
    /// Replace the stored snapshot with `documents`.
    fn save(&self, documents: &HashMap<DocId, IndexedDocument>) -> Result<()>;
    fn clear(&self) -> Result<()>;
    fn flush(&self) -> Result<()>;
}

/// Durable home of the index snapshot: one JSON blob under one key of a
/// named sled tree. Clones share the same tree.
#[derive(Clone)]
pub struct IndexStore {
    tree: Tree,
    key: String,
}

impl IndexStore {
    pub fn open<P: AsRef<Path>>(path: P, config: &IndexConfig) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| IndexError::open_store(path.to_path_buf(), &e))?;
        let tree = db
            .open_tree(&config.tree_name)
            .map_err(|e| IndexError::open_store(path.to_path_buf(), &e))?;
        Ok(Self { tree, key: config.blob_key.clone() })
    }

    /// A store that disappears when dropped.
    pub fn temporary(config: &IndexConfig) -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| IndexError::open_store(PathBuf::from("<temporary>"), &e))?;
        let tree = db
            .open_tree(&config.tree_name)
            .map_err(|e| IndexError::open_store(PathBuf::from("<temporary>"), &e))?;
        Ok(Self { tree, key: config.blob_key.clone() })
    }
}

impl SnapshotStore for IndexStore {
    /// Load the persisted documents.
    ///
    /// The index is a derived cache: an unreadable or undecodable snapshot is
    /// logged and treated as empty rather than failing startup.
    fn load(&self) -> HashMap<DocId, IndexedDocument> {
        let blob = match self.tree.get(self.key.as_bytes()) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::info!(key = %self.key, "no persisted index, starting empty");
                return HashMap::new();
            }
            Err(e) => {
                tracing::error!(error = %e, key = %self.key, "reading persisted index failed, starting empty");
                return HashMap::new();
            }
        };
        match serde_json::from_slice::<HashMap<DocId, IndexedDocument>>(&blob) {
            Ok(docs) => {
                tracing::info!(documents = docs.len(), "loaded persisted index");
                docs
            }
            Err(e) => {
                tracing::warn!(error = %e, bytes = blob.len(), "discarding undecodable index snapshot");
                HashMap::new()
            }
        }
    }

    fn save(&self, documents: &HashMap<DocId, IndexedDocument>) -> Result<()> {
        let bytes = serde_json::to_vec(documents).map_err(|e| IndexError::encode(&e))?;
        self.tree.insert(self.key.as_bytes(), bytes).map_err(|e| IndexError::storage(&e))?;
        self.flush()
    }

    fn clear(&self) -> Result<()> {
        self.tree.remove(self.key.as_bytes()).map_err(|e| IndexError::storage(&e))?;
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        self.tree.flush().map_err(|e| IndexError::storage(&e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentIndex;

    fn sample() -> HashMap<DocId, IndexedDocument> {
        let idx = DocumentIndex::new(500);
        idx.index_document("a.md", "a.md", "md", "persisted words").unwrap();
        idx.index_document("b.txt", "b.txt", "txt", "more persisted text").unwrap();
        idx.with_documents(|docs| docs.clone())
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let store = IndexStore::temporary(&IndexConfig::default()).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load() {
        let store = IndexStore::temporary(&IndexConfig::default()).unwrap();
        let docs = sample();
        store.save(&docs).unwrap();
        assert_eq!(store.load(), docs);
    }

    #[test]
    fn corrupt_snapshot_loads_empty() {
        let cfg = IndexConfig::default();
        let store = IndexStore::temporary(&cfg).unwrap();
        store.tree.insert(cfg.blob_key.as_bytes(), &b"{not json"[..]).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn clear_removes_snapshot() {
        let store = IndexStore::temporary(&IndexConfig::default()).unwrap();
        store.save(&sample()).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn opens_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(dir.path(), &IndexConfig::default()).unwrap();
        store.save(&sample()).unwrap();
        assert_eq!(store.load().len(), 2);
    }
}
