use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{IndexError, Result};

pub const DEFAULT_PREVIEW_CHARS: usize = 500;
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_TREE_NAME: &str = "document_index";
pub const DEFAULT_BLOB_KEY: &str = "indexed_documents";

/// Tunables shared by the index, the store and the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Number of characters of content kept as a document's preview.
    pub preview_chars: usize,
    /// Result cap used when a caller does not pass one.
    pub default_max_results: usize,
    /// Name of the sled tree holding the snapshot.
    pub tree_name: String,
    /// Key of the snapshot inside the tree.
    pub blob_key: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
            default_max_results: DEFAULT_MAX_RESULTS,
            tree_name: DEFAULT_TREE_NAME.to_string(),
            blob_key: DEFAULT_BLOB_KEY.to_string(),
        }
    }
}

impl IndexConfig {
    /// Read a JSON config file. Missing fields fall back to the defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| IndexError::Config(format!("reading config {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| IndexError::Config(format!("parsing config {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: IndexConfig = serde_json::from_str(r#"{"preview_chars": 80}"#).unwrap();
        assert_eq!(cfg.preview_chars, 80);
        assert_eq!(cfg.default_max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(cfg.tree_name, DEFAULT_TREE_NAME);
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docindex.json");
        fs::write(&path, r#"{"default_max_results": 5, "blob_key": "snap"}"#).unwrap();
        let cfg = IndexConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.default_max_results, 5);
        assert_eq!(cfg.blob_key, "snap");
        assert_eq!(cfg.preview_chars, DEFAULT_PREVIEW_CHARS);
    }
}
