//! Error types for the document index.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the index, its store and the indexing service.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A document could not be indexed.
    #[error("indexing failed: {0}")]
    Indexing(String),

    /// The snapshot could not be written to or cleared from the store.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// The backing store could not be opened.
    #[error("failed to open index store at {path}: {message}")]
    OpenStore {
        /// Directory of the store.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The service has been shut down and accepts no new work.
    #[error("indexing service is shut down")]
    ShutDown,

    /// A blocking task did not run to completion.
    #[error("background task failed: {0}")]
    Join(String),
}

impl IndexError {
    pub(crate) fn open_store(path: PathBuf, source: &sled::Error) -> Self {
        Self::OpenStore {
            path,
            message: source.to_string(),
        }
    }

    pub(crate) fn storage(source: &sled::Error) -> Self {
        Self::Persistence(source.to_string())
    }

    pub(crate) fn encode(source: &serde_json::Error) -> Self {
        Self::Persistence(format!("encoding snapshot: {source}"))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IndexError>;
