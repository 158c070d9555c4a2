//! In-memory inverted index over extracted document text, with ranked keyword
//! search and a sled-backed snapshot.

pub mod config;
pub mod error;
pub mod index;
pub mod persist;
pub mod search;
pub mod service;
pub mod state;
pub mod tokenizer;

pub use config::IndexConfig;
pub use error::{IndexError, Result};
pub use index::{DocId, DocumentIndex, IndexStats, IndexedDocument};
pub use persist::{IndexStore, SnapshotStore};
pub use search::{Highlighter, SearchHits, SearchResult};
pub use service::{IndexingService, RebuildSummary, SourceDocument};
pub use state::IndexingState;
