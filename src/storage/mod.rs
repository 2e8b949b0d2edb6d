//! Storage backends and driver traits
//!
//! The retrieval pipeline depends only on the `ChunkIndex` and `GraphStore`
//! traits; the in-memory and SQLite implementations here are interchangeable
//! behind them.

mod memory;
mod sqlite;
mod traits;

pub use memory::{MemoryChunkIndex, MemoryGraphStore};
pub use sqlite::{GraphStats, SqliteGraphStore};
pub use traits::{ChunkIndex, GraphStore, Neighbor, PaperFilter, StoreError, StoreResult};

#[cfg(feature = "embeddings")]
pub use sqlite::{SqliteChunkIndex, DEFAULT_EMBEDDING_DIMENSIONS};
