//! Storage driver trait definitions
//!
//! The retrieval pipeline talks to its two backends — the chunk index and
//! the knowledge graph store — exclusively through these traits. Both are
//! read-only from the pipeline's point of view; concrete stores expose
//! inherent write methods for construction tooling and tests.

use crate::graph::{GraphNode, NodeId, RelationshipKind};
use crate::retrieval::types::{ChunkId, ChunkRecord};
use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur inside a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Restriction of a chunk query to a set of paper ids
///
/// Ordered set so filtered queries are deterministic to log and test.
pub type PaperFilter = BTreeSet<NodeId>;

/// A neighbor returned by a graph adjacency lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// The adjacent node, hydrated
    pub node: GraphNode,
    /// Relationship connecting it
    pub kind: RelationshipKind,
    /// Edge weight (1 for unweighted kinds)
    pub weight: u32,
}

/// Driver for the dense+sparse chunk index
///
/// Both sub-queries rank over the same chunk set and return `(chunk id,
/// raw score)` pairs in descending relevance order, at most `top_k` long.
/// Raw scores are not comparable across the two modalities; rank fusion
/// happens in the retrieval layer. Implementations must be thread-safe.
#[async_trait]
pub trait ChunkIndex: Send + Sync {
    /// Nearest-neighbor search over chunk embeddings (cosine order).
    async fn dense_query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&PaperFilter>,
    ) -> StoreResult<Vec<(ChunkId, f32)>>;

    /// Term-weighted lexical search over chunk text (BM25 order).
    async fn sparse_query(
        &self,
        text: &str,
        top_k: usize,
        filter: Option<&PaperFilter>,
    ) -> StoreResult<Vec<(ChunkId, f32)>>;

    /// Hydrate chunk records for the given ids, in the given order.
    ///
    /// Every requested id must resolve; a missing record means the index
    /// returned an id it cannot back and is reported as `Malformed`.
    async fn load_chunks(&self, ids: &[ChunkId]) -> StoreResult<Vec<ChunkRecord>>;
}

/// Driver for the knowledge graph store
///
/// Traversal is expressed purely through repeated `neighbors` calls, so any
/// store that can answer single-hop adjacency can back the engine.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Load a node by id.
    async fn get_node(&self, id: &NodeId) -> StoreResult<Option<GraphNode>>;

    /// Adjacent nodes over the given relationship kinds.
    ///
    /// Undirected kinds are returned regardless of which endpoint `id` is;
    /// directed kinds are returned from both ends (a concept's `mentions`
    /// neighbors are the papers mentioning it). Edges of weighted kinds
    /// below `min_weight` are dropped. Results are sorted by neighbor id
    /// for deterministic traversal.
    async fn neighbors(
        &self,
        id: &NodeId,
        kinds: &[RelationshipKind],
        min_weight: u32,
    ) -> StoreResult<Vec<Neighbor>>;
}
