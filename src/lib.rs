//! Litgraph: Graph-Augmented Retrieval for Scientific Literature
//!
//! Answers natural-language questions over a paper corpus by combining
//! hybrid dense+sparse retrieval with structural discovery through a typed
//! knowledge graph of extracted entities.
//!
//! # Core Concepts
//!
//! - **Chunks**: Ingested text segments, retrieved by dense similarity and
//!   BM25 lexical match, fused with Reciprocal Rank Fusion
//! - **Graph discovery**: Bounded traversal from the papers round-1 search
//!   found to structurally related papers, with an explainable path
//! - **Provenance**: Every result carries the concepts, methods and
//!   discovery path that justify its presence
//!
//! # Example
//!
//! ```no_run
//! use litgraph::embedding::HashEmbedder;
//! use litgraph::retrieval::{RetrievalConfig, RetrievalOrchestrator};
//! use litgraph::storage::{MemoryChunkIndex, MemoryGraphStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), litgraph::retrieval::RetrievalError> {
//! let orchestrator = RetrievalOrchestrator::new(
//!     RetrievalConfig::default(),
//!     Arc::new(HashEmbedder::default()),
//!     Arc::new(MemoryChunkIndex::new()),
//!     Arc::new(MemoryGraphStore::new()),
//! );
//! let outcome = orchestrator.retrieve("how do transformers use attention?").await?;
//! # Ok(())
//! # }
//! ```

pub mod embedding;
pub mod graph;
pub mod retrieval;
pub mod storage;

pub use graph::{
    Discovery, DiscoveryPath, GraphNode, NodeId, NodeKind, PathHop, Relationship, RelationshipKind,
};
pub use retrieval::{
    Chunk, ChunkId, ChunkRecord, ChunkSource, EnrichmentMetadata, RankedResult, RetrievalConfig,
    RetrievalError, RetrievalOrchestrator, RetrievalOutcome,
};
pub use storage::{ChunkIndex, GraphStore, MemoryChunkIndex, MemoryGraphStore, SqliteGraphStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
