//! Graph-augmented retrieval pipeline
//!
//! One query flows through four stages: hybrid dense+sparse search, typed
//! graph discovery seeded by the round-1 papers, filtered search over the
//! discovered papers, then merge and enrichment. The stages live in their
//! own modules; `RetrievalOrchestrator` sequences them.

use crate::graph::NodeId;
use thiserror::Error;

mod discover;
mod enrich;
mod hybrid;
mod merge;
mod orchestrator;
pub mod types;

#[cfg(test)]
mod pipeline_tests;

pub use discover::GraphTraversalEngine;
pub use enrich::ContextEnricher;
pub use hybrid::HybridSearchClient;
pub use merge::ResultMerger;
pub use orchestrator::{PipelineStage, RetrievalConfig, RetrievalOrchestrator};
pub use types::{
    Chunk, ChunkId, ChunkRecord, ChunkSource, EmbeddedQuery, EnrichmentMetadata, RankedResult,
    RetrievalOutcome, RetrievalReport,
};

/// Errors surfaced by the retrieval pipeline
///
/// The first two abort the query they belong to; `GraphUnavailable`
/// degrades the run to vector-only results; `EnrichmentLookupMissing`
/// degrades a single result to empty metadata. An empty result set is
/// `Ok` — never conflated with a backend failure.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("chunk index unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("graph store unavailable: {0}")]
    GraphUnavailable(String),

    #[error("graph metadata missing for paper {0}")]
    EnrichmentLookupMissing(NodeId),
}

/// Result type for pipeline operations
pub type RetrievalResult<T> = Result<T, RetrievalError>;
