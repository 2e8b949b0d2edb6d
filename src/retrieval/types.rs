//! Retrieval result structures

use crate::graph::{DiscoveryPath, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an ingested text segment
///
/// Stable per chunk across retrievals; serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChunkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A stored chunk as the index holds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: ChunkId,
    /// Paper the chunk was segmented from
    pub paper_id: NodeId,
    pub text: String,
}

impl ChunkRecord {
    pub fn new(id: impl Into<String>, paper_id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id: ChunkId::from_string(id),
            paper_id,
            text: text.into(),
        }
    }
}

/// Which retrieval round surfaced a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkSource {
    /// Direct hybrid search on the query
    Vector,
    /// Filtered search over graph-discovered papers
    Graph,
}

/// A retrieved chunk with its relevance signals
///
/// `fused_score` is pure Reciprocal Rank Fusion of the dense and sparse
/// sub-rankings. Graph edge weights are never folded into it — structural
/// provenance travels in `EnrichmentMetadata`, keeping the ranking
/// explainable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub paper_id: NodeId,
    pub text: String,
    /// Raw dense (cosine) score, when the dense sub-query ranked it
    pub dense_score: Option<f32>,
    /// Raw sparse (BM25) score, when the sparse sub-query ranked it
    pub sparse_score: Option<f32>,
    /// Reciprocal Rank Fusion score across the two sub-rankings
    pub fused_score: f64,
    pub source: ChunkSource,
}

/// Graph context attached to a final result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentMetadata {
    /// Canonical names of concepts the paper mentions
    pub concepts: Vec<String>,
    /// Canonical names of methods the paper uses
    pub methods: Vec<String>,
    /// Concepts related (by co-occurrence) to the paper's own concepts
    pub related_concepts: Vec<String>,
    /// Traversal path for graph-discovered papers; `None` for direct hits
    pub discovery_path: Option<DiscoveryPath>,
}

impl EnrichmentMetadata {
    /// Metadata for a chunk whose graph context is absent or unreachable
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Final output unit handed to generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk: Chunk,
    pub metadata: EnrichmentMetadata,
}

/// A query with its embedding, computed once per retrieval
#[derive(Debug, Clone)]
pub struct EmbeddedQuery {
    pub text: String,
    pub vector: Vec<f32>,
}

/// Diagnostics for one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalReport {
    /// Trace id for correlating log lines
    pub query_id: Uuid,
    pub executed_at: DateTime<Utc>,
    /// Papers found by round-1 search, in first-seen order
    pub seed_papers: Vec<NodeId>,
    /// Papers surfaced by graph traversal
    pub discovered_papers: usize,
    /// True when the graph store failed and the run fell back to vector-only
    pub graph_degraded: bool,
}

/// Results plus diagnostics for one pipeline run
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub results: Vec<RankedResult>,
    pub report: RetrievalReport,
}
