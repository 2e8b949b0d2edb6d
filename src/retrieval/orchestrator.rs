//! Pipeline orchestration and configuration

use super::discover::GraphTraversalEngine;
use super::enrich::ContextEnricher;
use super::hybrid::HybridSearchClient;
use super::merge::ResultMerger;
use super::types::{
    EmbeddedQuery, EnrichmentMetadata, RankedResult, RetrievalOutcome, RetrievalReport,
};
use super::{RetrievalError, RetrievalResult};
use crate::embedding::Embedder;
use crate::graph::NodeId;
use crate::storage::{ChunkIndex, GraphStore, PaperFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Tuning knobs for one orchestrator instance
///
/// Fixed at construction and applied identically to every query, so
/// orchestrators with different policies can coexist in one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks fetched by round-1 hybrid search
    pub vector_top_k: usize,
    /// Chunks fetched by the filtered graph round
    pub graph_top_k: usize,
    /// Maximum traversal depth in edges
    pub max_hops: usize,
    /// Minimum weight for weighted edges at each hop boundary
    pub min_relationship_weight: u32,
    /// Maximum papers surfaced by traversal
    pub discovery_cap: usize,
    /// Final result cap after merging
    pub context_cap: usize,
    /// Reciprocal Rank Fusion constant
    pub rrf_k: f64,
    /// Related concepts listed per result
    pub related_concept_cap: usize,
    /// Per-external-call timeout in milliseconds
    pub call_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_top_k: 10,
            graph_top_k: 10,
            max_hops: 2,
            min_relationship_weight: 2,
            discovery_cap: 5,
            context_cap: 10,
            rrf_k: 60.0,
            related_concept_cap: 8,
            call_timeout_ms: 10_000,
        }
    }
}

impl RetrievalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector_top_k(mut self, top_k: usize) -> Self {
        self.vector_top_k = top_k;
        self
    }

    pub fn with_graph_top_k(mut self, top_k: usize) -> Self {
        self.graph_top_k = top_k;
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_min_relationship_weight(mut self, min_weight: u32) -> Self {
        self.min_relationship_weight = min_weight;
        self
    }

    pub fn with_discovery_cap(mut self, cap: usize) -> Self {
        self.discovery_cap = cap;
        self
    }

    pub fn with_context_cap(mut self, cap: usize) -> Self {
        self.context_cap = cap;
        self
    }

    pub fn with_rrf_k(mut self, rrf_k: f64) -> Self {
        self.rrf_k = rrf_k;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Stages of the per-query state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    VectorSearch,
    GraphDiscover,
    FilteredSearch,
    Merge,
    Enrich,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Init => "init",
            PipelineStage::VectorSearch => "vector_search",
            PipelineStage::GraphDiscover => "graph_discover",
            PipelineStage::FilteredSearch => "filtered_search",
            PipelineStage::Merge => "merge",
            PipelineStage::Enrich => "enrich",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Sequences the four retrieval stages for each query
///
/// Per query: INIT → VECTOR_SEARCH → GRAPH_DISCOVER → FILTERED_SEARCH →
/// MERGE → ENRICH → DONE, with the alternate edge GRAPH_DISCOVER →
/// (graph store failure) → MERGE that drops graph input entirely. A failed
/// embedding or vector search is terminal — there is no retrieval without
/// round 1. Queries share no mutable state; any number may run in parallel
/// against one orchestrator.
pub struct RetrievalOrchestrator {
    config: RetrievalConfig,
    embedder: Arc<dyn Embedder>,
    search: HybridSearchClient,
    traversal: GraphTraversalEngine,
    enricher: ContextEnricher,
    merger: ResultMerger,
}

impl RetrievalOrchestrator {
    pub fn new(
        config: RetrievalConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn ChunkIndex>,
        graph: Arc<dyn GraphStore>,
    ) -> Self {
        let timeout = config.call_timeout();
        Self {
            search: HybridSearchClient::new(index, config.rrf_k, timeout),
            traversal: GraphTraversalEngine::new(graph.clone(), timeout),
            enricher: ContextEnricher::new(
                graph,
                config.related_concept_cap,
                config.min_relationship_weight,
                timeout,
            ),
            merger: ResultMerger::new(),
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Run the full pipeline for one query.
    pub async fn retrieve(&self, query_text: &str) -> RetrievalResult<RetrievalOutcome> {
        let query_id = Uuid::new_v4();
        let mut stage = PipelineStage::Init;

        stage = self.advance(query_id, stage, PipelineStage::VectorSearch);
        let query = self.embed(query_text).await?;
        let round1 = self.search.search(&query, self.config.vector_top_k, None).await?;

        let mut seed_papers: Vec<NodeId> = Vec::new();
        for chunk in &round1 {
            if !seed_papers.contains(&chunk.paper_id) {
                seed_papers.push(chunk.paper_id.clone());
            }
        }
        let seeds: BTreeSet<NodeId> = seed_papers.iter().cloned().collect();

        stage = self.advance(query_id, stage, PipelineStage::GraphDiscover);
        let mut graph_degraded = false;
        let discoveries = if seeds.is_empty() {
            Vec::new()
        } else {
            match self
                .traversal
                .discover(
                    &seeds,
                    self.config.max_hops,
                    self.config.min_relationship_weight,
                    self.config.discovery_cap,
                )
                .await
            {
                Ok(found) => found,
                Err(RetrievalError::GraphUnavailable(reason)) => {
                    warn!(%query_id, %reason, "graph discovery unavailable, continuing vector-only");
                    graph_degraded = true;
                    Vec::new()
                }
                Err(other) => return Err(other),
            }
        };

        let round2 = if discoveries.is_empty() {
            Vec::new()
        } else {
            stage = self.advance(query_id, stage, PipelineStage::FilteredSearch);
            let filter: PaperFilter = discoveries.iter().map(|d| d.paper_id.clone()).collect();
            self.search
                .search(&query, self.config.graph_top_k, Some(&filter))
                .await?
        };

        stage = self.advance(query_id, stage, PipelineStage::Merge);
        let merged = self
            .merger
            .merge(round1, round2, self.config.context_cap);

        let results = if graph_degraded {
            merged
                .into_iter()
                .map(|chunk| RankedResult {
                    chunk,
                    metadata: EnrichmentMetadata::empty(),
                })
                .collect()
        } else {
            stage = self.advance(query_id, stage, PipelineStage::Enrich);
            self.enricher.enrich(merged, &discoveries).await
        };

        let _ = self.advance(query_id, stage, PipelineStage::Done);
        Ok(RetrievalOutcome {
            report: RetrievalReport {
                query_id,
                executed_at: chrono::Utc::now(),
                seed_papers,
                discovered_papers: discoveries.len(),
                graph_degraded,
            },
            results,
        })
    }

    async fn embed(&self, text: &str) -> RetrievalResult<EmbeddedQuery> {
        match tokio::time::timeout(self.config.call_timeout(), self.embedder.embed(text)).await {
            Ok(Ok(vector)) => Ok(EmbeddedQuery {
                text: text.to_string(),
                vector,
            }),
            Ok(Err(e)) => Err(RetrievalError::EmbeddingUnavailable(e.to_string())),
            Err(_) => Err(RetrievalError::EmbeddingUnavailable(
                "embedding call timed out".to_string(),
            )),
        }
    }

    fn advance(&self, query_id: Uuid, from: PipelineStage, to: PipelineStage) -> PipelineStage {
        debug!(%query_id, %from, %to, "pipeline stage");
        to
    }
}
