//! Whole-pipeline tests over in-memory backends

use super::orchestrator::{RetrievalConfig, RetrievalOrchestrator};
use super::types::{ChunkRecord, ChunkSource};
use super::RetrievalError;
use crate::embedding::{Embedder, EmbeddingError, HashEmbedder};
use crate::graph::{GraphNode, NodeId, NodeKind, Relationship, RelationshipKind};
use crate::storage::{
    ChunkIndex, GraphStore, MemoryChunkIndex, MemoryGraphStore, Neighbor, PaperFilter, StoreError,
    StoreResult,
};
use async_trait::async_trait;
use std::sync::Arc;

const QUERY: &str = "transformer attention translation";

/// Small literature fixture: two papers matching the query directly, a third
/// reachable only through a shared-method edge, a fourth fully disconnected.
fn fixture_graph() -> MemoryGraphStore {
    let store = MemoryGraphStore::new();
    store.insert_node(GraphNode::paper("p1", "Attention Is All You Need"));
    store.insert_node(GraphNode::paper("p2", "Evaluating Attention in Translation"));
    store.insert_node(GraphNode::paper("p3", "Convolutional Sequence Models"));
    store.insert_node(GraphNode::paper("p4", "A Survey of Radio Telescopes"));
    store.insert_node(GraphNode::entity(NodeKind::Concept, "attention"));
    store.insert_node(GraphNode::entity(NodeKind::Concept, "self-attention"));
    store.insert_node(GraphNode::entity(NodeKind::Method, "transformer"));

    store.insert_relationship(Relationship::new(
        NodeId::from("paper:p1"),
        NodeId::from("concept:attention"),
        RelationshipKind::Mentions,
    ));
    store.insert_relationship(Relationship::new(
        NodeId::from("paper:p2"),
        NodeId::from("concept:attention"),
        RelationshipKind::Mentions,
    ));
    store.insert_relationship(Relationship::new(
        NodeId::from("paper:p1"),
        NodeId::from("method:transformer"),
        RelationshipKind::Uses,
    ));
    store.insert_relationship(Relationship::weighted(
        NodeId::from("concept:attention"),
        NodeId::from("concept:self-attention"),
        RelationshipKind::RelatedTo,
        4,
    ));
    store.insert_relationship(Relationship::weighted(
        NodeId::from("paper:p1"),
        NodeId::from("paper:p3"),
        RelationshipKind::SharedMethod,
        3,
    ));
    store
}

async fn fixture_index(embedder: &HashEmbedder) -> MemoryChunkIndex {
    let index = MemoryChunkIndex::new();
    let chunks = [
        ("c1", "paper:p1", "transformer attention for machine translation"),
        ("c2", "paper:p2", "attention improves translation quality"),
        ("c3", "paper:p3", "convolutional sequence encoder architecture"),
        ("c4", "paper:p4", "radio telescope survey of nearby galaxies"),
    ];
    for (id, paper, text) in chunks {
        let embedding = embedder.embed(text).await.unwrap();
        index.insert_chunk(ChunkRecord::new(id, NodeId::from(paper), text), embedding);
    }
    index
}

fn config() -> RetrievalConfig {
    RetrievalConfig::new()
        .with_vector_top_k(2)
        .with_graph_top_k(5)
        .with_max_hops(2)
        .with_min_relationship_weight(2)
        .with_context_cap(10)
}

async fn fixture_orchestrator() -> RetrievalOrchestrator {
    let embedder = HashEmbedder::new(32);
    let index = fixture_index(&embedder).await;
    RetrievalOrchestrator::new(
        config(),
        Arc::new(embedder),
        Arc::new(index),
        Arc::new(fixture_graph()),
    )
}

#[tokio::test]
async fn pipeline_surfaces_direct_and_discovered_chunks() {
    let orchestrator = fixture_orchestrator().await;
    let outcome = orchestrator.retrieve(QUERY).await.unwrap();

    let ids: Vec<&str> = outcome
        .results
        .iter()
        .map(|r| r.chunk.id.as_str())
        .collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert_eq!(outcome.results[0].chunk.source, ChunkSource::Vector);
    assert_eq!(outcome.results[2].chunk.source, ChunkSource::Graph);
    assert_eq!(outcome.report.discovered_papers, 1);
    assert!(!outcome.report.graph_degraded);
}

#[tokio::test]
async fn two_runs_produce_identical_results() {
    let orchestrator = fixture_orchestrator().await;
    let first = orchestrator.retrieve(QUERY).await.unwrap();
    let second = orchestrator.retrieve(QUERY).await.unwrap();
    assert_eq!(first.results, second.results);
}

#[tokio::test]
async fn no_chunk_id_appears_twice_in_final_results() {
    let orchestrator = fixture_orchestrator().await;
    let outcome = orchestrator.retrieve(QUERY).await.unwrap();

    let mut ids: Vec<&str> = outcome
        .results
        .iter()
        .map(|r| r.chunk.id.as_str())
        .collect();
    let before = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), before);
}

#[tokio::test]
async fn discovery_paths_only_on_non_seed_papers() {
    let orchestrator = fixture_orchestrator().await;
    let outcome = orchestrator.retrieve(QUERY).await.unwrap();

    for result in &outcome.results {
        match &result.metadata.discovery_path {
            Some(path) => {
                assert!(
                    !outcome.report.seed_papers.contains(&result.chunk.paper_id),
                    "a seed paper must never carry a discovery path"
                );
                assert!(path.len() <= orchestrator.config().max_hops);
                assert_eq!(
                    path.seed().map(NodeId::as_str),
                    Some("paper:p1"),
                    "p3 was discovered from p1"
                );
            }
            None => assert_eq!(result.chunk.source, ChunkSource::Vector),
        }
    }
}

#[tokio::test]
async fn enrichment_carries_first_hop_and_related_entities() {
    let orchestrator = fixture_orchestrator().await;
    let outcome = orchestrator.retrieve(QUERY).await.unwrap();

    let p1 = outcome
        .results
        .iter()
        .find(|r| r.chunk.paper_id.as_str() == "paper:p1")
        .unwrap();
    assert_eq!(p1.metadata.concepts, vec!["attention"]);
    assert_eq!(p1.metadata.methods, vec!["transformer"]);
    assert_eq!(p1.metadata.related_concepts, vec!["self-attention"]);
}

#[tokio::test]
async fn chunk_found_by_both_rounds_keeps_vector_provenance() {
    // p3's chunk shares query vocabulary, so it lands in round 1 as well as
    // in the graph round after p1 discovers p3.
    let embedder = HashEmbedder::new(32);
    let index = MemoryChunkIndex::new();
    let chunks = [
        ("c1", "paper:p1", "transformer attention for machine translation"),
        ("c3", "paper:p3", "attention variants in convolutional models"),
    ];
    for (id, paper, text) in chunks {
        let embedding = embedder.embed(text).await.unwrap();
        index.insert_chunk(ChunkRecord::new(id, NodeId::from(paper), text), embedding);
    }

    let orchestrator = RetrievalOrchestrator::new(
        config().with_vector_top_k(2),
        Arc::new(embedder),
        Arc::new(index),
        Arc::new(fixture_graph()),
    );
    let outcome = orchestrator.retrieve(QUERY).await.unwrap();

    let c3: Vec<_> = outcome
        .results
        .iter()
        .filter(|r| r.chunk.id.as_str() == "c3")
        .collect();
    assert_eq!(c3.len(), 1);
    assert_eq!(c3[0].chunk.source, ChunkSource::Vector);
}

struct DownGraphStore;

#[async_trait]
impl GraphStore for DownGraphStore {
    async fn get_node(&self, _id: &NodeId) -> StoreResult<Option<GraphNode>> {
        Err(StoreError::Unreachable("graph store offline".into()))
    }
    async fn neighbors(
        &self,
        _id: &NodeId,
        _kinds: &[RelationshipKind],
        _min_weight: u32,
    ) -> StoreResult<Vec<Neighbor>> {
        Err(StoreError::Unreachable("graph store offline".into()))
    }
}

#[tokio::test]
async fn graph_failure_degrades_to_unchanged_vector_results() {
    let embedder = HashEmbedder::new(32);
    let index = Arc::new(fixture_index(&embedder).await);
    let embedder = Arc::new(embedder);

    let healthy = RetrievalOrchestrator::new(
        config(),
        embedder.clone(),
        index.clone(),
        Arc::new(fixture_graph()),
    );
    let degraded = RetrievalOrchestrator::new(config(), embedder, index, Arc::new(DownGraphStore));

    let healthy_outcome = healthy.retrieve(QUERY).await.unwrap();
    let degraded_outcome = degraded.retrieve(QUERY).await.unwrap();

    assert!(degraded_outcome.report.graph_degraded);
    let degraded_ids: Vec<&str> = degraded_outcome
        .results
        .iter()
        .map(|r| r.chunk.id.as_str())
        .collect();
    let healthy_vector_ids: Vec<&str> = healthy_outcome
        .results
        .iter()
        .filter(|r| r.chunk.source == ChunkSource::Vector)
        .map(|r| r.chunk.id.as_str())
        .collect();
    assert_eq!(degraded_ids, healthy_vector_ids);
    assert!(degraded_outcome
        .results
        .iter()
        .all(|r| r.metadata.discovery_path.is_none()));
}

#[tokio::test]
async fn unmatched_query_returns_empty_ok() {
    let orchestrator = fixture_orchestrator().await;
    let outcome = orchestrator.retrieve("zzz qqq xxx").await;
    // No relevant content is an empty Ok, never an error.
    assert!(outcome.is_ok());
}

struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unreachable("embedding service offline".into()))
    }
    fn dimensions(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn embedding_failure_aborts_the_query() {
    let embedder = HashEmbedder::new(32);
    let index = fixture_index(&embedder).await;
    let orchestrator = RetrievalOrchestrator::new(
        config(),
        Arc::new(DownEmbedder),
        Arc::new(index),
        Arc::new(fixture_graph()),
    );

    let err = orchestrator.retrieve(QUERY).await.unwrap_err();
    assert!(matches!(err, RetrievalError::EmbeddingUnavailable(_)));
}

struct DownChunkIndex;

#[async_trait]
impl ChunkIndex for DownChunkIndex {
    async fn dense_query(
        &self,
        _embedding: &[f32],
        _top_k: usize,
        _filter: Option<&PaperFilter>,
    ) -> StoreResult<Vec<(super::types::ChunkId, f32)>> {
        Err(StoreError::Unreachable("vector store offline".into()))
    }
    async fn sparse_query(
        &self,
        _text: &str,
        _top_k: usize,
        _filter: Option<&PaperFilter>,
    ) -> StoreResult<Vec<(super::types::ChunkId, f32)>> {
        Err(StoreError::Unreachable("vector store offline".into()))
    }
    async fn load_chunks(
        &self,
        _ids: &[super::types::ChunkId],
    ) -> StoreResult<Vec<ChunkRecord>> {
        Err(StoreError::Unreachable("vector store offline".into()))
    }
}

#[tokio::test]
async fn vector_store_failure_is_terminal() {
    let orchestrator = RetrievalOrchestrator::new(
        config(),
        Arc::new(HashEmbedder::new(32)),
        Arc::new(DownChunkIndex),
        Arc::new(fixture_graph()),
    );

    let err = orchestrator.retrieve(QUERY).await.unwrap_err();
    assert!(matches!(err, RetrievalError::RetrievalUnavailable(_)));
}
