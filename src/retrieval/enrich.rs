//! Attaching graph provenance to merged results

use super::types::{Chunk, EnrichmentMetadata, RankedResult};
use super::{RetrievalError, RetrievalResult};
use crate::graph::{Discovery, DiscoveryPath, NodeId, NodeKind, RelationshipKind};
use crate::storage::{GraphStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Attaches per-paper graph metadata to each surviving chunk
///
/// Reads the graph, never writes it: for every chunk's paper the first-hop
/// `mentions`/`uses` neighbors become the concept and method lists, the
/// `related_to` neighborhood of those concepts becomes `related_concepts`,
/// and graph-discovered papers carry the path that reached them. A paper
/// whose graph record is missing degrades to empty metadata — one absent
/// record never fails the query.
pub struct ContextEnricher {
    store: Arc<dyn GraphStore>,
    related_cap: usize,
    min_related_weight: u32,
    call_timeout: Duration,
}

impl ContextEnricher {
    pub fn new(
        store: Arc<dyn GraphStore>,
        related_cap: usize,
        min_related_weight: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            related_cap,
            min_related_weight,
            call_timeout,
        }
    }

    /// Enrich ranked chunks with graph metadata and discovery paths.
    pub async fn enrich(
        &self,
        chunks: Vec<Chunk>,
        discoveries: &[Discovery],
    ) -> Vec<RankedResult> {
        let paths: HashMap<&NodeId, &DiscoveryPath> = discoveries
            .iter()
            .map(|d| (&d.paper_id, &d.path))
            .collect();

        // Papers repeat across chunks; look each one up once.
        let mut cache: HashMap<NodeId, EnrichmentMetadata> = HashMap::new();
        let mut results = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if !cache.contains_key(&chunk.paper_id) {
                let built = match self.paper_metadata(&chunk.paper_id).await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!(paper = %chunk.paper_id, error = %e, "enrichment degraded to empty metadata");
                        EnrichmentMetadata::empty()
                    }
                };
                cache.insert(chunk.paper_id.clone(), built);
            }
            let mut metadata = cache[&chunk.paper_id].clone();
            metadata.discovery_path = paths.get(&chunk.paper_id).map(|p| (*p).clone());
            results.push(RankedResult { chunk, metadata });
        }

        results
    }

    /// First-hop concepts and methods plus the related-concept neighborhood.
    async fn paper_metadata(&self, paper_id: &NodeId) -> RetrievalResult<EnrichmentMetadata> {
        let node = self.call(self.store.get_node(paper_id)).await?;
        if node.is_none() {
            return Err(RetrievalError::EnrichmentLookupMissing(paper_id.clone()));
        }

        let mentioned = self
            .call(
                self.store
                    .neighbors(paper_id, &[RelationshipKind::Mentions], 0),
            )
            .await?;
        let used = self
            .call(self.store.neighbors(paper_id, &[RelationshipKind::Uses], 0))
            .await?;

        let mut concepts: Vec<String> = mentioned
            .iter()
            .filter(|n| n.node.kind == NodeKind::Concept)
            .map(|n| n.node.name.clone())
            .collect();
        concepts.sort_unstable();
        concepts.dedup();

        let mut methods: Vec<String> = used
            .iter()
            .filter(|n| n.node.kind == NodeKind::Method)
            .map(|n| n.node.name.clone())
            .collect();
        methods.sort_unstable();
        methods.dedup();

        let mut related_concepts: Vec<String> = Vec::new();
        for concept in mentioned.iter().filter(|n| n.node.kind == NodeKind::Concept) {
            let related = self
                .call(self.store.neighbors(
                    &concept.node.id,
                    &[RelationshipKind::RelatedTo],
                    self.min_related_weight,
                ))
                .await?;
            related_concepts.extend(
                related
                    .into_iter()
                    .filter(|n| n.node.kind == NodeKind::Concept)
                    .map(|n| n.node.name),
            );
        }
        related_concepts.sort_unstable();
        related_concepts.dedup();
        related_concepts.retain(|name| !concepts.contains(name));
        related_concepts.truncate(self.related_cap);

        Ok(EnrichmentMetadata {
            concepts,
            methods,
            related_concepts,
            discovery_path: None,
        })
    }

    async fn call<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> RetrievalResult<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RetrievalError::GraphUnavailable(e.to_string())),
            Err(_) => Err(RetrievalError::GraphUnavailable(
                "graph store call timed out".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphNode, PathHop, Relationship};
    use crate::retrieval::types::{ChunkId, ChunkSource};
    use crate::storage::MemoryGraphStore;

    fn chunk(id: &str, paper: &str) -> Chunk {
        Chunk {
            id: ChunkId::from(id),
            paper_id: NodeId::from(paper),
            text: String::new(),
            dense_score: None,
            sparse_score: None,
            fused_score: 0.5,
            source: ChunkSource::Vector,
        }
    }

    fn annotated_store() -> MemoryGraphStore {
        let store = MemoryGraphStore::new();
        store.insert_node(GraphNode::paper("p1", "Paper One"));
        store.insert_node(GraphNode::entity(NodeKind::Concept, "attention"));
        store.insert_node(GraphNode::entity(NodeKind::Concept, "self-attention"));
        store.insert_node(GraphNode::entity(NodeKind::Method, "transformer"));
        store.insert_relationship(Relationship::new(
            NodeId::from("paper:p1"),
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
        store
    }

    fn enricher(store: MemoryGraphStore) -> ContextEnricher {
        ContextEnricher::new(Arc::new(store), 8, 1, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn attaches_first_hop_concepts_and_methods() {
        let enricher = enricher(annotated_store());
        let results = enricher.enrich(vec![chunk("c1", "paper:p1")], &[]).await;

        assert_eq!(results.len(), 1);
        let metadata = &results[0].metadata;
        assert_eq!(metadata.concepts, vec!["attention"]);
        assert_eq!(metadata.methods, vec!["transformer"]);
        assert_eq!(metadata.related_concepts, vec!["self-attention"]);
        assert!(metadata.discovery_path.is_none());
    }

    #[tokio::test]
    async fn discovered_papers_carry_their_path() {
        let store = annotated_store();
        store.insert_node(GraphNode::paper("p2", "Paper Two"));
        let enricher = enricher(store);

        let discoveries = vec![Discovery {
            paper_id: NodeId::from("paper:p2"),
            title: "Paper Two".into(),
            path: DiscoveryPath::new(
                vec![PathHop::new(
                    NodeId::from("paper:p1"),
                    RelationshipKind::SharedMethod,
                )],
                3,
            ),
        }];
        let results = enricher
            .enrich(
                vec![chunk("c1", "paper:p1"), chunk("c2", "paper:p2")],
                &discoveries,
            )
            .await;

        assert!(results[0].metadata.discovery_path.is_none());
        let path = results[1].metadata.discovery_path.as_ref().unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.cumulative_weight, 3);
    }

    #[tokio::test]
    async fn missing_paper_degrades_to_empty_metadata() {
        let enricher = enricher(annotated_store());
        let results = enricher
            .enrich(
                vec![chunk("c1", "paper:p1"), chunk("c2", "paper:ghost")],
                &[],
            )
            .await;

        assert_eq!(results.len(), 2, "a missing record must not drop the chunk");
        assert_eq!(results[1].metadata, EnrichmentMetadata::empty());
        assert!(!results[0].metadata.concepts.is_empty());
    }

    #[tokio::test]
    async fn related_concepts_respect_the_cap() {
        let store = MemoryGraphStore::new();
        store.insert_node(GraphNode::paper("p1", "Paper One"));
        store.insert_node(GraphNode::entity(NodeKind::Concept, "hub"));
        store.insert_relationship(Relationship::new(
            NodeId::from("paper:p1"),
            NodeId::from("concept:hub"),
            RelationshipKind::Mentions,
        ));
        for i in 0..10 {
            let name = format!("concept-{i:02}");
            store.insert_node(GraphNode::entity(NodeKind::Concept, &name));
            store.insert_relationship(Relationship::weighted(
                NodeId::from("concept:hub"),
                NodeId::from(format!("concept:{name}")),
                RelationshipKind::RelatedTo,
                2,
            ));
        }

        let enricher = ContextEnricher::new(Arc::new(store), 3, 1, Duration::from_secs(5));
        let results = enricher.enrich(vec![chunk("c1", "paper:p1")], &[]).await;
        assert_eq!(results[0].metadata.related_concepts.len(), 3);
    }
}
