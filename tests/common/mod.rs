//! Shared fixture corpus for integration tests
//!
//! A small machine-learning literature graph: five papers, their chunks,
//! and the entity layer connecting them. Built against the in-memory
//! backends; `sqlite_graph_store.rs` mirrors the graph side into SQLite.

use litgraph::embedding::{Embedder, HashEmbedder};
use litgraph::storage::{MemoryChunkIndex, MemoryGraphStore};
use litgraph::{ChunkRecord, GraphNode, NodeId, NodeKind, Relationship, RelationshipKind};

/// `(source id, title)` for every paper in the fixture corpus
pub const PAPERS: &[(&str, &str)] = &[
    ("p1", "Attention Is All You Need"),
    ("p2", "Bidirectional Transformers for Language Understanding"),
    ("p3", "Convolutional Networks for Sentence Classification"),
    ("p4", "Deep Residual Learning for Image Recognition"),
    ("p5", "Neural Translation by Jointly Learning to Align"),
];

/// `(chunk id, paper, text)` for every chunk in the fixture corpus
pub const CHUNKS: &[(&str, &str, &str)] = &[
    ("c1a", "paper:p1", "the transformer relies entirely on attention mechanisms"),
    ("c1b", "paper:p1", "multi-head attention replaces recurrence in the transformer"),
    ("c2", "paper:p2", "pretraining a transformer with masked attention objectives"),
    ("c3", "paper:p3", "convolutional filters capture n-gram features for classification"),
    ("c4", "paper:p4", "residual connections ease training of very deep networks"),
    ("c5", "paper:p5", "soft alignment lets translation attend to source words"),
];

/// Entity and relationship layer shared by the integration tests
pub fn populate_graph(store: &MemoryGraphStore) {
    for (id, title) in PAPERS {
        store.insert_node(GraphNode::paper(id, *title));
    }
    for (kind, name) in [
        (NodeKind::Concept, "attention"),
        (NodeKind::Concept, "self-attention"),
        (NodeKind::Concept, "alignment"),
        (NodeKind::Concept, "classification"),
        (NodeKind::Method, "transformer"),
        (NodeKind::Method, "convolutional neural network"),
        (NodeKind::ResearchArea, "natural language processing"),
        (NodeKind::ResearchArea, "computer vision"),
    ] {
        store.insert_node(GraphNode::entity(kind, name));
    }

    for rel in fixture_relationships() {
        store.insert_relationship(rel);
    }
}

/// The fixture's relationships, usable against any store
pub fn fixture_relationships() -> Vec<Relationship> {
    let mentions = [
        ("paper:p1", "concept:attention"),
        ("paper:p1", "concept:self-attention"),
        ("paper:p2", "concept:attention"),
        ("paper:p3", "concept:classification"),
        ("paper:p5", "concept:attention"),
        ("paper:p5", "concept:alignment"),
    ];
    let uses = [
        ("paper:p1", "method:transformer"),
        ("paper:p2", "method:transformer"),
        ("paper:p3", "method:convolutional neural network"),
        ("paper:p4", "method:convolutional neural network"),
    ];
    let belongs = [
        ("paper:p1", "area:natural language processing"),
        ("paper:p2", "area:natural language processing"),
        ("paper:p3", "area:natural language processing"),
        ("paper:p4", "area:computer vision"),
    ];

    let mut rels = Vec::new();
    for (source, target) in mentions {
        rels.push(Relationship::new(
            NodeId::from(source),
            NodeId::from(target),
            RelationshipKind::Mentions,
        ));
    }
    for (source, target) in uses {
        rels.push(Relationship::new(
            NodeId::from(source),
            NodeId::from(target),
            RelationshipKind::Uses,
        ));
    }
    for (source, target) in belongs {
        rels.push(Relationship::new(
            NodeId::from(source),
            NodeId::from(target),
            RelationshipKind::BelongsTo,
        ));
    }
    rels.push(Relationship::new(
        NodeId::from("method:transformer"),
        NodeId::from("area:natural language processing"),
        RelationshipKind::AppliedIn,
    ));
    rels.push(Relationship::new(
        NodeId::from("method:convolutional neural network"),
        NodeId::from("area:computer vision"),
        RelationshipKind::AppliedIn,
    ));
    rels.push(Relationship::weighted(
        NodeId::from("concept:attention"),
        NodeId::from("concept:self-attention"),
        RelationshipKind::RelatedTo,
        4,
    ));
    rels.push(Relationship::weighted(
        NodeId::from("concept:attention"),
        NodeId::from("concept:alignment"),
        RelationshipKind::RelatedTo,
        3,
    ));
    rels.push(Relationship::weighted(
        NodeId::from("paper:p1"),
        NodeId::from("paper:p2"),
        RelationshipKind::SharedMethod,
        2,
    ));
    rels.push(Relationship::weighted(
        NodeId::from("paper:p3"),
        NodeId::from("paper:p4"),
        RelationshipKind::SharedMethod,
        1,
    ));
    rels
}

/// Embed and index every fixture chunk
pub async fn populate_index(index: &MemoryChunkIndex, embedder: &HashEmbedder) {
    for (id, paper, text) in CHUNKS {
        let embedding = embedder.embed(text).await.expect("hash embedder is infallible");
        index.insert_chunk(
            ChunkRecord::new(*id, NodeId::from(*paper), *text),
            embedding,
        );
    }
}
