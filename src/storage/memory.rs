//! In-memory backends
//!
//! Test/fallback implementations of the two storage drivers. Dense scoring
//! is exact cosine over stored vectors, sparse scoring is BM25 computed per
//! query over the whole chunk set — fine at the corpus sizes tests and
//! demos use. The persistent path is the SQLite pair in `storage::sqlite`.

use super::traits::{ChunkIndex, GraphStore, Neighbor, PaperFilter, StoreError, StoreResult};
use crate::graph::{passes_weight, GraphNode, NodeId, Relationship, RelationshipKind};
use crate::retrieval::types::{ChunkId, ChunkRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

/// In-memory knowledge graph store
///
/// Adjacency is indexed from both endpoints at insert time, so `neighbors`
/// is a single map lookup regardless of edge direction.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    nodes: DashMap<NodeId, GraphNode>,
    adjacency: DashMap<NodeId, Vec<(NodeId, RelationshipKind, u32)>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node
    pub fn insert_node(&self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert a relationship, indexing it from both endpoints
    pub fn insert_relationship(&self, rel: Relationship) {
        self.adjacency
            .entry(rel.source.clone())
            .or_default()
            .push((rel.target.clone(), rel.kind, rel.weight));
        self.adjacency
            .entry(rel.target)
            .or_default()
            .push((rel.source, rel.kind, rel.weight));
    }

    /// Number of nodes in the store
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn get_node(&self, id: &NodeId) -> StoreResult<Option<GraphNode>> {
        Ok(self.nodes.get(id).map(|n| n.value().clone()))
    }

    async fn neighbors(
        &self,
        id: &NodeId,
        kinds: &[RelationshipKind],
        min_weight: u32,
    ) -> StoreResult<Vec<Neighbor>> {
        let Some(adjacent) = self.adjacency.get(id) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for (neighbor_id, kind, weight) in adjacent.iter() {
            if !kinds.contains(kind) || !passes_weight(*kind, *weight, min_weight) {
                continue;
            }
            if let Some(node) = self.nodes.get(neighbor_id) {
                out.push(Neighbor {
                    node: node.value().clone(),
                    kind: *kind,
                    weight: *weight,
                });
            }
        }

        out.sort_by(|a, b| a.node.id.cmp(&b.node.id));
        Ok(out)
    }
}

/// In-memory dense+sparse chunk index
#[derive(Debug, Default)]
pub struct MemoryChunkIndex {
    chunks: DashMap<ChunkId, (ChunkRecord, Vec<f32>)>,
}

/// BM25 term-saturation parameter
const BM25_K1: f32 = 1.2;
/// BM25 length-normalization parameter
const BM25_B: f32 = 0.75;

impl MemoryChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk with its embedding
    pub fn insert_chunk(&self, record: ChunkRecord, embedding: Vec<f32>) {
        self.chunks.insert(record.id.clone(), (record, embedding));
    }

    /// Number of indexed chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn admitted(&self, record: &ChunkRecord, filter: Option<&PaperFilter>) -> bool {
        filter.map_or(true, |allowed| allowed.contains(&record.paper_id))
    }
}

#[async_trait]
impl ChunkIndex for MemoryChunkIndex {
    async fn dense_query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&PaperFilter>,
    ) -> StoreResult<Vec<(ChunkId, f32)>> {
        let mut scored: Vec<(ChunkId, f32)> = self
            .chunks
            .iter()
            .filter(|entry| self.admitted(&entry.value().0, filter))
            .map(|entry| {
                let (record, vector) = entry.value();
                (record.id.clone(), cosine_similarity(embedding, vector))
            })
            .collect();

        sort_ranked(&mut scored);
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn sparse_query(
        &self,
        text: &str,
        top_k: usize,
        filter: Option<&PaperFilter>,
    ) -> StoreResult<Vec<(ChunkId, f32)>> {
        let query_terms = tokenize(text);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        // Corpus statistics over the full index; the paper filter narrows
        // candidates, not the statistics, matching how a shared index behaves.
        let mut doc_terms: HashMap<ChunkId, (HashMap<String, usize>, usize, bool)> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut total_len = 0usize;

        for entry in self.chunks.iter() {
            let (record, _) = entry.value();
            let terms = tokenize(&record.text);
            let len = terms.len();
            total_len += len;
            let mut counts: HashMap<String, usize> = HashMap::new();
            for term in terms {
                *counts.entry(term).or_insert(0) += 1;
            }
            for term in &query_terms {
                if counts.contains_key(term.as_str()) {
                    *doc_freq.entry(term.as_str()).or_insert(0) += 1;
                }
            }
            let admitted = self.admitted(record, filter);
            doc_terms.insert(record.id.clone(), (counts, len, admitted));
        }

        let doc_count = doc_terms.len();
        if doc_count == 0 {
            return Ok(Vec::new());
        }
        let avg_len = total_len as f32 / doc_count as f32;

        let mut scored: Vec<(ChunkId, f32)> = Vec::new();
        for (id, (counts, len, admitted)) in &doc_terms {
            if !admitted {
                continue;
            }
            let mut score = 0.0f32;
            for term in &query_terms {
                let tf = *counts.get(term.as_str()).unwrap_or(&0) as f32;
                if tf == 0.0 {
                    continue;
                }
                let df = *doc_freq.get(term.as_str()).unwrap_or(&0) as f32;
                let idf = ((doc_count as f32 - df + 0.5) / (df + 0.5) + 1.0).ln();
                let norm = tf * (BM25_K1 + 1.0)
                    / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * *len as f32 / avg_len));
                score += idf * norm;
            }
            if score > 0.0 {
                scored.push((id.clone(), score));
            }
        }

        sort_ranked(&mut scored);
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn load_chunks(&self, ids: &[ChunkId]) -> StoreResult<Vec<ChunkRecord>> {
        ids.iter()
            .map(|id| {
                self.chunks
                    .get(id)
                    .map(|entry| entry.value().0.clone())
                    .ok_or_else(|| StoreError::Malformed(format!("unknown chunk id {}", id)))
            })
            .collect()
    }
}

/// Descending score, chunk id ascending on ties
fn sort_ranked(scored: &mut [(ChunkId, f32)]) {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
