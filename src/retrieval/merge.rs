//! Merging the two retrieval rounds

use super::types::{Chunk, ChunkId, ChunkSource};
use std::collections::HashSet;

/// Deduplicates and orders chunks across the two retrieval rounds
///
/// Round-1 chunks answer the query directly; round-2 chunks exist because
/// graph traversal pointed at their papers. Graph discovery supplements
/// direct relevance, never supersedes it, so the round-1 block is ranked
/// strictly ahead of the round-2 block; each block keeps its own fused-score
/// order. A chunk surfacing in both rounds keeps its round-1 entry and the
/// `Vector` provenance tag — the simpler explanation wins.
#[derive(Debug, Default)]
pub struct ResultMerger;

impl ResultMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge, deduplicate by chunk id, and truncate to `cap`.
    pub fn merge(&self, round1: Vec<Chunk>, round2: Vec<Chunk>, cap: usize) -> Vec<Chunk> {
        let mut seen: HashSet<ChunkId> = HashSet::new();
        let mut merged = Vec::with_capacity(round1.len() + round2.len());

        for mut chunk in round1 {
            if seen.insert(chunk.id.clone()) {
                chunk.source = ChunkSource::Vector;
                merged.push(chunk);
            }
        }
        for mut chunk in round2 {
            if seen.insert(chunk.id.clone()) {
                chunk.source = ChunkSource::Graph;
                merged.push(chunk);
            }
        }

        merged.truncate(cap);
        merged
    }
}
