//! Hybrid dense+sparse search with Reciprocal Rank Fusion

use super::types::{Chunk, ChunkId, ChunkSource, EmbeddedQuery};
use super::{RetrievalError, RetrievalResult};
use crate::storage::{ChunkIndex, PaperFilter, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Executes fused nearest-neighbor plus lexical queries over one chunk index
///
/// The dense and sparse sub-queries are independent and issued
/// concurrently, joined before fusion. Raw sub-query scores are retained on
/// the chunk for inspection, but ordering comes from rank fusion alone:
/// `fused = Σ 1/(rrf_k + rank)` over the lists the chunk appears in, ties
/// broken by chunk id. A failure or timeout in either sub-query fails the
/// whole call — there is no silent fallback to a single modality.
pub struct HybridSearchClient {
    index: Arc<dyn ChunkIndex>,
    rrf_k: f64,
    call_timeout: Duration,
}

#[derive(Default)]
struct FusionSlot {
    dense_rank: Option<usize>,
    dense_score: Option<f32>,
    sparse_rank: Option<usize>,
    sparse_score: Option<f32>,
}

impl HybridSearchClient {
    pub fn new(index: Arc<dyn ChunkIndex>, rrf_k: f64, call_timeout: Duration) -> Self {
        Self {
            index,
            rrf_k,
            call_timeout,
        }
    }

    /// Run both sub-queries, fuse, and hydrate the top results.
    ///
    /// `filter`, when given, restricts both sub-queries to chunks of the
    /// allowed papers; the graph-discovery round uses this to fetch only
    /// newly discovered material.
    pub async fn search(
        &self,
        query: &EmbeddedQuery,
        top_k: usize,
        filter: Option<&PaperFilter>,
    ) -> RetrievalResult<Vec<Chunk>> {
        let dense_fut = tokio::time::timeout(
            self.call_timeout,
            self.index.dense_query(&query.vector, top_k, filter),
        );
        let sparse_fut = tokio::time::timeout(
            self.call_timeout,
            self.index.sparse_query(&query.text, top_k, filter),
        );
        let (dense, sparse) = tokio::join!(dense_fut, sparse_fut);
        let dense = unwrap_call(dense)?;
        let sparse = unwrap_call(sparse)?;
        debug!(
            dense = dense.len(),
            sparse = sparse.len(),
            filtered = filter.is_some(),
            "hybrid sub-queries returned"
        );

        // Rank fusion over the union of both lists. BTreeMap keeps the
        // walk order stable; final order is (fused desc, id asc).
        let mut slots: BTreeMap<ChunkId, FusionSlot> = BTreeMap::new();
        for (rank, (id, score)) in dense.into_iter().enumerate() {
            let slot = slots.entry(id).or_default();
            slot.dense_rank = Some(rank + 1);
            slot.dense_score = Some(score);
        }
        for (rank, (id, score)) in sparse.into_iter().enumerate() {
            let slot = slots.entry(id).or_default();
            slot.sparse_rank = Some(rank + 1);
            slot.sparse_score = Some(score);
        }

        let mut fused: Vec<(ChunkId, FusionSlot, f64)> = slots
            .into_iter()
            .map(|(id, slot)| {
                let score = self.rrf_term(slot.dense_rank) + self.rrf_term(slot.sparse_rank);
                (id, slot, score)
            })
            .collect();
        fused.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        fused.truncate(top_k);

        let ids: Vec<ChunkId> = fused.iter().map(|(id, _, _)| id.clone()).collect();
        let records = unwrap_call(
            tokio::time::timeout(self.call_timeout, self.index.load_chunks(&ids)).await,
        )?;

        let chunks = fused
            .into_iter()
            .zip(records)
            .map(|((id, slot, score), record)| {
                debug_assert_eq!(id, record.id);
                Chunk {
                    id: record.id,
                    paper_id: record.paper_id,
                    text: record.text,
                    dense_score: slot.dense_score,
                    sparse_score: slot.sparse_score,
                    fused_score: score,
                    source: ChunkSource::Vector,
                }
            })
            .collect();
        Ok(chunks)
    }

    fn rrf_term(&self, rank: Option<usize>) -> f64 {
        match rank {
            Some(r) => 1.0 / (self.rrf_k + r as f64),
            None => 0.0,
        }
    }
}

/// Collapse timeout and store failures into `RetrievalUnavailable`.
fn unwrap_call<T>(
    outcome: Result<Result<T, StoreError>, tokio::time::error::Elapsed>,
) -> RetrievalResult<T> {
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RetrievalError::RetrievalUnavailable(e.to_string())),
        Err(_) => Err(RetrievalError::RetrievalUnavailable(
            "chunk index call timed out".to_string(),
        )),
    }
}
