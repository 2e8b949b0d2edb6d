//! Graph discovery: bounded traversal from seed papers

use super::{RetrievalError, RetrievalResult};
use crate::graph::{
    Discovery, DiscoveryPath, NodeId, NodeKind, PathHop, RelationshipKind,
};
use crate::storage::{GraphStore, StoreError};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Walks typed edges outward from round-1 papers to structurally related ones
///
/// Breadth-first, expressed as an explicit frontier/visited loop over the
/// store's single-hop `neighbors` primitive — hop bounding and tie-breaking
/// stay auditable and dense graphs cannot blow the stack. Which edge kinds
/// are followed depends on where the walker stands: papers fan out to their
/// entities and shared-method peers, entities lead to related entities and
/// back down to papers. Discovery targets are always papers; seeds never
/// resurface even when a cycle leads back to them.
pub struct GraphTraversalEngine {
    store: Arc<dyn GraphStore>,
    call_timeout: Duration,
}

/// Frontier entry: a node plus the best path that reached it
struct Walker {
    id: NodeId,
    kind: NodeKind,
    path: DiscoveryPath,
}

impl GraphTraversalEngine {
    pub fn new(store: Arc<dyn GraphStore>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    /// Discover papers reachable from the seeds within `max_hops`.
    ///
    /// Edges of weighted kinds below `min_weight` are pruned at every hop
    /// boundary, which bounds fan-out through high-degree generic concepts.
    /// Per discovered paper the shortest path is kept (cumulative-weight,
    /// then lexicographic tie-break). Output is capped to `result_cap`
    /// papers, ordered by `(path length asc, cumulative weight desc,
    /// paper id asc)`.
    pub async fn discover(
        &self,
        seed_paper_ids: &BTreeSet<NodeId>,
        max_hops: usize,
        min_weight: u32,
        result_cap: usize,
    ) -> RetrievalResult<Vec<Discovery>> {
        let mut visited: HashSet<NodeId> = seed_paper_ids.iter().cloned().collect();
        let mut frontier: Vec<Walker> = seed_paper_ids
            .iter()
            .map(|id| Walker {
                id: id.clone(),
                kind: NodeKind::Paper,
                path: DiscoveryPath::new(Vec::new(), 0),
            })
            .collect();
        let mut discovered: BTreeMap<NodeId, (String, DiscoveryPath)> = BTreeMap::new();

        for depth in 0..max_hops {
            if frontier.is_empty() {
                break;
            }

            // Best path per node reached at this level; a node reached twice
            // at equal depth keeps the higher-weight path.
            let mut reached: BTreeMap<NodeId, (NodeKind, String, DiscoveryPath)> = BTreeMap::new();

            for walker in &frontier {
                let kinds = expansion_kinds(walker.kind);
                let neighbors = self.neighbors(&walker.id, kinds, min_weight).await?;

                for neighbor in neighbors {
                    if visited.contains(&neighbor.node.id) {
                        continue;
                    }
                    let mut hops = walker.path.hops.clone();
                    hops.push(PathHop::new(walker.id.clone(), neighbor.kind));
                    let candidate =
                        DiscoveryPath::new(hops, walker.path.cumulative_weight + neighbor.weight);

                    match reached.entry(neighbor.node.id.clone()) {
                        std::collections::btree_map::Entry::Vacant(slot) => {
                            slot.insert((neighbor.node.kind, neighbor.node.name, candidate));
                        }
                        std::collections::btree_map::Entry::Occupied(mut slot) => {
                            if candidate.preference(&slot.get().2) == std::cmp::Ordering::Less {
                                slot.get_mut().2 = candidate;
                            }
                        }
                    }
                }
            }

            frontier = Vec::with_capacity(reached.len());
            for (id, (kind, name, path)) in reached {
                visited.insert(id.clone());
                if kind == NodeKind::Paper {
                    discovered.insert(id.clone(), (name, path.clone()));
                }
                frontier.push(Walker { id, kind, path });
            }
            debug!(
                depth = depth + 1,
                frontier = frontier.len(),
                discovered = discovered.len(),
                "traversal level complete"
            );
        }

        let mut out: Vec<Discovery> = discovered
            .into_iter()
            .map(|(paper_id, (title, path))| Discovery {
                paper_id,
                title,
                path,
            })
            .collect();
        out.sort_by(|a, b| {
            a.path
                .preference(&b.path)
                .then_with(|| a.paper_id.cmp(&b.paper_id))
        });
        out.truncate(result_cap);
        Ok(out)
    }

    async fn neighbors(
        &self,
        id: &NodeId,
        kinds: &[RelationshipKind],
        min_weight: u32,
    ) -> RetrievalResult<Vec<crate::storage::Neighbor>> {
        match tokio::time::timeout(self.call_timeout, self.store.neighbors(id, kinds, min_weight))
            .await
        {
            Ok(Ok(neighbors)) => Ok(neighbors),
            Ok(Err(e)) => Err(map_store_error(e)),
            Err(_) => Err(RetrievalError::GraphUnavailable(
                "graph store call timed out".to_string(),
            )),
        }
    }
}

/// Edge kinds followed from a node, by its kind
fn expansion_kinds(kind: NodeKind) -> &'static [RelationshipKind] {
    match kind {
        NodeKind::Paper => &[
            RelationshipKind::SharedMethod,
            RelationshipKind::Mentions,
            RelationshipKind::Uses,
            RelationshipKind::BelongsTo,
        ],
        NodeKind::Concept => &[RelationshipKind::RelatedTo, RelationshipKind::Mentions],
        NodeKind::Method => &[RelationshipKind::AppliedIn, RelationshipKind::Uses],
        NodeKind::ResearchArea => &[RelationshipKind::BelongsTo, RelationshipKind::AppliedIn],
    }
}

fn map_store_error(e: StoreError) -> RetrievalError {
    RetrievalError::GraphUnavailable(e.to_string())
}
