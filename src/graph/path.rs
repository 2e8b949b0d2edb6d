//! Discovery paths: why a paper was surfaced by graph traversal

use super::edge::RelationshipKind;
use super::node::NodeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single hop in a discovery path
///
/// Records the node the hop left from and the relationship it followed; the
/// destination is the next hop's `from` node, or the discovered paper for
/// the final hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHop {
    /// Node the hop departed from
    pub from: NodeId,
    /// Relationship type followed
    pub kind: RelationshipKind,
}

impl PathHop {
    pub fn new(from: NodeId, kind: RelationshipKind) -> Self {
        Self { from, kind }
    }
}

/// The edge sequence that led from a seed paper to a discovered paper
///
/// Shortest path per discovered paper; on equal length the higher cumulative
/// edge weight wins. Never empty, and never longer than the configured hop
/// bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryPath {
    /// Ordered hops from seed to discovery
    pub hops: Vec<PathHop>,
    /// Sum of edge weights along the path (unweighted hops count 1)
    pub cumulative_weight: u32,
}

impl DiscoveryPath {
    pub fn new(hops: Vec<PathHop>, cumulative_weight: u32) -> Self {
        Self {
            hops,
            cumulative_weight,
        }
    }

    /// Number of hops (edges) in the path
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Seed paper the path started from
    pub fn seed(&self) -> Option<&NodeId> {
        self.hops.first().map(|h| &h.from)
    }

    /// Relationship that completed the discovery (the final hop)
    pub fn final_relationship(&self) -> Option<RelationshipKind> {
        self.hops.last().map(|h| h.kind)
    }

    /// Preference order between two paths to the same paper: shorter wins,
    /// then higher cumulative weight, then lexicographic hops for a stable
    /// outcome when both tie.
    pub fn preference(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then(other.cumulative_weight.cmp(&self.cumulative_weight))
            .then_with(|| self.hops.iter().map(|h| &h.from).cmp(other.hops.iter().map(|h| &h.from)))
    }
}

/// A paper surfaced by traversal rather than direct retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    /// The discovered paper's node id
    pub paper_id: NodeId,
    /// Paper title, when the store had it
    pub title: String,
    /// How the traversal reached it
    pub path: DiscoveryPath,
}
