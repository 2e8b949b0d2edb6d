//! Typed relationships between papers and extracted entities

use super::node::NodeId;
use serde::{Deserialize, Serialize};

/// The relationship types the traversal engine understands
///
/// Direct per-paper kinds (`Mentions`, `Uses`, `BelongsTo`) are directed and
/// unweighted; they connect a paper to the entity layer. `AppliedIn` links a
/// method to the research areas it is applied in. The cross-entity and
/// cross-paper kinds (`RelatedTo`, `SharedMethod`) are undirected and carry
/// an integer co-occurrence / shared-method count established at graph
/// construction time. The retrieval core reads weights, never writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Paper → Concept
    Mentions,
    /// Paper → Method
    Uses,
    /// Paper → ResearchArea
    BelongsTo,
    /// Method → ResearchArea
    AppliedIn,
    /// Concept ↔ Concept, weighted by co-occurrence count
    RelatedTo,
    /// Paper ↔ Paper, weighted by shared-method count
    SharedMethod,
}

impl RelationshipKind {
    /// Stable string form used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Mentions => "mentions",
            RelationshipKind::Uses => "uses",
            RelationshipKind::BelongsTo => "belongs_to",
            RelationshipKind::AppliedIn => "applied_in",
            RelationshipKind::RelatedTo => "related_to",
            RelationshipKind::SharedMethod => "shared_method",
        }
    }

    /// Parse the stable string form back into a kind
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mentions" => Some(RelationshipKind::Mentions),
            "uses" => Some(RelationshipKind::Uses),
            "belongs_to" => Some(RelationshipKind::BelongsTo),
            "applied_in" => Some(RelationshipKind::AppliedIn),
            "related_to" => Some(RelationshipKind::RelatedTo),
            "shared_method" => Some(RelationshipKind::SharedMethod),
            _ => None,
        }
    }

    /// Whether the weight carries co-occurrence semantics
    pub fn is_weighted(&self) -> bool {
        matches!(
            self,
            RelationshipKind::RelatedTo | RelationshipKind::SharedMethod
        )
    }

    /// Whether the relationship may be traversed in either direction
    pub fn is_undirected(&self) -> bool {
        matches!(
            self,
            RelationshipKind::RelatedTo | RelationshipKind::SharedMethod
        )
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An edge in the literature graph
///
/// Unweighted kinds store `weight = 1`; weighted kinds store the integer
/// count from graph construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    /// Relationship type
    pub kind: RelationshipKind,
    /// Integer co-occurrence / shared count (1 for unweighted kinds)
    pub weight: u32,
}

impl Relationship {
    /// Create an unweighted relationship (weight fixed at 1)
    pub fn new(source: NodeId, target: NodeId, kind: RelationshipKind) -> Self {
        Self {
            source,
            target,
            kind,
            weight: 1,
        }
    }

    /// Create a weighted relationship
    pub fn weighted(source: NodeId, target: NodeId, kind: RelationshipKind, weight: u32) -> Self {
        Self {
            source,
            target,
            kind,
            weight,
        }
    }
}

/// Minimum-weight filter applied at each traversal hop boundary
///
/// Only weighted kinds are subject to pruning. Unweighted per-paper edges
/// always pass — any minimum of 2 or more would otherwise sever every paper
/// from the entity layer.
pub fn passes_weight(kind: RelationshipKind, weight: u32, min_weight: u32) -> bool {
    !kind.is_weighted() || weight >= min_weight
}
