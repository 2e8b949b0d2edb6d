//! Node representation in the literature knowledge graph

use serde::{Deserialize, Serialize};

/// Unique identifier for a graph node
///
/// Serializes as a plain string. Ids are semantic: `paper:<source-id>` for
/// papers, `concept:<canonical name>` / `method:<canonical name>` /
/// `area:<canonical name>` for extracted entities. Two entity mentions map
/// to the same id iff their canonical names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a NodeId from a string (semantic ID)
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of node in the literature graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An ingested paper; `name` holds the title
    Paper,
    /// An abstract concept mentioned by papers
    Concept,
    /// A technique or algorithm used by papers
    Method,
    /// A field of study papers belong to
    ResearchArea,
}

impl NodeKind {
    /// Stable string form used in ids and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Paper => "paper",
            NodeKind::Concept => "concept",
            NodeKind::Method => "method",
            NodeKind::ResearchArea => "area",
        }
    }

    /// Parse the stable string form back into a kind
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paper" => Some(NodeKind::Paper),
            "concept" => Some(NodeKind::Concept),
            "method" => Some(NodeKind::Method),
            "area" => Some(NodeKind::ResearchArea),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the literature knowledge graph
///
/// Papers carry their title in `name`; entity nodes carry the canonical
/// (lowercase, singular) name established at extraction time. The retrieval
/// core never re-normalizes names — it trusts the canonicalization invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier
    pub id: NodeId,
    /// Node kind
    pub kind: NodeKind,
    /// Title (papers) or canonical name (entities)
    pub name: String,
    /// Optional category tag assigned at extraction time
    pub category: Option<String>,
}

impl GraphNode {
    /// Create a paper node from its source identifier and title
    pub fn paper(source_id: impl AsRef<str>, title: impl Into<String>) -> Self {
        Self {
            id: NodeId::from_string(format!("paper:{}", source_id.as_ref())),
            kind: NodeKind::Paper,
            name: title.into(),
            category: None,
        }
    }

    /// Create an entity node from an already-canonical name
    pub fn entity(kind: NodeKind, canonical_name: impl Into<String>) -> Self {
        let name = canonical_name.into();
        Self {
            id: NodeId::from_string(format!("{}:{}", kind.as_str(), name)),
            kind,
            name,
            category: None,
        }
    }

    /// Attach a category tag
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Whether this node is a paper
    pub fn is_paper(&self) -> bool {
        self.kind == NodeKind::Paper
    }
}
