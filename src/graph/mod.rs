//! Literature knowledge graph model
//!
//! Papers and extracted entities (concepts, methods, research areas) joined
//! by typed relationships. The model is read-only from the retrieval core's
//! point of view: nodes, edges and weights are established by graph
//! construction before any query runs.

mod edge;
mod node;
pub mod normalize;
mod path;


pub use edge::{passes_weight, Relationship, RelationshipKind};
pub use node::{GraphNode, NodeId, NodeKind};
pub use path::{Discovery, DiscoveryPath, PathHop};
