//! Fraud-chain graph model
//!
//! This module implements the persisted property graph:
//! - Chains that own typed nodes and confidence-weighted edges
//! - A uniqueness constraint on (node_type, reference_id) across all chains
//! - Unit-of-work change sets validated before they touch the store

pub mod chain;
pub mod changes;
pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use chain::{Chain, ChainUpdate};
pub use changes::{ChangeSet, GraphSnapshot};
pub use edge::{Edge, DEFAULT_CONFIDENCE, MAX_CONFIDENCE};
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{
    node_types, relationships, ChainId, ChainStatus, EdgeId, NodeId, NodeType, Position,
    RelationshipType,
};
