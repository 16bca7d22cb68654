//! Edge implementation for the fraud-chain graph
//!
//! Edges are directed and confidence weighted. Both endpoints live in the
//! edge's own chain.

use super::property::{PropertyMap, PropertyValue};
use super::types::{now_millis, ChainId, EdgeId, NodeId, RelationshipType};
use serde::{Deserialize, Serialize};

/// Confidence assigned when the caller gives none
pub const DEFAULT_CONFIDENCE: u8 = 100;

/// Highest valid confidence
pub const MAX_CONFIDENCE: u8 = 100;

fn default_confidence() -> u8 {
    DEFAULT_CONFIDENCE
}

/// A directed edge in a fraud chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    /// Owning chain
    pub chain_id: ChainId,

    /// Source node (edge goes FROM this node)
    pub from_node_id: NodeId,

    /// Target node (edge goes TO this node)
    pub to_node_id: NodeId,

    /// Type of relationship (e.g., "leads_to", "similar_pattern")
    pub relationship_type: RelationshipType,

    /// 0-100
    #[serde(default = "default_confidence")]
    pub confidence: u8,

    /// Free-form metadata
    pub metadata: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Edge {
    /// Create a new directed edge with full confidence
    pub fn new(
        id: EdgeId,
        chain_id: ChainId,
        from_node_id: NodeId,
        to_node_id: NodeId,
        relationship_type: impl Into<RelationshipType>,
    ) -> Self {
        Edge {
            id,
            chain_id,
            from_node_id,
            to_node_id,
            relationship_type: relationship_type.into(),
            confidence: DEFAULT_CONFIDENCE,
            metadata: PropertyMap::new(),
            created_at: now_millis(),
        }
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_metadata(mut self, metadata: PropertyMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set a single metadata entry
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Check if this edge connects the two nodes in the given direction
    pub fn connects(&self, from: NodeId, to: NodeId) -> bool {
        self.from_node_id == from && self.to_node_id == to
    }

    /// Check if this is a self-loop
    pub fn is_self_loop(&self) -> bool {
        self.from_node_id == self.to_node_id
    }

    /// Get the other endpoint given one endpoint
    pub fn other_endpoint(&self, node_id: NodeId) -> Option<NodeId> {
        if self.from_node_id == node_id {
            Some(self.to_node_id)
        } else if self.to_node_id == node_id {
            Some(self.from_node_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_creation() {
        let edge = Edge::new(EdgeId::new(1), ChainId::new(1), NodeId::new(1), NodeId::new(2), "leads_to")
            .with_confidence(95);
        assert_eq!(edge.relationship_type.as_str(), "leads_to");
        assert_eq!(edge.confidence, 95);
        assert!(edge.connects(NodeId::new(1), NodeId::new(2)));
        assert!(!edge.connects(NodeId::new(2), NodeId::new(1)));
        assert!(!edge.is_self_loop());
    }

    #[test]
    fn test_other_endpoint() {
        let edge = Edge::new(EdgeId::new(1), ChainId::new(1), NodeId::new(1), NodeId::new(2), "mentions");
        assert_eq!(edge.other_endpoint(NodeId::new(1)), Some(NodeId::new(2)));
        assert_eq!(edge.other_endpoint(NodeId::new(2)), Some(NodeId::new(1)));
        assert_eq!(edge.other_endpoint(NodeId::new(3)), None);
    }

    #[test]
    fn test_confidence_defaults_when_absent() {
        let json = r#"{"id":3,"chainId":1,"fromNodeId":1,"toNodeId":2,
            "relationshipType":"references","metadata":{},"createdAt":0}"#;
        let edge: Edge = serde_json::from_str(json).unwrap();
        assert_eq!(edge.confidence, DEFAULT_CONFIDENCE);
    }
}
