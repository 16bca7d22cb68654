//! Node implementation for the fraud-chain graph
//!
//! A node stands for one piece of evidence. Its identity is the pair
//! (node_type, reference_id), unique across every chain.

use super::property::{PropertyMap, PropertyValue};
use super::types::{now_millis, ChainId, NodeId, NodeType, Position};
use serde::{Deserialize, Serialize};

/// A node in a fraud chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Owning chain
    pub chain_id: ChainId,

    /// Evidence kind (e.g. "tip", "assessment")
    pub node_type: NodeType,

    /// Opaque handle into the evidence store
    pub reference_id: String,

    /// Display label
    pub label: Option<String>,

    /// Free-form metadata
    pub metadata: PropertyMap,

    /// Layout hint for visualization
    pub position: Option<Position>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Node {
    /// Create a new node
    pub fn new(
        id: NodeId,
        chain_id: ChainId,
        node_type: impl Into<NodeType>,
        reference_id: impl Into<String>,
    ) -> Self {
        Node {
            id,
            chain_id,
            node_type: node_type.into(),
            reference_id: reference_id.into(),
            label: None,
            metadata: PropertyMap::new(),
            position: None,
            created_at: now_millis(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, metadata: PropertyMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Identity key used by the uniqueness index
    pub fn key(&self) -> (NodeType, String) {
        (self.node_type.clone(), self.reference_id.clone())
    }

    /// Get a metadata value
    pub fn get_metadata(&self, key: &str) -> Option<&PropertyValue> {
        self.metadata.get(key)
    }

    /// Merge metadata entries, overwriting existing keys
    pub fn merge_metadata(&mut self, entries: PropertyMap) {
        for (key, value) in entries {
            self.metadata.insert(key, value);
        }
    }

    /// Case-insensitive substring test over label, type, reference id and
    /// serialized metadata. `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        if let Some(label) = &self.label {
            if label.to_lowercase().contains(needle) {
                return true;
            }
        }
        if self.node_type.as_str().to_lowercase().contains(needle)
            || self.reference_id.to_lowercase().contains(needle)
        {
            return true;
        }
        if self.metadata.is_empty() {
            return false;
        }
        match serde_json::to_string(&self.metadata) {
            Ok(text) => text.to_lowercase().contains(needle),
            Err(_) => false,
        }
    }
}

impl PartialEq<NodeId> for Node {
    fn eq(&self, other: &NodeId) -> bool {
        self.id == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut metadata = PropertyMap::new();
        metadata.insert("message".to_string(), "Buy ACME before Friday".into());
        Node::new(NodeId::new(1), ChainId::new(1), "tip", "t-1")
            .with_label("Hot tip")
            .with_metadata(metadata)
    }

    #[test]
    fn test_node_creation() {
        let node = sample();
        assert_eq!(node.id, NodeId::new(1));
        assert!(node.node_type.is_tip());
        assert_eq!(node.key(), (NodeType::new("tip"), "t-1".to_string()));
        assert!(node.position.is_none());
    }

    #[test]
    fn test_matches_text() {
        let node = sample();
        assert!(node.matches_text("hot"));
        assert!(node.matches_text("tip"));
        assert!(node.matches_text("t-1"));
        assert!(node.matches_text("acme"));
        assert!(!node.matches_text("globex"));
    }

    #[test]
    fn test_merge_metadata() {
        let mut node = sample();
        let mut extra = PropertyMap::new();
        extra.insert("message".to_string(), "edited".into());
        extra.insert("reviewed".to_string(), PropertyValue::Boolean(true));
        node.merge_metadata(extra);
        assert_eq!(node.get_metadata("message").and_then(|v| v.as_string()), Some("edited"));
        assert_eq!(node.get_metadata("reviewed"), Some(&PropertyValue::Boolean(true)));
        assert_eq!(node.metadata.len(), 2);
    }

    #[test]
    fn test_wire_form() {
        let node = sample().with_position(Position::new(100.0, 200.0));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["nodeType"], "tip");
        assert_eq!(json["referenceId"], "t-1");
        assert_eq!(json["chainId"], 1);
        assert_eq!(json["position"]["x"], 100.0);
        assert_eq!(json["metadata"]["message"], "Buy ACME before Friday");
    }
}
