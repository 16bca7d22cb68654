//! In-memory graph storage implementation
//!
//! Holds every chain, node and edge plus the secondary structures the engine
//! reads from:
//! - outgoing / incoming adjacency per node
//! - node and edge membership per chain
//! - the uniqueness index (node_type, reference_id) -> NodeId
//!
//! Writes arrive as a [`ChangeSet`] and are validated as a whole before any
//! of them is applied, so a rejected change leaves the store untouched.

use super::chain::Chain;
use super::changes::{ChangeSet, GraphSnapshot};
use super::edge::{Edge, MAX_CONFIDENCE};
use super::node::Node;
use super::types::{ChainId, EdgeId, NodeId, NodeType, RelationshipType};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Chain {0} not found")]
    ChainNotFound(ChainId),

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Reference {node_type}/{reference_id} is already held by {existing}")]
    DuplicateReference {
        node_type: NodeType,
        reference_id: String,
        existing: NodeId,
    },

    #[error("Edge {edge} must connect two nodes of {chain}")]
    CrossChainEdge { edge: EdgeId, chain: ChainId },

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Confidence {0} is outside 0-100")]
    InvalidConfidence(u8),

    #[error("Node reference id must not be empty")]
    EmptyReference,

    #[error("Node type must not be empty")]
    EmptyNodeType,

    #[error("Node {0} cannot change its type, reference or chain")]
    ImmutableNodeIdentity(NodeId),

    #[error("Edge {0} cannot change its endpoints or chain")]
    ImmutableEdgeEndpoints(EdgeId),

    #[error("Chain {0} still has nodes")]
    ChainNotEmpty(ChainId),

    #[error("Node {0} still has edges")]
    NodeHasEdges(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory graph storage
#[derive(Debug, Default)]
pub struct GraphStore {
    /// Chains ordered by id
    chains: BTreeMap<ChainId, Chain>,

    /// Node storage
    nodes: HashMap<NodeId, Node>,

    /// Edge storage
    edges: HashMap<EdgeId, Edge>,

    /// Outgoing edges for each node (adjacency list)
    outgoing: HashMap<NodeId, Vec<EdgeId>>,

    /// Incoming edges for each node (adjacency list)
    incoming: HashMap<NodeId, Vec<EdgeId>>,

    /// Nodes of each chain
    chain_nodes: HashMap<ChainId, BTreeSet<NodeId>>,

    /// Edges of each chain
    chain_edges: HashMap<ChainId, BTreeSet<EdgeId>>,

    /// Uniqueness index: (node_type, reference_id) -> node
    reference_index: FxHashMap<(NodeType, String), NodeId>,

    next_chain_id: u64,
    next_node_id: u64,
    next_edge_id: u64,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            next_chain_id: 1,
            next_node_id: 1,
            next_edge_id: 1,
            ..Default::default()
        }
    }

    /// Rebuild a store from a backend snapshot
    ///
    /// The snapshot is validated like any other change, so a corrupted
    /// backend surfaces as an error instead of a broken index.
    pub fn recover(snapshot: GraphSnapshot) -> GraphResult<Self> {
        let mut store = GraphStore::new();
        store.apply(&snapshot.into_change_set())?;
        Ok(store)
    }

    // ---- id allocation ----

    pub fn allocate_chain_id(&mut self) -> ChainId {
        let id = self.next_chain_id;
        self.next_chain_id += 1;
        ChainId::new(id)
    }

    pub fn allocate_node_id(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        NodeId::new(id)
    }

    pub fn allocate_edge_id(&mut self) -> EdgeId {
        let id = self.next_edge_id;
        self.next_edge_id += 1;
        EdgeId::new(id)
    }

    // ---- writes ----

    /// Validate and apply a change set
    pub fn apply(&mut self, changes: &ChangeSet) -> GraphResult<()> {
        self.validate(changes)?;
        self.apply_unchecked(changes);
        Ok(())
    }

    /// Check a change set against the store without modifying it
    ///
    /// Enforces: unique (node_type, reference_id), edge endpoints inside the
    /// edge's chain, confidence in range, fixed node identity, and complete
    /// cascades on removal.
    pub fn validate(&self, changes: &ChangeSet) -> GraphResult<()> {
        let removed_chains: HashSet<ChainId> = changes.removed_chains.iter().map(|c| c.id).collect();
        let removed_nodes: HashSet<NodeId> = changes.removed_nodes.iter().map(|n| n.id).collect();
        let removed_edges: HashSet<EdgeId> = changes.removed_edges.iter().map(|e| e.id).collect();
        let staged_chains: HashSet<ChainId> = changes.chains.iter().map(|c| c.id).collect();
        let staged_nodes: HashMap<NodeId, &Node> = changes.nodes.iter().map(|n| (n.id, n)).collect();

        for chain in &changes.removed_chains {
            if !self.chains.contains_key(&chain.id) {
                return Err(GraphError::ChainNotFound(chain.id));
            }
            if let Some(members) = self.chain_nodes.get(&chain.id) {
                if members.iter().any(|id| !removed_nodes.contains(id)) {
                    return Err(GraphError::ChainNotEmpty(chain.id));
                }
            }
        }
        for node in &changes.removed_nodes {
            if !self.nodes.contains_key(&node.id) {
                return Err(GraphError::NodeNotFound(node.id));
            }
            let attached = self
                .outgoing
                .get(&node.id)
                .into_iter()
                .chain(self.incoming.get(&node.id))
                .flatten();
            for edge_id in attached {
                if !removed_edges.contains(edge_id) {
                    return Err(GraphError::NodeHasEdges(node.id));
                }
            }
        }
        for edge in &changes.removed_edges {
            if !self.edges.contains_key(&edge.id) {
                return Err(GraphError::EdgeNotFound(edge.id));
            }
        }

        let chain_live = |id: ChainId| {
            staged_chains.contains(&id) || (self.chains.contains_key(&id) && !removed_chains.contains(&id))
        };

        let mut staged_keys: HashMap<(NodeType, String), NodeId> = HashMap::new();
        for node in &changes.nodes {
            if node.node_type.as_str().trim().is_empty() {
                return Err(GraphError::EmptyNodeType);
            }
            if node.reference_id.trim().is_empty() {
                return Err(GraphError::EmptyReference);
            }
            if !chain_live(node.chain_id) {
                return Err(GraphError::ChainNotFound(node.chain_id));
            }
            if let Some(existing) = self.nodes.get(&node.id) {
                if !removed_nodes.contains(&node.id)
                    && (existing.node_type != node.node_type
                        || existing.reference_id != node.reference_id
                        || existing.chain_id != node.chain_id)
                {
                    return Err(GraphError::ImmutableNodeIdentity(node.id));
                }
            }

            let key = node.key();
            if let Some(&holder) = self.reference_index.get(&key) {
                if holder != node.id && !removed_nodes.contains(&holder) {
                    return Err(GraphError::DuplicateReference {
                        node_type: key.0,
                        reference_id: key.1,
                        existing: holder,
                    });
                }
            }
            if let Some(holder) = staged_keys.insert(key.clone(), node.id) {
                if holder != node.id {
                    return Err(GraphError::DuplicateReference {
                        node_type: key.0,
                        reference_id: key.1,
                        existing: holder,
                    });
                }
            }
        }

        let node_chain = |id: NodeId| -> Option<ChainId> {
            match staged_nodes.get(&id) {
                Some(node) => Some(node.chain_id),
                None if removed_nodes.contains(&id) => None,
                None => self.nodes.get(&id).map(|n| n.chain_id),
            }
        };

        for edge in &changes.edges {
            if edge.confidence > MAX_CONFIDENCE {
                return Err(GraphError::InvalidConfidence(edge.confidence));
            }
            if !chain_live(edge.chain_id) {
                return Err(GraphError::ChainNotFound(edge.chain_id));
            }
            let from_chain = node_chain(edge.from_node_id)
                .ok_or(GraphError::InvalidEdgeSource(edge.from_node_id))?;
            let to_chain = node_chain(edge.to_node_id)
                .ok_or(GraphError::InvalidEdgeTarget(edge.to_node_id))?;
            if from_chain != edge.chain_id || to_chain != edge.chain_id {
                return Err(GraphError::CrossChainEdge {
                    edge: edge.id,
                    chain: edge.chain_id,
                });
            }
            if let Some(existing) = self.edges.get(&edge.id) {
                if !removed_edges.contains(&edge.id)
                    && (existing.from_node_id != edge.from_node_id
                        || existing.to_node_id != edge.to_node_id
                        || existing.chain_id != edge.chain_id)
                {
                    return Err(GraphError::ImmutableEdgeEndpoints(edge.id));
                }
            }
        }

        Ok(())
    }

    /// Apply a change set that already passed [`GraphStore::validate`]
    pub fn apply_unchecked(&mut self, changes: &ChangeSet) {
        for edge in &changes.removed_edges {
            self.unlink_edge(edge.id);
        }
        for node in &changes.removed_nodes {
            self.unlink_node(node.id);
        }
        for chain in &changes.removed_chains {
            self.chains.remove(&chain.id);
            self.chain_nodes.remove(&chain.id);
            self.chain_edges.remove(&chain.id);
        }

        for chain in &changes.chains {
            self.next_chain_id = self.next_chain_id.max(chain.id.as_u64() + 1);
            self.chain_nodes.entry(chain.id).or_default();
            self.chain_edges.entry(chain.id).or_default();
            self.chains.insert(chain.id, chain.clone());
        }

        for node in &changes.nodes {
            self.next_node_id = self.next_node_id.max(node.id.as_u64() + 1);
            if let Some(old) = self.nodes.get(&node.id) {
                let old_key = old.key();
                let old_chain = old.chain_id;
                self.reference_index.remove(&old_key);
                if let Some(members) = self.chain_nodes.get_mut(&old_chain) {
                    members.remove(&node.id);
                }
            }
            self.reference_index.insert(node.key(), node.id);
            self.chain_nodes.entry(node.chain_id).or_default().insert(node.id);
            self.nodes.insert(node.id, node.clone());
        }

        for edge in &changes.edges {
            self.next_edge_id = self.next_edge_id.max(edge.id.as_u64() + 1);
            if self.edges.contains_key(&edge.id) {
                self.unlink_edge(edge.id);
            }
            self.outgoing.entry(edge.from_node_id).or_default().push(edge.id);
            self.incoming.entry(edge.to_node_id).or_default().push(edge.id);
            self.chain_edges.entry(edge.chain_id).or_default().insert(edge.id);
            self.edges.insert(edge.id, edge.clone());
        }
    }

    fn unlink_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.remove(&id) else {
            return;
        };
        if let Some(out) = self.outgoing.get_mut(&edge.from_node_id) {
            out.retain(|e| *e != id);
        }
        if let Some(inc) = self.incoming.get_mut(&edge.to_node_id) {
            inc.retain(|e| *e != id);
        }
        if let Some(members) = self.chain_edges.get_mut(&edge.chain_id) {
            members.remove(&id);
        }
    }

    fn unlink_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        let key = node.key();
        if self.reference_index.get(&key) == Some(&id) {
            self.reference_index.remove(&key);
        }
        if let Some(members) = self.chain_nodes.get_mut(&node.chain_id) {
            members.remove(&id);
        }
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
    }

    /// Removal of a chain together with all of its nodes and edges
    pub fn cascade_removal(&self, chain_id: ChainId) -> GraphResult<ChangeSet> {
        let chain = self
            .chains
            .get(&chain_id)
            .ok_or(GraphError::ChainNotFound(chain_id))?;
        Ok(ChangeSet {
            removed_chains: vec![chain.clone()],
            removed_nodes: self.chain_nodes(chain_id).into_iter().cloned().collect(),
            removed_edges: self.chain_edges(chain_id).into_iter().cloned().collect(),
            ..ChangeSet::default()
        })
    }

    /// Removal of every record in the store
    pub fn full_removal(&self) -> ChangeSet {
        let mut edges: Vec<Edge> = self.edges.values().cloned().collect();
        edges.sort_by_key(|e| e.id);
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        ChangeSet {
            removed_chains: self.chains.values().cloned().collect(),
            removed_nodes: nodes,
            removed_edges: edges,
            ..ChangeSet::default()
        }
    }

    /// Drop everything, including id counters
    pub fn clear(&mut self) {
        *self = GraphStore::new();
    }

    // ---- reads ----

    pub fn get_chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(&id)
    }

    pub fn has_chain(&self, id: ChainId) -> bool {
        self.chains.contains_key(&id)
    }

    /// All chains, ordered by id
    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.values()
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Node holding the given identity, if any
    pub fn find_node(&self, node_type: &str, reference_id: &str) -> Option<&Node> {
        let key = (NodeType::new(node_type), reference_id.to_string());
        self.reference_index.get(&key).and_then(|id| self.nodes.get(id))
    }

    /// Nodes of a chain, ordered by id
    pub fn chain_nodes(&self, chain_id: ChainId) -> Vec<&Node> {
        self.chain_nodes
            .get(&chain_id)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Edges of a chain, ordered by id
    pub fn chain_edges(&self, chain_id: ChainId) -> Vec<&Edge> {
        self.chain_edges
            .get(&chain_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn chain_node_count(&self, chain_id: ChainId) -> usize {
        self.chain_nodes.get(&chain_id).map_or(0, BTreeSet::len)
    }

    pub fn chain_edge_count(&self, chain_id: ChainId) -> usize {
        self.chain_edges.get(&chain_id).map_or(0, BTreeSet::len)
    }

    /// Get outgoing edges from a node
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get incoming edges to a node
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// Edge from `from` to `to` with the given relationship, if one exists
    pub fn find_edge(&self, from: NodeId, to: NodeId, relationship: &RelationshipType) -> Option<&Edge> {
        self.get_outgoing_edges(from)
            .into_iter()
            .find(|e| e.to_node_id == to && &e.relationship_type == relationship)
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty() && self.nodes.is_empty()
    }

    /// Node counts per node type
    pub fn node_type_counts(&self) -> BTreeMap<NodeType, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.node_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (GraphStore, ChainId, NodeId, NodeId) {
        let mut store = GraphStore::new();
        let chain_id = store.allocate_chain_id();
        let tip = store.allocate_node_id();
        let assessment = store.allocate_node_id();
        let edge_id = store.allocate_edge_id();

        let mut cs = ChangeSet::new();
        cs.put_chain(Chain::new(chain_id, Some("c".to_string())));
        cs.put_node(Node::new(tip, chain_id, "tip", "t-1"));
        cs.put_node(Node::new(assessment, chain_id, "assessment", "a-1"));
        cs.put_edge(Edge::new(edge_id, chain_id, tip, assessment, "leads_to").with_confidence(95));
        store.apply(&cs).unwrap();
        (store, chain_id, tip, assessment)
    }

    #[test]
    fn test_apply_and_lookup() {
        let (store, chain_id, tip, assessment) = seeded();

        assert_eq!(store.chain_count(), 1);
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
        assert_eq!(store.find_node("tip", "t-1").map(|n| n.id), Some(tip));
        assert!(store.find_node("tip", "a-1").is_none());
        assert_eq!(store.chain_nodes(chain_id).len(), 2);
        assert_eq!(store.get_outgoing_edges(tip).len(), 1);
        assert_eq!(store.get_incoming_edges(assessment).len(), 1);
        assert!(store
            .find_edge(tip, assessment, &RelationshipType::new("leads_to"))
            .is_some());
    }

    #[test]
    fn test_duplicate_reference_rejected() {
        let (mut store, chain_id, tip, _) = seeded();
        let mut cs = ChangeSet::new();
        let id = store.allocate_node_id();
        cs.put_node(Node::new(id, chain_id, "tip", "t-1"));

        let err = store.apply(&cs).unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateReference {
                node_type: NodeType::new("tip"),
                reference_id: "t-1".to_string(),
                existing: tip,
            }
        );
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn test_duplicate_within_one_change_set() {
        let (mut store, chain_id, _, _) = seeded();
        let mut cs = ChangeSet::new();
        let a = store.allocate_node_id();
        let b = store.allocate_node_id();
        cs.put_node(Node::new(a, chain_id, "document", "d-1"));
        cs.put_node(Node::new(b, chain_id, "document", "d-1"));
        assert!(matches!(store.apply(&cs), Err(GraphError::DuplicateReference { .. })));
        assert!(store.find_node("document", "d-1").is_none());
    }

    #[test]
    fn test_cross_chain_edge_rejected() {
        let (mut store, chain_id, tip, _) = seeded();
        let other_chain = store.allocate_chain_id();
        let other_node = store.allocate_node_id();
        let edge_id = store.allocate_edge_id();

        let mut cs = ChangeSet::new();
        cs.put_chain(Chain::new(other_chain, None));
        cs.put_node(Node::new(other_node, other_chain, "tip", "t-2"));
        cs.put_edge(Edge::new(edge_id, chain_id, tip, other_node, "similar_pattern"));

        assert_eq!(
            store.apply(&cs),
            Err(GraphError::CrossChainEdge {
                edge: edge_id,
                chain: chain_id
            })
        );
        // Nothing from the rejected change landed
        assert!(!store.has_chain(other_chain));
        assert!(store.find_node("tip", "t-2").is_none());
    }

    #[test]
    fn test_invalid_edges() {
        let (mut store, chain_id, tip, _) = seeded();
        let edge_id = store.allocate_edge_id();

        let mut cs = ChangeSet::new();
        cs.put_edge(Edge::new(edge_id, chain_id, tip, NodeId::new(99), "mentions"));
        assert_eq!(store.apply(&cs), Err(GraphError::InvalidEdgeTarget(NodeId::new(99))));

        let mut cs = ChangeSet::new();
        cs.put_edge(Edge::new(edge_id, chain_id, tip, tip, "mentions").with_confidence(101));
        assert_eq!(store.apply(&cs), Err(GraphError::InvalidConfidence(101)));
    }

    #[test]
    fn test_node_identity_is_fixed() {
        let (mut store, chain_id, tip, _) = seeded();
        let mut cs = ChangeSet::new();
        cs.put_node(Node::new(tip, chain_id, "tip", "t-renamed"));
        assert_eq!(store.apply(&cs), Err(GraphError::ImmutableNodeIdentity(tip)));

        // Metadata replacement keeps identity and is accepted
        let mut node = store.get_node(tip).unwrap().clone();
        node.label = Some("relabelled".to_string());
        let mut cs = ChangeSet::new();
        cs.put_node(node);
        store.apply(&cs).unwrap();
        assert_eq!(store.get_node(tip).unwrap().label.as_deref(), Some("relabelled"));
        assert_eq!(store.find_node("tip", "t-1").map(|n| n.id), Some(tip));
    }

    #[test]
    fn test_cascade_removal() {
        let (mut store, chain_id, tip, _) = seeded();

        let partial = ChangeSet {
            removed_chains: vec![store.get_chain(chain_id).unwrap().clone()],
            ..ChangeSet::default()
        };
        assert_eq!(store.apply(&partial), Err(GraphError::ChainNotEmpty(chain_id)));

        let cs = store.cascade_removal(chain_id).unwrap();
        assert_eq!(cs.removed_nodes.len(), 2);
        assert_eq!(cs.removed_edges.len(), 1);
        store.apply(&cs).unwrap();

        assert!(store.is_empty());
        assert_eq!(store.edge_count(), 0);
        assert!(store.find_node("tip", "t-1").is_none());
        assert!(store.get_outgoing_edges(tip).is_empty());
        assert_eq!(store.cascade_removal(chain_id).unwrap_err(), GraphError::ChainNotFound(chain_id));
    }

    #[test]
    fn test_node_with_edges_cannot_be_removed_alone() {
        let (mut store, _, tip, _) = seeded();
        let cs = ChangeSet {
            removed_nodes: vec![store.get_node(tip).unwrap().clone()],
            ..ChangeSet::default()
        };
        assert_eq!(store.apply(&cs), Err(GraphError::NodeHasEdges(tip)));
    }

    #[test]
    fn test_recover_bumps_counters() {
        let (store, chain_id, _, _) = seeded();
        let snapshot = GraphSnapshot {
            chains: store.chains().cloned().collect(),
            nodes: store.chain_nodes(chain_id).into_iter().cloned().collect(),
            edges: store.chain_edges(chain_id).into_iter().cloned().collect(),
        };

        let mut recovered = GraphStore::recover(snapshot).unwrap();
        assert_eq!(recovered.node_count(), 2);
        assert_eq!(recovered.allocate_node_id(), NodeId::new(3));
        assert_eq!(recovered.allocate_chain_id(), ChainId::new(2));
        assert_eq!(recovered.allocate_edge_id(), EdgeId::new(2));
    }

    #[test]
    fn test_full_removal_and_clear() {
        let (mut store, _, _, _) = seeded();
        let cs = store.full_removal();
        store.apply(&cs).unwrap();
        assert!(store.is_empty());

        store.clear();
        assert_eq!(store.allocate_chain_id(), ChainId::new(1));
    }

    #[test]
    fn test_node_type_counts() {
        let (store, _, _, _) = seeded();
        let counts = store.node_type_counts();
        assert_eq!(counts.get(&NodeType::new("tip")), Some(&1));
        assert_eq!(counts.get(&NodeType::new("assessment")), Some(&1));
    }
}
