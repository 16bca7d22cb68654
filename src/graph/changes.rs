//! Unit of work over the graph
//!
//! A `ChangeSet` collects every record a single operation writes or deletes.
//! The in-memory store validates it, the backend persists it atomically, and
//! only then is it applied in memory.

use super::chain::Chain;
use super::edge::Edge;
use super::node::Node;
use super::types::{ChainId, EdgeId, NodeId, NodeType};

/// Pending writes of one logical transaction
///
/// `chains`, `nodes` and `edges` are puts (insert or replace). Removals carry
/// the full record so backends can drop secondary keys without a read.
/// Removals are applied before puts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub chains: Vec<Chain>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub removed_chains: Vec<Chain>,
    pub removed_nodes: Vec<Node>,
    pub removed_edges: Vec<Edge>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
            && self.nodes.is_empty()
            && self.edges.is_empty()
            && self.removed_chains.is_empty()
            && self.removed_nodes.is_empty()
            && self.removed_edges.is_empty()
    }

    /// Number of records touched
    pub fn len(&self) -> usize {
        self.chains.len()
            + self.nodes.len()
            + self.edges.len()
            + self.removed_chains.len()
            + self.removed_nodes.len()
            + self.removed_edges.len()
    }

    /// Stage a chain, replacing an earlier staged copy
    pub fn put_chain(&mut self, chain: Chain) {
        match self.chains.iter_mut().find(|c| c.id == chain.id) {
            Some(slot) => *slot = chain,
            None => self.chains.push(chain),
        }
    }

    /// Stage a node, replacing an earlier staged copy
    pub fn put_node(&mut self, node: Node) {
        match self.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(slot) => *slot = node,
            None => self.nodes.push(node),
        }
    }

    /// Stage an edge, replacing an earlier staged copy
    pub fn put_edge(&mut self, edge: Edge) {
        match self.edges.iter_mut().find(|e| e.id == edge.id) {
            Some(slot) => *slot = edge,
            None => self.edges.push(edge),
        }
    }

    pub fn staged_chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn staged_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn staged_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Staged node with the given identity
    pub fn staged_reference(&self, node_type: &NodeType, reference_id: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| &n.node_type == node_type && n.reference_id == reference_id)
    }

    /// Number of staged puts that create a record absent from `existing`
    pub fn count_new_nodes(&self, existing: impl Fn(NodeId) -> bool) -> usize {
        self.nodes.iter().filter(|n| !existing(n.id)).count()
    }

    pub fn count_new_edges(&self, existing: impl Fn(EdgeId) -> bool) -> usize {
        self.edges.iter().filter(|e| !existing(e.id)).count()
    }
}

/// Every record of a graph, as loaded from a backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub chains: Vec<Chain>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty() && self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Replay the snapshot as puts
    pub fn into_change_set(self) -> ChangeSet {
        ChangeSet {
            chains: self.chains,
            nodes: self.nodes,
            edges: self.edges,
            ..ChangeSet::default()
        }
    }
}
