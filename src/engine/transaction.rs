//! One logical unit of work against the graph
//!
//! Holds the store's write lock for its whole life. Writes are staged in a
//! [`ChangeSet`]; lookups see staged records before stored ones. Dropping a
//! transaction without [`GraphTransaction::commit`] discards its writes.

use super::FraudGraph;
use crate::error::{FraudGraphError, FraudGraphResult, StoreFailure};
use crate::graph::{
    Chain, ChainId, ChangeSet, Edge, EdgeId, GraphStore, Node, NodeId, NodeType, Position,
    PropertyMap, RelationshipType,
};
use crate::persistence::GraphBackend;
use std::sync::RwLockWriteGuard;
use tracing::{debug, warn};

pub(crate) struct GraphTransaction<'a> {
    store: RwLockWriteGuard<'a, GraphStore>,
    backend: &'a dyn GraphBackend,
    changes: ChangeSet,
}

impl<'a> GraphTransaction<'a> {
    pub fn begin(engine: &'a FraudGraph) -> FraudGraphResult<Self> {
        let store = engine
            .store
            .write()
            .map_err(|_| FraudGraphError::from(StoreFailure::Poisoned))?;
        Ok(GraphTransaction {
            store,
            backend: engine.backend.as_ref(),
            changes: ChangeSet::new(),
        })
    }

    /// Committed state, without staged writes
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn chain_exists(&self, id: ChainId) -> bool {
        self.changes.staged_chain(id).is_some() || self.store.has_chain(id)
    }

    pub fn chain(&self, id: ChainId) -> Option<Chain> {
        self.changes
            .staged_chain(id)
            .or_else(|| self.store.get_chain(id))
            .cloned()
    }

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.changes
            .staged_node(id)
            .or_else(|| self.store.get_node(id))
            .cloned()
    }

    pub fn edge(&self, id: EdgeId) -> Option<Edge> {
        self.changes
            .staged_edge(id)
            .or_else(|| self.store.get_edge(id))
            .cloned()
    }

    /// Node holding an identity, staged or stored
    pub fn find_node(&self, node_type: &NodeType, reference_id: &str) -> Option<Node> {
        self.changes
            .staged_reference(node_type, reference_id)
            .or_else(|| self.store.find_node(node_type.as_str(), reference_id))
            .cloned()
    }

    /// Stage a new chain
    pub fn create_chain(&mut self, name: Option<String>, description: Option<String>) -> ChainId {
        let id = self.store.allocate_chain_id();
        let mut chain = Chain::new(id, name);
        chain.description = description;
        self.changes.put_chain(chain);
        id
    }

    pub fn put_chain(&mut self, chain: Chain) {
        self.changes.put_chain(chain);
    }

    /// Stage a new node
    pub fn create_node(
        &mut self,
        chain_id: ChainId,
        node_type: NodeType,
        reference_id: &str,
        label: Option<String>,
        metadata: PropertyMap,
        position: Option<Position>,
    ) -> NodeId {
        let id = self.store.allocate_node_id();
        let mut node = Node::new(id, chain_id, node_type, reference_id).with_metadata(metadata);
        node.label = label;
        node.position = position;
        self.changes.put_node(node);
        id
    }

    pub fn put_node(&mut self, node: Node) {
        self.changes.put_node(node);
    }

    pub fn put_edge(&mut self, edge: Edge) {
        self.changes.put_edge(edge);
    }

    /// Existing edge `from -> to` with this relationship, staged or stored
    pub fn find_edge(&self, from: NodeId, to: NodeId, relationship: &RelationshipType) -> Option<Edge> {
        self.changes
            .edges
            .iter()
            .find(|e| e.connects(from, to) && &e.relationship_type == relationship)
            .or_else(|| self.store.find_edge(from, to, relationship))
            .cloned()
    }

    /// Stage an edge unless the same relationship already links the pair
    pub fn link(
        &mut self,
        chain_id: ChainId,
        from: NodeId,
        to: NodeId,
        relationship: &str,
        confidence: u8,
        metadata: PropertyMap,
    ) -> Option<EdgeId> {
        let relationship = RelationshipType::new(relationship);
        if self.find_edge(from, to, &relationship).is_some() {
            return None;
        }
        let id = self.store.allocate_edge_id();
        let edge = Edge::new(id, chain_id, from, to, relationship)
            .with_confidence(confidence)
            .with_metadata(metadata);
        self.changes.put_edge(edge);
        Some(id)
    }

    /// Stage removals
    pub fn remove(&mut self, removal: ChangeSet) {
        self.changes.removed_chains.extend(removal.removed_chains);
        self.changes.removed_nodes.extend(removal.removed_nodes);
        self.changes.removed_edges.extend(removal.removed_edges);
    }

    /// Validate, persist, then apply in memory
    ///
    /// Returns the committed change set. On error nothing is applied.
    pub fn commit(mut self) -> FraudGraphResult<ChangeSet> {
        let changes = std::mem::take(&mut self.changes);
        if changes.is_empty() {
            return Ok(changes);
        }

        if let Err(err) = self.store.validate(&changes) {
            warn!(error = %err, records = changes.len(), "Rejected change set");
            return Err(err.into());
        }
        if let Err(err) = self.backend.commit(&changes) {
            warn!(
                backend = self.backend.name(),
                error = %err,
                records = changes.len(),
                "Backend commit failed, discarding pending writes"
            );
            return Err(err.into());
        }
        self.store.apply_unchecked(&changes);

        debug!(records = changes.len(), "Committed transaction");
        Ok(changes)
    }
}
