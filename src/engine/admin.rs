//! Administrative operations: chain lifecycle, metadata updates, reports

use super::transaction::GraphTransaction;
use super::FraudGraph;
use crate::error::{FraudGraphError, FraudGraphResult};
use crate::graph::{Chain, ChainId, ChainUpdate, Edge, EdgeId, Node, NodeId, PropertyMap};
use fraudgraph_algorithms::{weakly_connected_components, GraphView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// A chain with all of its records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDetail {
    pub chain: Chain,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// A chain with record counts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSummary {
    #[serde(flatten)]
    pub chain: Chain,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Records removed by a delete or reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub chains_removed: usize,
    pub nodes_removed: usize,
    pub edges_removed: usize,
}

/// Weakly connected components of a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainComponents {
    pub chain_id: ChainId,
    /// Largest first
    pub components: Vec<Vec<NodeId>>,
    /// Nodes without any edge
    pub isolated: Vec<NodeId>,
}

impl ChainComponents {
    pub fn is_connected(&self) -> bool {
        self.components.len() <= 1
    }
}

/// Whole-graph counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub backend: String,
    pub chains: usize,
    pub nodes: usize,
    pub edges: usize,
    pub node_types: BTreeMap<String, usize>,
}

impl FraudGraph {
    /// A chain with its nodes and edges, in id order
    pub fn get_chain(&self, chain_id: ChainId) -> FraudGraphResult<ChainDetail> {
        let store = self.read()?;
        let chain = store
            .get_chain(chain_id)
            .ok_or_else(|| FraudGraphError::not_found(format!("chain {}", chain_id.as_u64())))?;
        Ok(ChainDetail {
            chain: chain.clone(),
            nodes: store.chain_nodes(chain_id).into_iter().cloned().collect(),
            edges: store.chain_edges(chain_id).into_iter().cloned().collect(),
        })
    }

    /// Every chain with its counts, in id order
    pub fn list_chains(&self) -> FraudGraphResult<Vec<ChainSummary>> {
        let store = self.read()?;
        Ok(store
            .chains()
            .map(|chain| ChainSummary {
                chain: chain.clone(),
                node_count: store.chain_node_count(chain.id),
                edge_count: store.chain_edge_count(chain.id),
            })
            .collect())
    }

    /// Change name, description or status of a chain
    pub fn update_chain(&self, chain_id: ChainId, update: ChainUpdate) -> FraudGraphResult<Chain> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(FraudGraphError::invalid("chain name must not be empty"));
        }
        let mut tx = GraphTransaction::begin(self)?;
        let mut chain = tx
            .chain(chain_id)
            .ok_or_else(|| FraudGraphError::not_found(format!("chain {}", chain_id.as_u64())))?;
        if !chain.apply_update(&update) {
            return Ok(chain);
        }
        tx.put_chain(chain.clone());
        tx.commit()?;
        info!(chain = %chain_id, status = %chain.status, "Updated chain");
        Ok(chain)
    }

    /// Delete a chain together with its nodes and edges
    pub fn delete_chain(&self, chain_id: ChainId) -> FraudGraphResult<RemovalReport> {
        let mut tx = GraphTransaction::begin(self)?;
        if !tx.chain_exists(chain_id) {
            return Err(FraudGraphError::not_found(format!("chain {}", chain_id.as_u64())));
        }
        let removal = tx.store().cascade_removal(chain_id)?;
        let report = RemovalReport {
            chains_removed: removal.removed_chains.len(),
            nodes_removed: removal.removed_nodes.len(),
            edges_removed: removal.removed_edges.len(),
        };
        tx.remove(removal);
        tx.commit()?;
        info!(
            chain = %chain_id,
            nodes = report.nodes_removed,
            edges = report.edges_removed,
            "Deleted chain"
        );
        Ok(report)
    }

    /// Delete every chain, node and edge
    pub fn reset(&self) -> FraudGraphResult<RemovalReport> {
        let mut tx = GraphTransaction::begin(self)?;
        let removal = tx.store().full_removal();
        let report = RemovalReport {
            chains_removed: removal.removed_chains.len(),
            nodes_removed: removal.removed_nodes.len(),
            edges_removed: removal.removed_edges.len(),
        };
        tx.remove(removal);
        tx.commit()?;
        info!(
            chains = report.chains_removed,
            nodes = report.nodes_removed,
            edges = report.edges_removed,
            "Graph reset"
        );
        Ok(report)
    }

    /// Merge entries into a node's metadata
    pub fn update_node_metadata(&self, node_id: NodeId, entries: PropertyMap) -> FraudGraphResult<Node> {
        let mut tx = GraphTransaction::begin(self)?;
        let mut node = tx
            .node(node_id)
            .ok_or_else(|| FraudGraphError::not_found(format!("node {}", node_id.as_u64())))?;
        if entries.is_empty() {
            return Ok(node);
        }
        node.merge_metadata(entries);
        tx.put_node(node.clone());
        tx.commit()?;
        Ok(node)
    }

    /// Merge entries into an edge's metadata; nothing else about an edge changes
    pub fn enrich_edge_metadata(&self, edge_id: EdgeId, entries: PropertyMap) -> FraudGraphResult<Edge> {
        let mut tx = GraphTransaction::begin(self)?;
        let mut edge = tx
            .edge(edge_id)
            .ok_or_else(|| FraudGraphError::not_found(format!("edge {}", edge_id.as_u64())))?;
        if entries.is_empty() {
            return Ok(edge);
        }
        for (key, value) in entries {
            edge.set_metadata(key, value);
        }
        tx.put_edge(edge.clone());
        tx.commit()?;
        Ok(edge)
    }

    /// Connectivity report of a chain
    pub fn chain_components(&self, chain_id: ChainId) -> FraudGraphResult<ChainComponents> {
        let store = self.read()?;
        if !store.has_chain(chain_id) {
            return Err(FraudGraphError::not_found(format!("chain {}", chain_id.as_u64())));
        }
        let view = GraphView::from_edges(
            store.chain_nodes(chain_id).into_iter().map(|n| n.id.as_u64()),
            store
                .chain_edges(chain_id)
                .into_iter()
                .map(|e| (e.id.as_u64(), e.from_node_id.as_u64(), e.to_node_id.as_u64())),
        );
        let wcc = weakly_connected_components(&view);
        Ok(ChainComponents {
            chain_id,
            isolated: wcc.isolated().into_iter().map(NodeId::new).collect(),
            components: wcc
                .components
                .into_iter()
                .map(|c| c.into_iter().map(NodeId::new).collect())
                .collect(),
        })
    }

    /// Whole-graph counters
    pub fn stats(&self) -> FraudGraphResult<GraphStats> {
        let store = self.read()?;
        Ok(GraphStats {
            backend: self.backend.name().to_string(),
            chains: store.chain_count(),
            nodes: store.node_count(),
            edges: store.edge_count(),
            node_types: store
                .node_type_counts()
                .into_iter()
                .map(|(t, n)| (t.as_str().to_string(), n))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::evidence::InMemoryEvidenceStore;
    use crate::graph::ChainStatus;
    use std::sync::Arc;

    fn engine() -> FraudGraph {
        FraudGraph::in_memory(Arc::new(InMemoryEvidenceStore::new()))
    }

    #[test]
    fn test_update_chain() {
        let graph = engine();
        let outcome = graph.upsert_entity("advisor", "adv-1", None, None, true).unwrap();

        let chain = graph
            .update_chain(
                outcome.chain_id,
                ChainUpdate {
                    name: Some("Boiler room".to_string()),
                    status: Some(ChainStatus::Investigating),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(chain.name.as_deref(), Some("Boiler room"));
        assert_eq!(graph.get_chain(outcome.chain_id).unwrap().chain.status, ChainStatus::Investigating);

        let err = graph
            .update_chain(ChainId::new(99), ChainUpdate::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = graph
            .update_chain(
                outcome.chain_id,
                ChainUpdate {
                    name: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_metadata_updates() {
        let graph = engine();
        let a = graph.upsert_entity("advisor", "adv-1", None, None, true).unwrap();
        let b = graph
            .upsert_entity("document", "d-1", None, Some(a.chain_id), false)
            .unwrap();
        let edge = graph
            .link_nodes(a.node_id, b.node_id, "references", Some(70), PropertyMap::new())
            .unwrap();

        let mut entries = PropertyMap::new();
        entries.insert("license".to_string(), "revoked".into());
        let node = graph.update_node_metadata(a.node_id, entries.clone()).unwrap();
        assert_eq!(node.get_metadata("license").and_then(|v| v.as_string()), Some("revoked"));

        let edge = graph.enrich_edge_metadata(edge.id, entries).unwrap();
        assert_eq!(edge.confidence, 70);
        assert_eq!(edge.metadata.len(), 1);

        let stored = graph.get_chain(a.chain_id).unwrap();
        assert_eq!(stored.edges[0].metadata.len(), 1);
        assert_eq!(
            graph.update_node_metadata(NodeId::new(404), PropertyMap::new()).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_chain_components() {
        let graph = engine();
        let a = graph.upsert_entity("advisor", "adv-1", None, None, true).unwrap();
        let b = graph.upsert_entity("document", "d-1", None, Some(a.chain_id), false).unwrap();
        let c = graph.upsert_entity("document", "d-2", None, Some(a.chain_id), false).unwrap();
        graph
            .link_nodes(a.node_id, b.node_id, "references", None, PropertyMap::new())
            .unwrap();

        let report = graph.chain_components(a.chain_id).unwrap();
        assert_eq!(report.components.len(), 2);
        assert_eq!(report.components[0], vec![a.node_id, b.node_id]);
        assert_eq!(report.isolated, vec![c.node_id]);
        assert!(!report.is_connected());
    }

    #[test]
    fn test_delete_and_reset() {
        let graph = engine();
        let a = graph.upsert_entity("advisor", "adv-1", None, None, true).unwrap();
        graph.upsert_entity("advisor", "adv-2", None, None, true).unwrap();

        let report = graph.delete_chain(a.chain_id).unwrap();
        assert_eq!(report.nodes_removed, 1);
        assert_eq!(graph.delete_chain(a.chain_id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(graph.list_chains().unwrap().len(), 1);

        let report = graph.reset().unwrap();
        assert_eq!(report.chains_removed, 1);
        let stats = graph.stats().unwrap();
        assert_eq!(stats.chains, 0);
        assert_eq!(stats.nodes, 0);
        assert_eq!(stats.backend, "memory");
    }
}
