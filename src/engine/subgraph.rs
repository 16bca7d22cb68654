//! Bounded neighbourhood retrieval for drill-down views

use super::FraudGraph;
use crate::error::{FraudGraphError, FraudGraphResult};
use crate::graph::{ChainId, Edge, EdgeId, GraphStore, Node, NodeId};
use fraudgraph_algorithms::{bounded_bfs, GraphView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Nodes and edges around a seed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Expansion stopped at the node limit
    #[serde(skip)]
    pub truncated: bool,
}

impl Subgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Undirected view over the chains holding the seeds, in id order
fn chain_view(store: &GraphStore, chains: &BTreeSet<ChainId>) -> GraphView {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for &chain_id in chains {
        nodes.extend(store.chain_nodes(chain_id).into_iter().map(|n| n.id.as_u64()));
        edges.extend(
            store
                .chain_edges(chain_id)
                .into_iter()
                .map(|e| (e.id.as_u64(), e.from_node_id.as_u64(), e.to_node_id.as_u64())),
        );
    }
    GraphView::from_edges(nodes, edges)
}

impl FraudGraph {
    /// Breadth-first neighbourhood of the node for `(node_type, reference_id)`
    ///
    /// `depth` defaults to the configured default and must lie within
    /// 1..=max; `limit` likewise. An unknown seed yields an empty subgraph.
    pub fn subgraph(
        &self,
        node_type: &str,
        reference_id: &str,
        depth: Option<usize>,
        limit: Option<usize>,
    ) -> FraudGraphResult<Subgraph> {
        let bounds = &self.config.subgraph;
        let depth = depth.unwrap_or(bounds.default_depth);
        if depth < 1 || depth > bounds.max_depth {
            return Err(FraudGraphError::invalid(format!(
                "depth {} must be within 1..={}",
                depth, bounds.max_depth
            )));
        }
        let limit = limit.unwrap_or(bounds.default_limit);
        if limit < 1 || limit > bounds.max_limit {
            return Err(FraudGraphError::invalid(format!(
                "limit {} must be within 1..={}",
                limit, bounds.max_limit
            )));
        }

        let store = self.read()?;
        let seeds: Vec<&Node> = store.find_node(node_type.trim(), reference_id.trim()).into_iter().collect();
        if seeds.is_empty() {
            debug!(node_type, reference_id, "No seed for subgraph");
            return Ok(Subgraph::default());
        }

        let chains: BTreeSet<ChainId> = seeds.iter().map(|n| n.chain_id).collect();
        let view = chain_view(&store, &chains);
        let seed_ids: Vec<u64> = seeds.iter().map(|n| n.id.as_u64()).collect();
        let traversal = bounded_bfs(&view, &seed_ids, depth, limit);

        let nodes: Vec<Node> = traversal
            .nodes
            .iter()
            .filter_map(|&id| store.get_node(NodeId::new(id)).cloned())
            .collect();
        let edges: Vec<Edge> = traversal
            .edges
            .iter()
            .filter_map(|&id| store.get_edge(EdgeId::new(id)).cloned())
            .collect();

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            truncated = traversal.limit_reached,
            "Subgraph retrieved"
        );
        Ok(Subgraph {
            nodes,
            edges,
            truncated: traversal.limit_reached,
        })
    }
}
