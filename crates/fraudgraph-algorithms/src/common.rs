//! Shared utilities for graph algorithms
//!
//! Provides a read-only, undirected view of a chain's topology for algorithm execution.

use std::collections::HashMap;

/// Node Identifier type (u64)
pub type NodeId = u64;

/// Edge Identifier type (u64)
pub type EdgeId = u64;

/// A dense, integer-indexed, undirected view of the graph topology in
/// Compressed Sparse Row (CSR) format.
///
/// Every stored edge contributes one adjacency entry to each endpoint, so
/// traversals see the relationship regardless of its direction. The id of the
/// edge is kept aligned with each adjacency entry.
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: HashMap<NodeId, usize>,

    /// Offsets into `adj_targets` / `adj_edges`. Size = node_count + 1
    pub adj_offsets: Vec<usize>,
    /// Contiguous array of neighbour node indices
    pub adj_targets: Vec<usize>,
    /// Edge ids aligned with `adj_targets`
    pub adj_edges: Vec<EdgeId>,
}

impl GraphView {
    /// Build a view from a node list and `(edge, from, to)` triples.
    ///
    /// Edges referencing a node outside `nodes` are skipped. Adjacency order
    /// follows the order of `edges`, so callers control traversal determinism.
    pub fn from_edges<N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator<Item = NodeId>,
        E: IntoIterator<Item = (EdgeId, NodeId, NodeId)>,
    {
        let mut index_to_node = Vec::new();
        let mut node_to_index = HashMap::new();
        for node_id in nodes {
            if node_to_index.contains_key(&node_id) {
                continue;
            }
            node_to_index.insert(node_id, index_to_node.len());
            index_to_node.push(node_id);
        }

        let node_count = index_to_node.len();
        let mut temp_adjacency: Vec<Vec<(usize, EdgeId)>> = vec![Vec::new(); node_count];

        for (edge_id, from, to) in edges {
            let (Some(&u), Some(&v)) = (node_to_index.get(&from), node_to_index.get(&to)) else {
                continue;
            };
            temp_adjacency[u].push((v, edge_id));
            if u != v {
                temp_adjacency[v].push((u, edge_id));
            }
        }

        let mut adj_offsets = Vec::with_capacity(node_count + 1);
        let mut adj_targets = Vec::new();
        let mut adj_edges = Vec::new();

        adj_offsets.push(0);
        for entries in temp_adjacency {
            for (target, edge_id) in entries {
                adj_targets.push(target);
                adj_edges.push(edge_id);
            }
            adj_offsets.push(adj_targets.len());
        }

        GraphView {
            node_count,
            index_to_node,
            node_to_index,
            adj_offsets,
            adj_targets,
            adj_edges,
        }
    }

    /// Number of incident edges of a node (by index)
    pub fn degree(&self, idx: usize) -> usize {
        self.adj_offsets[idx + 1] - self.adj_offsets[idx]
    }

    /// Neighbour indices of a node, in either direction
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        let start = self.adj_offsets[idx];
        let end = self.adj_offsets[idx + 1];
        &self.adj_targets[start..end]
    }

    /// Edge ids aligned with [`GraphView::neighbors`]
    pub fn incident_edges(&self, idx: usize) -> &[EdgeId] {
        let start = self.adj_offsets[idx];
        let end = self.adj_offsets[idx + 1];
        &self.adj_edges[start..end]
    }

    /// Total number of distinct edges in the view
    pub fn edge_count(&self) -> usize {
        let mut seen: Vec<EdgeId> = self.adj_edges.clone();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_is_undirected() {
        let view = GraphView::from_edges(vec![10, 20, 30], vec![(1, 10, 20), (2, 30, 20)]);

        assert_eq!(view.node_count, 3);
        let b = view.node_to_index[&20];
        assert_eq!(view.degree(b), 2);
        assert_eq!(view.incident_edges(b), &[1, 2]);

        let a = view.node_to_index[&10];
        assert_eq!(view.neighbors(a), &[b]);
        assert_eq!(view.edge_count(), 2);
    }

    #[test]
    fn test_edges_outside_view_are_skipped() {
        let view = GraphView::from_edges(vec![1, 2], vec![(7, 1, 2), (8, 2, 99)]);
        assert_eq!(view.edge_count(), 1);
        assert_eq!(view.degree(view.node_to_index[&2]), 1);
    }

    #[test]
    fn test_duplicate_nodes_collapse() {
        let view = GraphView::from_edges(vec![5, 5, 6], Vec::new());
        assert_eq!(view.node_count, 2);
        assert_eq!(view.index_to_node, vec![5, 6]);
    }
}
