//! Bounded traversal
//!
//! Breadth-first expansion with a per-branch depth budget and a soft cap on
//! the number of collected nodes.

use super::common::{EdgeId, GraphView, NodeId};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// Result of a bounded traversal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalResult {
    /// Collected nodes, in discovery order
    pub nodes: Vec<NodeId>,
    /// Every edge crossed while reaching the collected nodes, in discovery order
    pub edges: Vec<EdgeId>,
    /// True when expansion stopped because `limit` nodes were collected
    pub limit_reached: bool,
}

/// Breadth-First expansion from one or more seeds
///
/// Each queued neighbour carries the remaining depth budget of its parent
/// minus one; a node whose budget is zero is collected but not expanded.
/// Expansion halts as soon as `limit` nodes are collected, even in the
/// middle of a frontier level. Seeds missing from the view are ignored.
pub fn bounded_bfs(
    view: &GraphView,
    seeds: &[NodeId],
    max_depth: usize,
    limit: usize,
) -> TraversalResult {
    let mut result = TraversalResult::default();
    if limit == 0 {
        result.limit_reached = true;
        return result;
    }

    let mut visited = vec![false; view.node_count];
    let mut seen_edges: FxHashSet<EdgeId> = FxHashSet::default();
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for seed in seeds {
        let Some(&idx) = view.node_to_index.get(seed) else {
            continue;
        };
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        result.nodes.push(*seed);
        queue.push_back((idx, max_depth));

        if result.nodes.len() >= limit {
            result.limit_reached = true;
            return result;
        }
    }

    while let Some((idx, remaining)) = queue.pop_front() {
        if remaining == 0 {
            continue;
        }

        let neighbors = view.neighbors(idx);
        let edges = view.incident_edges(idx);
        for (&next, &edge_id) in neighbors.iter().zip(edges) {
            if seen_edges.insert(edge_id) {
                result.edges.push(edge_id);
            }
            if visited[next] {
                continue;
            }

            visited[next] = true;
            result.nodes.push(view.index_to_node[next]);
            queue.push_back((next, remaining - 1));

            if result.nodes.len() >= limit {
                result.limit_reached = true;
                return result;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1 - 2 - 3 - 4 - 5
    fn line() -> GraphView {
        GraphView::from_edges(
            vec![1, 2, 3, 4, 5],
            vec![(12, 1, 2), (23, 2, 3), (34, 3, 4), (45, 4, 5)],
        )
    }

    #[test]
    fn test_depth_budget() {
        let view = line();

        let r = bounded_bfs(&view, &[1], 1, 100);
        assert_eq!(r.nodes, vec![1, 2]);
        assert_eq!(r.edges, vec![12]);

        let r = bounded_bfs(&view, &[1], 2, 100);
        assert_eq!(r.nodes, vec![1, 2, 3]);
        assert_eq!(r.edges, vec![12, 23]);

        let r = bounded_bfs(&view, &[1], 3, 100);
        assert_eq!(r.nodes, vec![1, 2, 3, 4]);
        assert!(!r.limit_reached);
    }

    #[test]
    fn test_limit_halts_mid_level() {
        // Star: 1 connected to 2..=6
        let view = GraphView::from_edges(
            vec![1, 2, 3, 4, 5, 6],
            (2..=6).map(|n| (100 + n, 1, n)),
        );

        let r = bounded_bfs(&view, &[1], 3, 3);
        assert_eq!(r.nodes, vec![1, 2, 3]);
        assert_eq!(r.edges, vec![102, 103]);
        assert!(r.limit_reached);
    }

    #[test]
    fn test_traverses_against_edge_direction() {
        let view = line();
        let r = bounded_bfs(&view, &[5], 2, 100);
        assert_eq!(r.nodes, vec![5, 4, 3]);
    }

    #[test]
    fn test_multiple_seeds_and_unknown_seed() {
        let view = line();
        let r = bounded_bfs(&view, &[1, 5, 42], 1, 100);
        assert_eq!(r.nodes, vec![1, 5, 2, 4]);

        let r = bounded_bfs(&view, &[42], 3, 100);
        assert!(r.nodes.is_empty());
        assert!(r.edges.is_empty());
    }

    #[test]
    fn test_cycle_edges_reported_once() {
        let view = GraphView::from_edges(vec![1, 2, 3], vec![(1, 1, 2), (2, 2, 3), (3, 3, 1)]);
        let r = bounded_bfs(&view, &[1], 3, 100);
        assert_eq!(r.nodes.len(), 3);
        let mut edges = r.edges.clone();
        edges.sort_unstable();
        assert_eq!(edges, vec![1, 2, 3]);
    }
}
