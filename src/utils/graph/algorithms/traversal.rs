//! Depth-first traversals.
//!
//! All traversals are iterative so that pathological CFGs (thousands of chained
//! blocks) cannot exhaust the call stack.

use crate::utils::{
    graph::{NodeId, Successors},
    BitSet,
};

/// Depth-first pre-order iterator over the nodes reachable from a start node.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: BitSet,
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        // Reverse push keeps successors visited in their original order
        let successors: Vec<NodeId> = self.graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if self.visited.insert(succ.index()) {
                self.stack.push(succ);
            }
        }

        Some(node)
    }
}

/// Returns a depth-first pre-order iterator starting at `start`.
///
/// An out-of-range `start` yields nothing.
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    let mut visited = BitSet::new(graph.node_count());
    let stack = if start.index() < graph.node_count() {
        visited.insert(start.index());
        vec![start]
    } else {
        Vec::new()
    };
    DfsIterator {
        graph,
        stack,
        visited,
    }
}

/// Returns the set of node indices reachable from `start` (including `start`).
pub fn reachable<G: Successors>(graph: &G, start: NodeId) -> BitSet {
    let mut set = BitSet::new(graph.node_count());
    for node in dfs(graph, start) {
        set.insert(node.index());
    }
    set
}

/// Computes the depth-first post-order of the nodes reachable from `start`.
///
/// A node is emitted only after all of its successors that were first discovered
/// through it. Unreachable nodes are absent from the result.
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut visited = BitSet::new(node_count);
    let mut result = Vec::with_capacity(node_count);
    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if !visited.insert(node.index()) {
                    continue;
                }
                stack.push((node, State::Exit));

                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited.contains(succ.index()) {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Computes the reverse post-order of the nodes reachable from `start`.
///
/// In reverse post-order every node precedes its successors except along back
/// edges, which makes it the fastest converging order for forward problems.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut order = postorder(graph, start);
    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::DirectedGraph;

    fn diamond() -> DirectedGraph {
        let mut graph = DirectedGraph::with_nodes(4);
        graph.add_edge(NodeId::new(0), NodeId::new(1));
        graph.add_edge(NodeId::new(0), NodeId::new(2));
        graph.add_edge(NodeId::new(1), NodeId::new(3));
        graph.add_edge(NodeId::new(2), NodeId::new(3));
        graph
    }

    fn ids(raw: &[usize]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId::new).collect()
    }

    #[test]
    fn test_dfs_preorder() {
        let graph = diamond();
        assert_eq!(dfs(&graph, NodeId::new(0)).collect::<Vec<_>>(), ids(&[0, 1, 3, 2]));
        assert_eq!(dfs(&graph, NodeId::new(7)).count(), 0);
    }

    #[test]
    fn test_postorder_diamond() {
        let graph = diamond();
        assert_eq!(postorder(&graph, NodeId::new(0)), ids(&[3, 1, 2, 0]));
        assert_eq!(reverse_postorder(&graph, NodeId::new(0)), ids(&[0, 2, 1, 3]));
    }

    #[test]
    fn test_postorder_loop_and_unreachable() {
        // 0 -> 1 -> 2 -> 1, node 3 unreachable
        let mut graph = DirectedGraph::with_nodes(4);
        graph.add_edge(NodeId::new(0), NodeId::new(1));
        graph.add_edge(NodeId::new(1), NodeId::new(2));
        graph.add_edge(NodeId::new(2), NodeId::new(1));
        graph.add_edge(NodeId::new(3), NodeId::new(1));

        assert_eq!(reverse_postorder(&graph, NodeId::new(0)), ids(&[0, 1, 2]));
        let seen = reachable(&graph, NodeId::new(0));
        assert!(seen.contains(2));
        assert!(!seen.contains(3));
    }

    #[test]
    fn test_postorder_deep_chain() {
        let mut graph = DirectedGraph::with_nodes(50_000);
        for i in 1..50_000 {
            graph.add_edge(NodeId::new(i - 1), NodeId::new(i));
        }
        let order = postorder(&graph, NodeId::new(0));
        assert_eq!(order.len(), 50_000);
        assert_eq!(order[0], NodeId::new(49_999));
    }
}
