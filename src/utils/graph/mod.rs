//! Minimal directed graph support for control-flow analysis.
//!
//! The CFG itself is keyed by block names (that is what every consumer looks blocks up
//! by), but the fixpoint algorithms want dense indices. [`DirectedGraph`] is the dense
//! view: one [`NodeId`] per block, adjacency lists in both directions, and the
//! traversal algorithms in [`algorithms`] run on top of it.

pub mod algorithms;
mod node;
mod traits;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, Successors};

/// An adjacency-list directed graph without node or edge payloads.
///
/// Parallel edges are kept: a `br` whose two labels name the same block produces two
/// edges, matching the predecessor lists that phi operands are paired with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectedGraph {
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl DirectedGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with `count` nodes and no edges.
    #[must_use]
    pub fn with_nodes(count: usize) -> Self {
        Self {
            successors: vec![Vec::new(); count],
            predecessors: vec![Vec::new(); count],
        }
    }

    /// Adds a node and returns its identifier.
    pub fn add_node(&mut self) -> NodeId {
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        NodeId::new(self.successors.len() - 1)
    }

    /// Adds the edge `from -> to`.
    ///
    /// # Panics
    ///
    /// Panics if either node does not belong to this graph.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        assert!(
            from.index() < self.successors.len() && to.index() < self.successors.len(),
            "edge endpoint out of bounds"
        );
        self.successors[from.index()].push(to);
        self.predecessors[to.index()].push(from);
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }
}

impl GraphBase for DirectedGraph {
    fn node_count(&self) -> usize {
        self.successors.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.successors.len()).map(NodeId::new)
    }
}

impl Successors for DirectedGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.successors
            .get(node.index())
            .into_iter()
            .flatten()
            .copied()
    }
}

impl Predecessors for DirectedGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.predecessors
            .get(node.index())
            .into_iter()
            .flatten()
            .copied()
    }
}
