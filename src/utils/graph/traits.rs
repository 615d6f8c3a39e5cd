//! Trait definitions for graph abstractions.
//!
//! Traversals are written against these traits instead of a concrete graph type so
//! the same code walks both CFG snapshots and the small graphs used in tests.
//!
//! - [`GraphBase`] - node count and node iteration
//! - [`Successors`] - outgoing edges
//! - [`Predecessors`] - incoming edges

use crate::utils::graph::NodeId;

/// Core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node identifiers in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Graphs that support forward edge traversal.
pub trait Successors: GraphBase {
    /// Returns the direct successors of `node`, in edge insertion order.
    ///
    /// For a CFG block ending in `br`, this is the true target followed by the false target.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Graphs that support backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Returns the direct predecessors of `node`, in edge insertion order.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}
