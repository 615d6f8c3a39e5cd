//! Node identifiers for directed graphs.

use std::fmt;

/// A strongly-typed index of a node within a [`DirectedGraph`](crate::utils::graph::DirectedGraph).
///
/// For CFGs the index is the position of the block in the CFG's block order, so
/// per-block analysis results can be stored in plain vectors indexed by `NodeId`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw 0-based index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_basics() {
        let a = NodeId::new(3);
        assert_eq!(a.index(), 3);
        assert_eq!(NodeId::from(3), a);
        assert!(NodeId::new(1) < a);
        assert_eq!(format!("{a}"), "n3");
        assert_eq!(format!("{a:?}"), "NodeId(3)");
    }
}
