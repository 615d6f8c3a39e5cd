//! Graph algorithms shared by the analyses.
//!
//! - [`dfs`] - iterative depth-first pre-order, used for reachability
//! - [`postorder`] - depth-first post-order, the seed order of backward dataflow
//! - [`reverse_postorder`] - the iteration order of dominance and forward dataflow

mod traversal;

pub use traversal::{dfs, postorder, reachable, reverse_postorder, DfsIterator};
