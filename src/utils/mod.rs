//! Utility building blocks shared across the analyses.
//!
//! - [`BitSet`] - dense index sets for the fixpoint computations
//! - [`graph`] - index-based directed graphs and traversals
//! - [`escape_dot`] - Graphviz label escaping

mod bitset;
mod dot;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
pub use dot::escape_dot;
