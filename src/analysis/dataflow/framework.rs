//! Core abstractions of the dataflow framework.
//!
//! An analysis is described by five things:
//!
//! - a direction ([`Direction::Forward`] or [`Direction::Backward`])
//! - a lattice value type with finite height
//! - a boundary value (entering the entry block, or leaving the exit blocks)
//! - a merge function over the values of the neighbors on the incoming side
//! - a transfer function describing the effect of one block
//!
//! The [`DataFlowSolver`](super::DataFlowSolver) finds the fixpoint.

use std::{collections::BTreeMap, fmt::Debug};

use crate::analysis::{BasicBlock, Cfg};

/// The direction in which facts flow through the CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From predecessors to successors (defined variables, reaching definitions,
    /// constant propagation)
    Forward,
    /// From successors to predecessors (liveness)
    Backward,
}

/// A dataflow analysis over a [`Cfg`].
///
/// The solver compares lattice values by equality to detect change, so transfer
/// and merge must be monotone for the iteration to terminate.
pub trait DataFlowAnalysis {
    /// The abstract value attached to program points.
    type Lattice: Clone + Debug + PartialEq;

    /// The direction of the analysis.
    const DIRECTION: Direction;

    /// A short name used in logs and convergence errors.
    const NAME: &'static str;

    /// The value entering the entry block (forward) or leaving blocks without
    /// successors (backward).
    fn boundary(&self, cfg: &Cfg) -> Self::Lattice;

    /// The value every program point starts with.
    fn initial(&self, cfg: &Cfg) -> Self::Lattice;

    /// Combines the values arriving from several neighbors.
    ///
    /// Called with at least one value.
    fn merge(&self, values: &[Self::Lattice]) -> Self::Lattice;

    /// Computes the effect of `block`.
    ///
    /// Forward analyses map the block-entry value to the block-exit value; backward
    /// analyses map the block-exit value to the block-entry value.
    fn transfer(&self, block: &BasicBlock, input: &Self::Lattice) -> Self::Lattice;

    /// Adjusts a value as it crosses the edge `from -> to`, before merging.
    ///
    /// The default passes values through unchanged. Analyses that treat phi
    /// operands as uses on the incoming edge override this.
    fn edge(&self, _from: &BasicBlock, _to: &BasicBlock, value: &Self::Lattice) -> Self::Lattice {
        value.clone()
    }
}

/// The fixpoint of an analysis.
///
/// `in` is always the value at block entry and `out` the value at block exit,
/// regardless of direction.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResults<L> {
    names: Vec<String>,
    in_states: Vec<L>,
    out_states: Vec<L>,
    iterations: usize,
}

impl<L: Clone> AnalysisResults<L> {
    pub(crate) fn new(names: Vec<String>, in_states: Vec<L>, out_states: Vec<L>, iterations: usize) -> Self {
        Self {
            names,
            in_states,
            out_states,
            iterations,
        }
    }

    /// Returns the value at the entry of `block`.
    #[must_use]
    pub fn in_state(&self, block: &str) -> Option<&L> {
        self.position(block).map(|i| &self.in_states[i])
    }

    /// Returns the value at the exit of `block`.
    #[must_use]
    pub fn out_state(&self, block: &str) -> Option<&L> {
        self.position(block).map(|i| &self.out_states[i])
    }

    /// Returns the block-entry values, keyed by block name.
    #[must_use]
    pub fn in_map(&self) -> BTreeMap<String, L> {
        self.names.iter().cloned().zip(self.in_states.iter().cloned()).collect()
    }

    /// Returns the block-exit values, keyed by block name.
    #[must_use]
    pub fn out_map(&self) -> BTreeMap<String, L> {
        self.names.iter().cloned().zip(self.out_states.iter().cloned()).collect()
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.names.len()
    }

    /// Returns the number of block visits the solver needed.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn position(&self, block: &str) -> Option<usize> {
        self.names.iter().position(|n| n == block)
    }
}
