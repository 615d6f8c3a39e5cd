//! Worklist-based dataflow solver.
//!
//! 1. every program point starts at the analysis' initial value
//! 2. all blocks enter a FIFO worklist, in reverse post-order for forward problems
//!    and post-order for backward ones (unreachable blocks last)
//! 3. a dequeued block merges the values of its neighbors on the incoming side
//!    (or takes the boundary value if it has none), applies the transfer function,
//!    and if the result differs from the stored one, stores it and enqueues its
//!    neighbors on the outgoing side
//!
//! The visiting order only affects how fast the fixpoint is reached, never which
//! fixpoint: merge is associative and commutative. The number of block visits is
//! capped as a guard against non-monotone transfer functions.

use std::collections::VecDeque;

use crate::{
    analysis::{
        dataflow::{AnalysisResults, DataFlowAnalysis, Direction},
        Cfg,
    },
    utils::{
        graph::{algorithms, DirectedGraph, GraphBase, NodeId, Predecessors, Successors},
        BitSet,
    },
    Error, Result,
};

/// Default cap on block visits, per block.
pub const DEFAULT_MAX_ITERATIONS_PER_BLOCK: usize = 100;

/// Computes the fixpoint of a [`DataFlowAnalysis`].
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    analysis: A,
    max_iterations_per_block: usize,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Creates a solver for `analysis`.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self {
            analysis,
            max_iterations_per_block: DEFAULT_MAX_ITERATIONS_PER_BLOCK,
        }
    }

    /// Sets the visit cap: `limit * number_of_blocks` block visits in total.
    #[must_use]
    pub fn with_max_iterations_per_block(mut self, limit: usize) -> Self {
        self.max_iterations_per_block = limit.max(1);
        self
    }

    /// Runs the analysis over `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonConvergence`] if the visit cap is exceeded.
    pub fn solve(&self, cfg: &Cfg) -> Result<AnalysisResults<A::Lattice>> {
        let names: Vec<String> = cfg.names().map(str::to_string).collect();
        let n = names.len();
        if n == 0 {
            return Ok(AnalysisResults::new(names, Vec::new(), Vec::new(), 0));
        }

        let graph = cfg.graph();
        let blocks = cfg.blocks();
        let initial = self.analysis.initial(cfg);
        let boundary = self.analysis.boundary(cfg);
        let mut in_states = vec![initial.clone(); n];
        let mut out_states = vec![initial; n];

        let (mut worklist, mut queued) = seed_worklist::<A>(&graph);
        let limit = self.max_iterations_per_block.saturating_mul(n);
        let mut iterations = 0;

        while let Some(node) = worklist.pop_front() {
            queued.remove(node.index());
            iterations += 1;
            if iterations > limit {
                return Err(Error::NonConvergence {
                    analysis: A::NAME,
                    iterations,
                });
            }

            let block = &blocks[node.index()];
            let (incoming, sources, targets): (Vec<NodeId>, &mut Vec<A::Lattice>, &mut Vec<A::Lattice>) =
                match A::DIRECTION {
                    Direction::Forward => (graph.predecessors(node).collect(), &mut out_states, &mut in_states),
                    Direction::Backward => (graph.successors(node).collect(), &mut in_states, &mut out_states),
                };

            let merged = if incoming.is_empty() {
                boundary.clone()
            } else {
                let values: Vec<A::Lattice> = incoming
                    .iter()
                    .map(|&m| {
                        let neighbor = &blocks[m.index()];
                        match A::DIRECTION {
                            Direction::Forward => self.analysis.edge(neighbor, block, &sources[m.index()]),
                            Direction::Backward => self.analysis.edge(block, neighbor, &sources[m.index()]),
                        }
                    })
                    .collect();
                self.analysis.merge(&values)
            };
            let result = self.analysis.transfer(block, &merged);
            targets[node.index()] = merged;

            if result != sources[node.index()] {
                sources[node.index()] = result;
                let affected: Vec<NodeId> = match A::DIRECTION {
                    Direction::Forward => graph.successors(node).collect(),
                    Direction::Backward => graph.predecessors(node).collect(),
                };
                for next in affected {
                    if queued.insert(next.index()) {
                        worklist.push_back(next);
                    }
                }
            }
        }

        log::trace!("{} over '{}' settled after {iterations} visits", A::NAME, cfg.name());
        Ok(AnalysisResults::new(names, in_states, out_states, iterations))
    }
}

fn seed_worklist<A: DataFlowAnalysis>(graph: &DirectedGraph) -> (VecDeque<NodeId>, BitSet) {
    let entry = NodeId::new(0);
    let mut order = match A::DIRECTION {
        Direction::Forward => algorithms::reverse_postorder(graph, entry),
        Direction::Backward => algorithms::postorder(graph, entry),
    };

    let mut queued = BitSet::new(graph.node_count());
    for node in &order {
        queued.insert(node.index());
    }
    let missing: Vec<NodeId> = graph.node_ids().filter(|n| !queued.contains(n.index())).collect();
    for node in missing {
        queued.insert(node.index());
        order.push(node);
    }
    (order.into_iter().collect(), queued)
}
