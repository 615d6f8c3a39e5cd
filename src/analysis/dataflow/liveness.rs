//! Live-variable analysis.
//!
//! Backward may-analysis: a variable is live at a program point if some path from
//! that point reads it before writing it.
//!
//! Phi operands are uses on the incoming edge, not at the start of the phi's block:
//! `x.2 = phi x.0 .a x.1 .b` keeps `x.0` live out of `a` only. Phi destinations are
//! ordinary definitions.

use std::collections::BTreeSet;

use crate::analysis::{
    dataflow::{DataFlowAnalysis, Direction},
    BasicBlock, Cfg,
};

/// Variables that may be read before being overwritten.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveVariables;

impl LiveVariables {
    /// Returns the variables read in `block` before any write to them, phis excluded.
    #[must_use]
    pub fn upward_exposed(block: &BasicBlock) -> BTreeSet<String> {
        let mut written = BTreeSet::new();
        let mut used = BTreeSet::new();
        for instr in block.instrs.iter().filter(|i| !i.is_phi()) {
            for arg in instr.args() {
                if !written.contains(arg) {
                    used.insert(arg.clone());
                }
            }
            if let Some(dest) = instr.dest() {
                written.insert(dest.to_string());
            }
        }
        used
    }

    /// Returns the live set after each instruction of `block`, given the live set at
    /// the block exit. Entry `i` is the set live right after instruction `i`.
    #[must_use]
    pub fn live_after_each(block: &BasicBlock, live_out: &BTreeSet<String>) -> Vec<BTreeSet<String>> {
        let mut live = live_out.clone();
        let mut after = vec![BTreeSet::new(); block.instrs.len()];
        for (i, instr) in block.instrs.iter().enumerate().rev() {
            after[i] = live.clone();
            step_backward(instr, &mut live);
        }
        after
    }
}

fn step_backward(instr: &crate::ir::Instruction, live: &mut BTreeSet<String>) {
    if let Some(dest) = instr.dest() {
        live.remove(dest);
    }
    if !instr.is_phi() {
        live.extend(instr.args().iter().cloned());
    }
}

impl DataFlowAnalysis for LiveVariables {
    type Lattice = BTreeSet<String>;
    const DIRECTION: Direction = Direction::Backward;
    const NAME: &'static str = "liveness";

    fn boundary(&self, _cfg: &Cfg) -> Self::Lattice {
        BTreeSet::new()
    }

    fn initial(&self, _cfg: &Cfg) -> Self::Lattice {
        BTreeSet::new()
    }

    fn merge(&self, values: &[Self::Lattice]) -> Self::Lattice {
        values.iter().flatten().cloned().collect()
    }

    fn transfer(&self, block: &BasicBlock, input: &Self::Lattice) -> Self::Lattice {
        let mut live = input.clone();
        for instr in block.instrs.iter().rev() {
            step_backward(instr, &mut live);
        }
        live
    }

    fn edge(&self, from: &BasicBlock, to: &BasicBlock, value: &Self::Lattice) -> Self::Lattice {
        let mut live = value.clone();
        for phi in to.phis() {
            for (arg, label) in phi.args().iter().zip(phi.labels()) {
                if *label == from.name {
                    live.insert(arg.clone());
                }
            }
        }
        live
    }
}
