//! Dead code elimination.
//!
//! Two rules, applied together until neither removes anything:
//!
//! - **unused**: a pure instruction whose destination is not an argument of any
//!   instruction in the function is deleted
//! - **overwritten**: inside a block, a pure instruction whose destination is
//!   written again before any instruction reads it is deleted
//!
//! Effects (`print`, `store`, calls) are never removed, whether or not their
//! results are used. Each round can only expose the next link of a def-use chain,
//! so the number of rounds is bounded by the number of instructions.

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::Cfg,
    compiler::{pass::FunctionPass, passes::valuetable::Rewrites, CompilerContext, EventKind},
    Error, Result,
};

/// Removes pure instructions whose results are never read.
#[derive(Debug, Clone, Default)]
pub struct DeadCodeEliminationPass {
    max_iterations: Option<usize>,
}

impl DeadCodeEliminationPass {
    /// Creates a pass whose round cap is the function's instruction count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the rounds of the inner fixpoint.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations.max(1));
        self
    }

    fn remove_unused(cfg: &mut Cfg, rewrites: &mut Rewrites) -> usize {
        let used: HashSet<String> = cfg
            .blocks()
            .iter()
            .flat_map(|b| b.instrs.iter())
            .flat_map(|i| i.args().iter().cloned())
            .collect();

        let mut removed = 0;
        for block in cfg.blocks_mut() {
            rewrites.block.clone_from(&block.name);
            block.instrs.retain(|instr| {
                let dead = instr.is_pure() && instr.dest().is_some_and(|d| !used.contains(d));
                if dead {
                    rewrites.record(EventKind::InstructionRemoved, format!("unused {instr}"));
                    removed += 1;
                }
                !dead
            });
        }
        removed
    }

    fn remove_overwritten(cfg: &mut Cfg, rewrites: &mut Rewrites) -> usize {
        let mut removed = 0;
        for block in cfg.blocks_mut() {
            let mut pending: HashMap<&str, usize> = HashMap::new();
            let mut dead = vec![false; block.instrs.len()];
            for (i, instr) in block.instrs.iter().enumerate() {
                for arg in instr.args() {
                    pending.remove(arg.as_str());
                }
                if let Some(dest) = instr.dest() {
                    if let Some(previous) = pending.remove(dest) {
                        dead[previous] = true;
                    }
                    if instr.is_pure() {
                        pending.insert(dest, i);
                    }
                }
            }
            if !dead.contains(&true) {
                continue;
            }

            rewrites.block.clone_from(&block.name);
            let mut index = 0;
            block.instrs.retain(|instr| {
                let keep = !dead[index];
                index += 1;
                if !keep {
                    rewrites.record(EventKind::InstructionRemoved, format!("overwritten {instr}"));
                    removed += 1;
                }
                keep
            });
        }
        removed
    }
}

impl FunctionPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn description(&self) -> &'static str {
        "Removes pure instructions whose results are never read"
    }

    fn run_on_function(&self, cfg: &mut Cfg, ctx: &CompilerContext) -> Result<bool> {
        let cap = self
            .max_iterations
            .unwrap_or_else(|| cfg.instruction_count() + 1);
        let mut rewrites = Rewrites::new(cfg.name(), self.name());

        let mut settled = false;
        for _ in 0..cap {
            let removed = Self::remove_unused(cfg, &mut rewrites) + Self::remove_overwritten(cfg, &mut rewrites);
            if removed == 0 {
                settled = true;
                break;
            }
        }

        let changed = rewrites.count() > 0;
        if changed {
            ctx.events.merge(&rewrites.events);
        }
        if !settled {
            return Err(Error::NonConvergence {
                analysis: "dead code elimination",
                iterations: cap,
            });
        }
        Ok(changed)
    }
}
