//! SSA destruction.
//!
//! Every phi `d = phi a .p b .q` becomes the copies `d = id a` at the end of `p` and
//! `d = id b` at the end of `q`. Two things keep this correct after value numbering
//! has moved names across phis:
//!
//! - an edge out of a block with several successors is split first, so the copies
//!   run only when control actually takes that edge
//! - all copies into one predecessor form a parallel copy; they are ordered so that
//!   no copy overwrites a value another copy still reads, and cycles are broken
//!   through a fresh temporary

use std::collections::BTreeMap;

use crate::{
    analysis::{ssa::NameGenerator, Cfg},
    compiler::{EventKind, EventLog},
    ir::{Instruction, Type},
    Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCopy {
    dest: String,
    src: String,
    ty: Type,
}

/// Lowers phis to copies.
///
/// ```rust
/// use irkit::analysis::{ssa::SsaDestructor, Cfg};
/// use irkit::ir::{FunctionBuilder, Literal, Type};
///
/// let f = FunctionBuilder::new("f")
///     .param("c", Type::Bool)
///     .br("c", "a", "b")
///     .label("a")
///     .constant("x.0", Type::Int, Literal::Int(1))
///     .jmp("j")
///     .label("b")
///     .constant("x.1", Type::Int, Literal::Int(2))
///     .jmp("j")
///     .label("j")
///     .phi("x", Type::Int, &[("a", "x.0"), ("b", "x.1")])
///     .print(["x"])
///     .build();
/// let cfg = SsaDestructor::new(Cfg::from_function(&f)?).build()?;
///
/// assert_eq!(cfg.block("a")?.instrs[1].to_string(), "x: int = id x.0;");
/// assert_eq!(cfg.block("j")?.phi_count(), 0);
/// # Ok::<(), irkit::Error>(())
/// ```
pub struct SsaDestructor<'a> {
    cfg: Cfg,
    events: Option<&'a EventLog>,
}

impl<'a> SsaDestructor<'a> {
    /// Starts lowering `cfg`.
    #[must_use]
    pub fn new(cfg: Cfg) -> Self {
        Self { cfg, events: None }
    }

    /// Records split edges into `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Runs the lowering.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a phi names a block that is not a
    /// predecessor of the phi's block.
    pub fn build(mut self) -> Result<Cfg> {
        self.split_edges()?;

        let mut copies: BTreeMap<String, Vec<PendingCopy>> = BTreeMap::new();
        let mut removed = 0usize;
        for block in self.cfg.blocks_mut() {
            let count = block.phi_count();
            for phi in block.instrs.drain(..count) {
                let (Some(dest), Some(ty)) = (phi.dest(), phi.ty()) else {
                    continue;
                };
                for (src, label) in phi.args().iter().zip(phi.labels()) {
                    copies.entry(label.clone()).or_default().push(PendingCopy {
                        dest: dest.to_string(),
                        src: src.clone(),
                        ty: ty.clone(),
                    });
                }
                removed += 1;
            }
        }

        let mut names = NameGenerator::for_cfg(&self.cfg);
        for (pred, parallel) in copies {
            let sequence: Vec<Instruction> = sequentialize(parallel, &mut names)
                .into_iter()
                .map(|i| i.with_key(self.cfg.fresh_key()))
                .collect();
            let block = self.cfg.block_mut(&pred)?;
            let at = block.insertion_point();
            block.instrs.splice(at..at, sequence);
        }

        if removed > 0 {
            if let Some(events) = self.events {
                events
                    .record(EventKind::Info)
                    .function(self.cfg.name())
                    .pass("ssa")
                    .message(format!("{removed} phis lowered to copies"));
            }
        }
        log::debug!("lowered {removed} phis in '{}'", self.cfg.name());
        Ok(self.cfg)
    }

    /// Splits every edge into a phi block whose source has several successors.
    fn split_edges(&mut self) -> Result<()> {
        let mut edges = Vec::new();
        for block in self.cfg.blocks() {
            let preds = self.cfg.predecessors_of(&block.name);
            for phi in block.phis() {
                for label in phi.labels() {
                    if !preds.contains(&label.as_str()) {
                        return Err(malformed_error!(
                            "Phi in '{}' of '{}' names '{}', which is not a predecessor",
                            block.name,
                            self.cfg.name(),
                            label
                        ));
                    }
                    let edge = (label.clone(), block.name.clone());
                    if self.cfg.successors_of(label).len() > 1 && !edges.contains(&edge) {
                        edges.push(edge);
                    }
                }
            }
        }

        for (from, to) in edges {
            let middle = self.cfg.split_edge(&from, &to)?;
            if let Some(events) = self.events {
                events
                    .record(EventKind::EdgeSplit)
                    .function(self.cfg.name())
                    .block(&middle)
                    .pass("ssa")
                    .message(format!("{from} -> {to}"));
            }
        }
        Ok(())
    }
}

/// Orders a parallel copy so that it can run one copy at a time.
fn sequentialize(parallel: Vec<PendingCopy>, names: &mut NameGenerator) -> Vec<Instruction> {
    let mut pending: Vec<PendingCopy> = parallel.into_iter().filter(|c| c.dest != c.src).collect();
    let mut out = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready = pending
            .iter()
            .position(|c| !pending.iter().any(|other| other.src == c.dest));
        match ready {
            Some(i) => {
                let copy = pending.remove(i);
                out.push(Instruction::id(copy.dest, copy.ty, copy.src));
            }
            None => {
                // Every destination is still read: park one value and redirect its readers.
                let blocked = pending[0].dest.clone();
                let ty = pending[0].ty.clone();
                let temp = names.fresh(&format!("{blocked}.tmp"));
                out.push(Instruction::id(temp.clone(), ty, blocked.clone()));
                for copy in &mut pending {
                    if copy.src == blocked {
                        copy.src.clone_from(&temp);
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::ssa::to_ssa,
        ir::{FunctionBuilder, Literal, Opcode},
        Error,
    };

    fn copy(dest: &str, src: &str) -> PendingCopy {
        PendingCopy {
            dest: dest.into(),
            src: src.into(),
            ty: Type::Int,
        }
    }

    fn render(instrs: &[Instruction]) -> Vec<String> {
        instrs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_sequentialize_chain() {
        let mut names = NameGenerator::default();
        let out = sequentialize(vec![copy("a", "b"), copy("b", "c")], &mut names);
        assert_eq!(render(&out), ["a: int = id b;", "b: int = id c;"]);
    }

    #[test]
    fn test_sequentialize_swap() {
        let mut names = NameGenerator::default();
        let out = sequentialize(vec![copy("a", "b"), copy("b", "a"), copy("c", "c")], &mut names);
        assert_eq!(
            render(&out),
            ["a.tmp.0: int = id a;", "a: int = id b;", "b: int = id a.tmp.0;"]
        );
    }

    #[test]
    fn test_critical_edge_split() {
        let f = FunctionBuilder::new("f")
            .param("n", Type::Int)
            .constant("i", Type::Int, Literal::Int(0))
            .constant("one", Type::Int, Literal::Int(1))
            .label("loop")
            .op(Opcode::Add, "i", Type::Int, ["i", "one"])
            .op(Opcode::Lt, "c", Type::Bool, ["i", "n"])
            .br("c", "loop", "done")
            .label("done")
            .ret(Some("i"))
            .build();
        let ssa = to_ssa(Cfg::from_function(&f).unwrap()).unwrap();
        let log = EventLog::new();
        let cfg = SsaDestructor::new(ssa).with_events(&log).build().unwrap();

        assert_eq!(log.count_kind(EventKind::EdgeSplit), 1);
        assert!(cfg.blocks().iter().all(|b| b.phi_count() == 0));
        // The back edge now runs through the split block, which holds the copies.
        let split = &cfg.blocks()[2];
        assert_eq!(split.successors(), ["loop"]);
        assert!(split.instrs.iter().any(|i| i.op() == Some(Opcode::Id)));
        assert_eq!(cfg.successors_of("loop"), [split.name.as_str(), "done"]);
    }

    #[test]
    fn test_phi_from_non_predecessor() {
        let f = FunctionBuilder::new("f")
            .constant("a", Type::Int, Literal::Int(1))
            .jmp("j")
            .label("other")
            .jmp("j")
            .label("j")
            .phi("x", Type::Int, &[("elsewhere", "a")])
            .ret(None)
            .label("elsewhere")
            .ret(None)
            .build();
        let cfg = Cfg::from_function(&f).unwrap();
        assert!(matches!(SsaDestructor::new(cfg).build(), Err(Error::Malformed { .. })));
    }
}
