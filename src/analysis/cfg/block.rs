//! Basic blocks.

use crate::ir::{Instruction, Opcode};

/// A maximal straight-line sequence of instructions.
///
/// After CFG construction the last instruction is always the block's only
/// terminator, and labels are not stored: the block's `name` is its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Block name, either the source label or a synthesized `<function>_<n>`
    pub name: String,
    /// Instructions, phis first, terminator last
    pub instrs: Vec<Instruction>,
}

impl BasicBlock {
    /// Creates a block.
    #[must_use]
    pub fn new(name: impl Into<String>, instrs: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            instrs,
        }
    }

    /// Returns the terminator, if the block has one.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instrs.last().filter(|i| i.is_terminator())
    }

    /// Returns the terminator for retargeting.
    pub fn terminator_mut(&mut self) -> Option<&mut Instruction> {
        self.instrs.last_mut().filter(|i| i.is_terminator())
    }

    /// Returns the successor names derived from the terminator, without duplicates.
    ///
    /// `br` yields the true target first. `ret` and a missing terminator yield nothing.
    #[must_use]
    pub fn successors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(2);
        if let Some(term) = self.terminator() {
            if matches!(term.op(), Some(Opcode::Jmp | Opcode::Br)) {
                for label in term.labels() {
                    if !out.contains(&label.as_str()) {
                        out.push(label);
                    }
                }
            }
        }
        out
    }

    /// Returns the number of leading phi instructions.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.instrs.iter().take_while(|i| i.is_phi()).count()
    }

    /// Iterates over the leading phi instructions.
    pub fn phis(&self) -> impl Iterator<Item = &Instruction> {
        self.instrs.iter().take_while(|i| i.is_phi())
    }

    /// Returns the index at which non-terminator code may be appended.
    #[must_use]
    pub fn insertion_point(&self) -> usize {
        if self.terminator().is_some() {
            self.instrs.len() - 1
        } else {
            self.instrs.len()
        }
    }

    /// Iterates over the variables written in this block, in order.
    pub fn defs(&self) -> impl Iterator<Item = &str> {
        self.instrs.iter().filter_map(Instruction::dest)
    }
}
