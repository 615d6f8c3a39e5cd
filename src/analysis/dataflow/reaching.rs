//! Reaching-definitions analysis.
//!
//! A definition of `x` reaches a program point if some path from the definition to
//! the point does not redefine `x`. Parameters are definitions at the function entry.

use std::{collections::BTreeSet, fmt};

use crate::analysis::{
    dataflow::{DataFlowAnalysis, Direction},
    BasicBlock, Cfg,
};

/// Where a definition happens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DefSite {
    /// The variable is a function parameter
    Param,
    /// The variable is written by instruction `index` of `block`
    Instr {
        /// Block name
        block: String,
        /// Position within the block's instruction list
        index: usize,
    },
}

/// One definition: a variable together with the place that writes it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Definition {
    /// The variable written
    pub var: String,
    /// The defining site
    pub site: DefSite,
}

impl Definition {
    /// Creates a parameter definition.
    #[must_use]
    pub fn param(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            site: DefSite::Param,
        }
    }

    /// Creates an instruction definition.
    #[must_use]
    pub fn instr(var: impl Into<String>, block: impl Into<String>, index: usize) -> Self {
        Self {
            var: var.into(),
            site: DefSite::Instr {
                block: block.into(),
                index,
            },
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.site {
            DefSite::Param => write!(f, "{}@param", self.var),
            DefSite::Instr { block, index } => write!(f, "{}@{block}:{index}", self.var),
        }
    }
}

/// Definitions that may reach each program point.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReachingDefinitions;

impl ReachingDefinitions {
    /// Returns the definitions of `var` in `set`.
    pub fn of<'a>(set: &'a BTreeSet<Definition>, var: &'a str) -> impl Iterator<Item = &'a Definition> {
        set.iter().filter(move |d| d.var == var)
    }
}

impl DataFlowAnalysis for ReachingDefinitions {
    type Lattice = BTreeSet<Definition>;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "reaching definitions";

    fn boundary(&self, cfg: &Cfg) -> Self::Lattice {
        cfg.params().iter().map(|p| Definition::param(&p.name)).collect()
    }

    fn initial(&self, _cfg: &Cfg) -> Self::Lattice {
        BTreeSet::new()
    }

    fn merge(&self, values: &[Self::Lattice]) -> Self::Lattice {
        values.iter().flatten().cloned().collect()
    }

    fn transfer(&self, block: &BasicBlock, input: &Self::Lattice) -> Self::Lattice {
        let mut out = input.clone();
        for (index, instr) in block.instrs.iter().enumerate() {
            if let Some(dest) = instr.dest() {
                out.retain(|d| d.var != dest);
                out.insert(Definition::instr(dest, &block.name, index));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::dataflow::DataFlowSolver,
        ir::{FunctionBuilder, Literal, Opcode, Type},
    };

    #[test]
    fn test_loop_reaching() {
        let f = FunctionBuilder::new("f")
            .param("x", Type::Int)
            .label("head")
            .constant("ten", Type::Int, Literal::Int(10))
            .op(Opcode::Lt, "c", Type::Bool, ["x", "ten"])
            .br("c", "body", "exit")
            .label("body")
            .constant("one", Type::Int, Literal::Int(1))
            .op(Opcode::Add, "x", Type::Int, ["x", "one"])
            .jmp("head")
            .label("exit")
            .ret(Some("x"))
            .build();
        let cfg = Cfg::from_function(&f).unwrap();
        let res = DataFlowSolver::new(ReachingDefinitions).solve(&cfg).unwrap();

        let at_head = res.in_state("head").unwrap();
        let xs: Vec<_> = ReachingDefinitions::of(at_head, "x").cloned().collect();
        assert_eq!(xs, [Definition::param("x"), Definition::instr("x", "body", 1)]);

        let at_body_exit = res.out_state("body").unwrap();
        let xs: Vec<_> = ReachingDefinitions::of(at_body_exit, "x").collect();
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].to_string(), "x@body:1");
    }

    #[test]
    fn test_entry_has_params() {
        let f = FunctionBuilder::new("f").param("a", Type::Int).ret(Some("a")).build();
        let cfg = Cfg::from_function(&f).unwrap();
        let res = DataFlowSolver::new(ReachingDefinitions).solve(&cfg).unwrap();
        let entry = cfg.entry().name.clone();
        assert!(res.in_state(&entry).unwrap().contains(&Definition::param("a")));
    }
}
