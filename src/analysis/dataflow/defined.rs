//! Defined-variables analysis.
//!
//! Forward may-analysis: a variable is in the set at a program point if some path
//! from the entry assigns it (parameters count as assigned at entry).

use std::collections::BTreeSet;

use crate::analysis::{
    dataflow::{DataFlowAnalysis, Direction},
    BasicBlock, Cfg,
};

/// Variables assigned on at least one path from the entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinedVariables;

impl DataFlowAnalysis for DefinedVariables {
    type Lattice = BTreeSet<String>;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "defined variables";

    fn boundary(&self, cfg: &Cfg) -> Self::Lattice {
        cfg.params().iter().map(|p| p.name.clone()).collect()
    }

    fn initial(&self, _cfg: &Cfg) -> Self::Lattice {
        BTreeSet::new()
    }

    fn merge(&self, values: &[Self::Lattice]) -> Self::Lattice {
        values.iter().flatten().cloned().collect()
    }

    fn transfer(&self, block: &BasicBlock, input: &Self::Lattice) -> Self::Lattice {
        let mut out = input.clone();
        out.extend(block.defs().map(str::to_string));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::dataflow::DataFlowSolver,
        ir::{FunctionBuilder, Literal, Type},
    };

    #[test]
    fn test_defined_through_diamond() {
        let f = FunctionBuilder::new("f")
            .param("c", Type::Bool)
            .br("c", "l", "r")
            .label("l")
            .constant("a", Type::Int, Literal::Int(1))
            .jmp("j")
            .label("r")
            .constant("b", Type::Int, Literal::Int(2))
            .label("j")
            .ret(None)
            .build();
        let cfg = Cfg::from_function(&f).unwrap();
        let res = DataFlowSolver::new(DefinedVariables).solve(&cfg).unwrap();

        let at_join: Vec<_> = res.in_state("j").unwrap().iter().cloned().collect();
        assert_eq!(at_join, ["a", "b", "c"]);
        let out_left: Vec<_> = res.out_state("l").unwrap().iter().cloned().collect();
        assert_eq!(out_left, ["a", "c"]);
    }
}
