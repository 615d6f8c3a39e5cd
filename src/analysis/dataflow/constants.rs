//! Constant propagation.
//!
//! Forward analysis over maps from variable name to [`ConstValue`]. A `const`
//! assignment records its literal; every other write records
//! [`ConstValue::Unknown`]. Where predecessors disagree the merge yields `Unknown`;
//! a variable absent on one side keeps the other side's value.

use std::{collections::BTreeMap, fmt};

use crate::{
    analysis::{
        dataflow::{DataFlowAnalysis, Direction},
        BasicBlock, Cfg,
    },
    ir::{InstrKind, Literal},
};

/// The abstract value of one variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    /// The variable holds this literal on every path seen so far
    Known(Literal),
    /// The variable may hold different or non-constant values
    Unknown,
}

impl ConstValue {
    /// Returns the literal if the value is known.
    #[must_use]
    pub fn literal(&self) -> Option<&Literal> {
        match self {
            ConstValue::Known(lit) => Some(lit),
            ConstValue::Unknown => None,
        }
    }

    fn join(&self, other: &Self) -> Self {
        if self == other {
            *self
        } else {
            ConstValue::Unknown
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Known(lit) => write!(f, "{lit}"),
            ConstValue::Unknown => f.write_str("?"),
        }
    }
}

/// Map from variable name to its abstract value.
pub type ConstMap = BTreeMap<String, ConstValue>;

/// Forward constant propagation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantPropagation;

impl DataFlowAnalysis for ConstantPropagation {
    type Lattice = ConstMap;
    const DIRECTION: Direction = Direction::Forward;
    const NAME: &'static str = "constant propagation";

    fn boundary(&self, cfg: &Cfg) -> Self::Lattice {
        cfg.params()
            .iter()
            .map(|p| (p.name.clone(), ConstValue::Unknown))
            .collect()
    }

    fn initial(&self, _cfg: &Cfg) -> Self::Lattice {
        ConstMap::new()
    }

    fn merge(&self, values: &[Self::Lattice]) -> Self::Lattice {
        let mut merged = ConstMap::new();
        for map in values {
            for (var, value) in map {
                merged
                    .entry(var.clone())
                    .and_modify(|existing: &mut ConstValue| *existing = existing.join(value))
                    .or_insert(*value);
            }
        }
        merged
    }

    fn transfer(&self, block: &BasicBlock, input: &Self::Lattice) -> Self::Lattice {
        let mut out = input.clone();
        for instr in &block.instrs {
            match &instr.kind {
                InstrKind::Const { dest, value, .. } => {
                    out.insert(dest.clone(), ConstValue::Known(*value));
                }
                InstrKind::Value { dest, .. } => {
                    out.insert(dest.clone(), ConstValue::Unknown);
                }
                InstrKind::Effect { .. } | InstrKind::Label { .. } => {}
            }
        }
        out
    }
}
