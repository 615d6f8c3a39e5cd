//! Static Single Assignment form.
//!
//! [`to_ssa`] rewrites a CFG so that every variable is written exactly once, merging
//! values at control-flow joins with `phi` instructions. [`from_ssa`] replaces the
//! phis with ordinary copies so the result can be interpreted or register
//! allocated.
//!
//! # Naming
//!
//! Every definition of `x` becomes `x.<n>` with a per-variable counter, skipping
//! names already used in the function. Parameters keep their names until they are
//! reassigned. A read of `x` along a path where `x` was never written flows into
//! phis from an explicit `x.undef.<n> = undef`.
//!
//! # Usage
//!
//! ```rust
//! use irkit::analysis::{ssa, Cfg};
//! use irkit::ir::{FunctionBuilder, Literal, Opcode, Type};
//!
//! let f = FunctionBuilder::new("count")
//!     .constant("i", Type::Int, Literal::Int(0))
//!     .constant("n", Type::Int, Literal::Int(3))
//!     .constant("one", Type::Int, Literal::Int(1))
//!     .label("head")
//!     .op(Opcode::Lt, "c", Type::Bool, ["i", "n"])
//!     .br("c", "body", "done")
//!     .label("body")
//!     .op(Opcode::Add, "i", Type::Int, ["i", "one"])
//!     .jmp("head")
//!     .label("done")
//!     .print(["i"])
//!     .build();
//!
//! let ssa = ssa::to_ssa(Cfg::from_function(&f)?)?;
//! assert!(ssa.block("head")?.phi_count() > 0);
//!
//! let plain = ssa::from_ssa(ssa)?;
//! assert!(plain.blocks().iter().all(|b| b.phi_count() == 0));
//! # Ok::<(), irkit::Error>(())
//! ```
//!
//! # References
//!
//! - Cytron et al., "Efficiently Computing Static Single Assignment Form and the
//!   Control Dependence Graph", ACM TOPLAS 1991
//! - Boissinot et al., "Revisiting Out-of-SSA Translation for Correctness, Code
//!   Quality, and Efficiency", CGO 2009

mod builder;
mod destruct;

use std::collections::{HashMap, HashSet};

pub use builder::SsaBuilder;
pub use destruct::SsaDestructor;

use crate::{analysis::Cfg, Result};

/// Converts `cfg` to SSA form.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if `cfg` already contains phis.
pub fn to_ssa(cfg: Cfg) -> Result<Cfg> {
    SsaBuilder::new(cfg).build()
}

/// Replaces every phi of `cfg` by copies in the predecessors.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if a phi names a block that is not a
/// predecessor.
pub fn from_ssa(cfg: Cfg) -> Result<Cfg> {
    SsaDestructor::new(cfg).build()
}

/// Hands out `<base>.<n>` names that do not clash with anything in the function.
#[derive(Debug, Default)]
pub(crate) struct NameGenerator {
    taken: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl NameGenerator {
    /// Reserves every parameter and destination name of `cfg`.
    pub(crate) fn for_cfg(cfg: &Cfg) -> Self {
        let mut taken: HashSet<String> = cfg.params().iter().map(|p| p.name.clone()).collect();
        for block in cfg.blocks() {
            for instr in &block.instrs {
                taken.extend(instr.dest().map(str::to_string));
                taken.extend(instr.args().iter().cloned());
            }
        }
        Self {
            taken,
            counters: HashMap::new(),
        }
    }

    /// Returns a fresh name derived from `base`.
    pub(crate) fn fresh(&mut self, base: &str) -> String {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        loop {
            let candidate = format!("{base}.{counter}");
            *counter += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_generator_counts_per_base() {
        let mut names = NameGenerator::default();
        assert_eq!(names.fresh("x"), "x.0");
        assert_eq!(names.fresh("y"), "y.0");
        assert_eq!(names.fresh("x"), "x.1");
    }

    #[test]
    fn test_name_generator_skips_taken() {
        let mut names = NameGenerator::default();
        names.taken.insert("t.0".into());
        names.taken.insert("t.1".into());
        assert_eq!(names.fresh("t"), "t.2");
    }
}
