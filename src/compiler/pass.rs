//! The interface every function-level transformation implements.

use crate::{analysis::Cfg, compiler::CompilerContext, Result};

/// A transformation of one function's CFG.
///
/// Passes are stateless: per-run data lives on the stack of
/// [`run_on_function`](FunctionPass::run_on_function), shared data in the
/// [`CompilerContext`]. The scheduler may call the same pass on different functions
/// from several threads at once.
pub trait FunctionPass: Send + Sync {
    /// A short, unique, kebab-case name used in events and logs.
    fn name(&self) -> &'static str;

    /// A one-line description.
    fn description(&self) -> &'static str {
        ""
    }

    /// Whether the pass is only sound on SSA input.
    fn requires_ssa(&self) -> bool {
        false
    }

    /// Transforms `cfg` in place. Returns `true` if anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the CFG is malformed or an inner fixpoint does not settle.
    fn run_on_function(&self, cfg: &mut Cfg, ctx: &CompilerContext) -> Result<bool>;
}
