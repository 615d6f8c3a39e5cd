//! Local value numbering.
//!
//! Numbers the values computed in each block on its own, then uses the table to
//! fold constants, propagate copies and replace recomputations of an available
//! expression with a copy of the variable that already holds it.
//!
//! # Example
//!
//! Before:
//! ```text
//! a: int = const 4;
//! b: int = const 2;
//! s1: int = add a b;
//! s2: int = add b a;
//! p: int = mul s1 s2;
//! ```
//!
//! After:
//! ```text
//! a: int = const 4;
//! b: int = const 2;
//! s1: int = const 6;
//! s2: int = const 6;
//! p: int = const 36;
//! ```
//!
//! Outside SSA form a variable may be written twice in a block. A write whose value
//! is overwritten later in the same block gets a fresh name, so the value stays
//! available to the instructions in between.

use std::collections::HashMap;

use crate::{
    analysis::{ssa::NameGenerator, BasicBlock, Cfg},
    compiler::{
        pass::FunctionPass,
        passes::valuetable::{number_instruction, Rewrites, ValueTable},
        CompilerContext, EventKind,
    },
    Result,
};

/// Per-block value numbering.
pub struct LocalValueNumberingPass;

impl Default for LocalValueNumberingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalValueNumberingPass {
    /// Creates a new LVN pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn number_block(block: &mut BasicBlock, names: &mut NameGenerator, rewrites: &mut Rewrites) {
        rewrites.block.clone_from(&block.name);
        let mut table = ValueTable::new();
        let mut renamed: HashMap<String, String> = HashMap::new();

        for i in 0..block.instrs.len() {
            let (head, tail) = block.instrs.split_at_mut(i + 1);
            let instr = &mut head[i];

            if instr.is_phi() {
                if let Some(dest) = instr.dest() {
                    let num = table.push_opaque(dest);
                    table.bind(dest, num);
                }
                continue;
            }

            for arg in instr.args_mut() {
                if let Some(fresh) = renamed.get(arg.as_str()) {
                    arg.clone_from(fresh);
                }
            }

            if let Some(dest) = instr.dest_mut() {
                let overwritten = tail.iter().any(|later| later.dest() == Some(dest.as_str()));
                if overwritten {
                    let fresh = names.fresh(dest);
                    rewrites.record(EventKind::Info, format!("renamed overwritten {dest} to {fresh}"));
                    renamed.insert(dest.clone(), fresh.clone());
                    *dest = fresh;
                } else {
                    renamed.remove(dest.as_str());
                }
            }

            number_instruction(&mut table, instr, rewrites);
        }
    }
}

impl FunctionPass for LocalValueNumberingPass {
    fn name(&self) -> &'static str {
        "lvn"
    }

    fn description(&self) -> &'static str {
        "Folds constants and reuses available expressions within each block"
    }

    fn run_on_function(&self, cfg: &mut Cfg, ctx: &CompilerContext) -> Result<bool> {
        let mut names = NameGenerator::for_cfg(cfg);
        let mut rewrites = Rewrites::new(cfg.name(), self.name());

        for block in cfg.blocks_mut() {
            Self::number_block(block, &mut names, &mut rewrites);
        }

        let changed = rewrites.count() > 0;
        if changed {
            ctx.events.merge(&rewrites.events);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::OptimizerConfig,
        ir::{FunctionBuilder, Literal, Opcode, Type},
    };

    fn run(cfg: &mut Cfg) -> bool {
        let ctx = CompilerContext::new(OptimizerConfig::default());
        LocalValueNumberingPass::new().run_on_function(cfg, &ctx).unwrap()
    }

    fn body(cfg: &Cfg) -> Vec<String> {
        cfg.entry().instrs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_folds_and_reuses() {
        let f = FunctionBuilder::new("main")
            .constant("a", Type::Int, Literal::Int(4))
            .constant("b", Type::Int, Literal::Int(2))
            .op(Opcode::Add, "s1", Type::Int, ["a", "b"])
            .op(Opcode::Add, "s2", Type::Int, ["b", "a"])
            .op(Opcode::Mul, "p", Type::Int, ["s1", "s2"])
            .print(["p"])
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();

        assert!(run(&mut cfg));
        assert_eq!(
            body(&cfg),
            [
                "a: int = const 4;",
                "b: int = const 2;",
                "s1: int = const 6;",
                "s2: int = const 6;",
                "p: int = const 36;",
                "print p;",
                "ret;",
            ]
        );
        assert!(!run(&mut cfg));
    }

    #[test]
    fn test_reuses_unknown_expression() {
        let f = FunctionBuilder::new("f")
            .param("x", Type::Int)
            .param("y", Type::Int)
            .op(Opcode::Mul, "a", Type::Int, ["x", "y"])
            .op(Opcode::Mul, "b", Type::Int, ["y", "x"])
            .op(Opcode::Id, "c", Type::Int, ["b"])
            .print(["c"])
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();

        assert!(run(&mut cfg));
        assert_eq!(body(&cfg)[1], "b: int = id a;");
        assert_eq!(body(&cfg)[2], "c: int = id a;");
        assert_eq!(body(&cfg)[3], "print a;");
    }

    #[test]
    fn test_overwritten_variable_renamed() {
        let f = FunctionBuilder::new("f")
            .param("x", Type::Int)
            .op(Opcode::Add, "a", Type::Int, ["x", "x"])
            .op(Opcode::Mul, "a", Type::Int, ["a", "a"])
            .op(Opcode::Add, "b", Type::Int, ["x", "x"])
            .print(["a", "b"])
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();

        assert!(run(&mut cfg));
        assert_eq!(
            body(&cfg),
            [
                "a.0: int = add x x;",
                "a: int = mul a.0 a.0;",
                "b: int = id a.0;",
                "print a a.0;",
                "ret;",
            ]
        );
    }

    #[test]
    fn test_copies_propagated_into_calls() {
        let f = FunctionBuilder::new("f")
            .param("x", Type::Int)
            .param("y", Type::Int)
            .op(Opcode::Id, "a", Type::Int, ["x"])
            .call(None, "g", ["a"])
            .op(Opcode::Id, "b", Type::Int, ["y"])
            .print(["a", "b"])
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();
        run(&mut cfg);
        let lines = body(&cfg);
        assert_eq!(lines[0], "a: int = id x;");
        assert_eq!(lines[1], "call @g x;");
        assert_eq!(lines[3], "print x y;");
    }

    #[test]
    fn test_clobbered_value_not_reused() {
        let f = FunctionBuilder::new("f")
            .param("x", Type::Int)
            .op(Opcode::Id, "a", Type::Int, ["x"])
            .constant("x", Type::Int, Literal::Int(1))
            .print(["a", "x"])
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();
        run(&mut cfg);
        assert_eq!(body(&cfg)[2], "print a x;");
        assert!(!run(&mut cfg));
    }
}
