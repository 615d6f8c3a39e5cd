//! Global value numbering over the dominator tree.
//!
//! Extends local value numbering across blocks. In SSA form a value computed in a
//! block is available in every block it dominates, so one [`ValueTable`] is carried
//! down the dominator tree and rolled back on the way up.
//!
//! Phis get numbers too:
//!
//! - a phi whose operands all carry the same value number is meaningless and becomes
//!   a copy of (or the constant of) that value
//! - a phi computing the same operands from the same predecessors as an earlier phi
//!   of the block is redundant and becomes a copy of it
//!
//! After a block is numbered, the phi operands its successors receive from it are
//! replaced by canonical variables.
//!
//! # Example
//!
//! Before:
//! ```text
//! .entry:
//!   s1: int = add a b;
//!   br c .left .right;
//! .left:
//!   s2: int = add b a;
//!   jmp .join;
//! .right:
//!   jmp .join;
//! .join:
//!   y: int = phi s1 s1 .left .right;
//! ```
//!
//! After:
//! ```text
//! .left:
//!   s2: int = id s1;
//! .join:
//!   y: int = id s1;
//! ```

use crate::{
    analysis::{Cfg, Dominance},
    compiler::{
        pass::FunctionPass,
        passes::valuetable::{
            number_instruction, to_const, to_copy, Checkpoint, Expr, Rewrites, ValueTable,
        },
        CompilerContext, EventKind,
    },
    ir::{InstrKind, Instruction},
    Result,
};

enum Frame {
    Enter(String),
    Exit(Checkpoint),
}

/// Dominator-based value numbering. Requires SSA form.
pub struct GlobalValueNumberingPass;

impl Default for GlobalValueNumberingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalValueNumberingPass {
    /// Creates a new GVN pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Numbers a phi. Returns `true` if it was replaced by a copy or a constant.
    fn number_phi(block: &str, instr: &mut Instruction, table: &mut ValueTable, rewrites: &mut Rewrites) -> bool {
        let InstrKind::Value {
            dest, ty, args, labels, ..
        } = &instr.kind
        else {
            return false;
        };
        let (dest, ty) = (dest.clone(), ty.clone());

        let nums: Option<Vec<usize>> = args.iter().map(|a| table.number_of(a)).collect();
        let Some(nums) = nums else {
            let num = table.push_opaque(&dest);
            table.bind(&dest, num);
            return false;
        };
        let mut incoming: Vec<(String, usize)> = labels.iter().cloned().zip(nums.iter().copied()).collect();
        incoming.sort();

        if let Some(&first) = nums.first() {
            if nums.iter().all(|&n| n == first) {
                if let Some(lit) = table.constant(first) {
                    rewrites.record(EventKind::PhiSimplified, format!("{dest} = {lit}"));
                    to_const(instr, &dest, &ty, lit);
                    table.bind(&dest, first);
                    return true;
                }
                if let Some(canonical) = table.canonical(first) {
                    let canonical = canonical.to_string();
                    rewrites.record(EventKind::PhiSimplified, format!("{dest} = id {canonical}"));
                    to_copy(instr, &dest, &ty, &canonical);
                    table.bind(&dest, first);
                    return true;
                }
            }
        }

        let expr = Expr::Phi(block.to_string(), incoming);
        if let Some(num) = table.lookup(&expr) {
            if let Some(canonical) = table.canonical(num) {
                let canonical = canonical.to_string();
                rewrites.record(EventKind::PhiSimplified, format!("{dest} = id {canonical}"));
                to_copy(instr, &dest, &ty, &canonical);
                table.bind(&dest, num);
                return true;
            }
        }

        let num = table.push(expr, &dest, None);
        table.bind(&dest, num);
        false
    }

    fn number_block(cfg: &mut Cfg, name: &str, table: &mut ValueTable, rewrites: &mut Rewrites) -> Result<()> {
        rewrites.block = name.to_string();
        let block = cfg.block_mut(name)?;
        let phi_count = block.phi_count();

        let mut simplified = false;
        for instr in &mut block.instrs[..phi_count] {
            simplified |= Self::number_phi(name, instr, table, rewrites);
        }
        if simplified {
            // Phis stay a prefix of the block.
            let (phis, copies): (Vec<Instruction>, Vec<Instruction>) =
                block.instrs.drain(..phi_count).partition(Instruction::is_phi);
            block.instrs.splice(0..0, phis.into_iter().chain(copies));
        }

        for instr in &mut block.instrs[phi_count..] {
            number_instruction(table, instr, rewrites);
        }
        Ok(())
    }

    /// Replaces the operands that successors' phis receive from `name` by canonical
    /// variables.
    fn propagate_to_successors(cfg: &mut Cfg, name: &str, table: &ValueTable, rewrites: &mut Rewrites) -> Result<()> {
        let successors: Vec<String> = cfg.successors_of(name).into_iter().map(str::to_string).collect();
        for succ in successors {
            let block = cfg.block_mut(&succ)?;
            for phi in block.instrs.iter_mut().take_while(|i| i.is_phi()) {
                let InstrKind::Value { args, labels, .. } = &mut phi.kind else {
                    continue;
                };
                for (arg, label) in args.iter_mut().zip(labels.iter()) {
                    if label != name {
                        continue;
                    }
                    let canonical = table.number_of(arg).and_then(|num| table.canonical(num));
                    if let Some(canonical) = canonical {
                        if canonical != arg.as_str() {
                            rewrites.record(EventKind::CopyPropagated, format!("{arg} -> {canonical} into {succ}"));
                            *arg = canonical.to_string();
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl FunctionPass for GlobalValueNumberingPass {
    fn name(&self) -> &'static str {
        "gvn"
    }

    fn description(&self) -> &'static str {
        "Eliminates redundant computations and phis along the dominator tree"
    }

    fn requires_ssa(&self) -> bool {
        true
    }

    fn run_on_function(&self, cfg: &mut Cfg, ctx: &CompilerContext) -> Result<bool> {
        let dominance = Dominance::compute(cfg)?;
        let mut table = ValueTable::new();
        let mut rewrites = Rewrites::new(cfg.name(), self.name());

        let params: Vec<String> = cfg.params().iter().map(|p| p.name.clone()).collect();
        for param in &params {
            let num = table.push_opaque(param);
            table.bind(param, num);
        }

        let mut work = vec![Frame::Enter(dominance.entry().to_string())];
        while let Some(frame) = work.pop() {
            match frame {
                Frame::Enter(name) => {
                    let mark = table.checkpoint();
                    Self::number_block(cfg, &name, &mut table, &mut rewrites)?;
                    Self::propagate_to_successors(cfg, &name, &table, &mut rewrites)?;
                    work.push(Frame::Exit(mark));
                    for child in dominance.children(&name).into_iter().rev() {
                        work.push(Frame::Enter(child.to_string()));
                    }
                }
                Frame::Exit(mark) => table.rollback(mark),
            }
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
        ir::{FunctionBuilder, Opcode, Type},
    };

    fn run(cfg: &mut Cfg) -> (bool, CompilerContext) {
        let ctx = CompilerContext::new(OptimizerConfig::default());
        let changed = GlobalValueNumberingPass::new().run_on_function(cfg, &ctx).unwrap();
        (changed, ctx)
    }

    fn lines(cfg: &Cfg, block: &str) -> Vec<String> {
        cfg.block(block).unwrap().instrs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_dominating_expression_reused() {
        let f = FunctionBuilder::new("f")
            .param("a", Type::Int)
            .param("b", Type::Int)
            .param("c", Type::Bool)
            .op(Opcode::Add, "s1", Type::Int, ["a", "b"])
            .br("c", "left", "right")
            .label("left")
            .op(Opcode::Add, "s2", Type::Int, ["b", "a"])
            .print(["s2"])
            .ret(None)
            .label("right")
            .op(Opcode::Mul, "m", Type::Int, ["a", "b"])
            .print(["m"])
            .ret(None)
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();

        let (changed, ctx) = run(&mut cfg);
        assert!(changed);
        assert_eq!(lines(&cfg, "left")[..2], ["s2: int = id s1;", "print s1;"]);
        assert_eq!(lines(&cfg, "right")[0], "m: int = mul a b;");
        assert_eq!(ctx.events.count_kind(EventKind::ExpressionReused), 1);
        assert!(!run(&mut cfg).0);
    }

    #[test]
    fn test_sibling_values_not_shared() {
        let f = FunctionBuilder::new("f")
            .param("a", Type::Int)
            .param("c", Type::Bool)
            .br("c", "left", "right")
            .label("left")
            .op(Opcode::Not, "n1", Type::Bool, ["c"])
            .print(["n1"])
            .ret(None)
            .label("right")
            .op(Opcode::Not, "n2", Type::Bool, ["c"])
            .print(["n2"])
            .ret(None)
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();

        assert!(!run(&mut cfg).0);
        assert_eq!(lines(&cfg, "right")[0], "n2: bool = not c;");
    }

    #[test]
    fn test_meaningless_and_redundant_phis() {
        let f = FunctionBuilder::new("f")
            .param("x", Type::Int)
            .param("w", Type::Int)
            .param("c", Type::Bool)
            .br("c", "left", "right")
            .label("left")
            .jmp("join")
            .label("right")
            .jmp("join")
            .label("join")
            .phi("y", Type::Int, &[("left", "x"), ("right", "x")])
            .phi("z", Type::Int, &[("left", "x"), ("right", "w")])
            .phi("v", Type::Int, &[("right", "w"), ("left", "x")])
            .op(Opcode::Add, "s", Type::Int, ["y", "v"])
            .print(["s"])
            .ret(None)
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();

        let (changed, ctx) = run(&mut cfg);
        assert!(changed);
        assert_eq!(
            lines(&cfg, "join")[..4],
            [
                "z: int = phi x w .left .right;",
                "y: int = id x;",
                "v: int = id z;",
                "s: int = add x z;",
            ]
        );
        assert_eq!(ctx.events.count_kind(EventKind::PhiSimplified), 2);
    }

    #[test]
    fn test_phi_operands_canonicalized() {
        let f = FunctionBuilder::new("f")
            .param("x", Type::Int)
            .param("w", Type::Int)
            .param("c", Type::Bool)
            .label("start")
            .op(Opcode::Id, "a", Type::Int, ["x"])
            .br("c", "join", "other")
            .label("other")
            .jmp("join")
            .label("join")
            .phi("y", Type::Int, &[("start", "a"), ("other", "w")])
            .print(["y"])
            .ret(None)
            .build();
        let mut cfg = Cfg::from_function(&f).unwrap();

        assert!(run(&mut cfg).0);
        assert_eq!(lines(&cfg, "join")[0], "y: int = phi x w .start .other;");
    }

    #[test]
    fn test_requires_ssa() {
        assert!(GlobalValueNumberingPass::new().requires_ssa());
    }
}
