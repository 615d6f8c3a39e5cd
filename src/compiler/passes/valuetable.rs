//! The value table shared by local and global value numbering.
//!
//! Every value the numbering has seen gets a row: the canonical expression that
//! computes it, the canonical variable that holds it, and its constant if known.
//! Variables map to rows, so two variables with the same row number hold the same
//! value.
//!
//! Rows can be scoped. [`ValueTable::checkpoint`] remembers the current depth and
//! [`ValueTable::rollback`] forgets everything added since, which lets global
//! value numbering reuse one table while walking the dominator tree.

use std::collections::HashMap;

use crate::{
    compiler::{passes::fold, EventKind, EventLog},
    ir::{InstrKind, Instruction, Literal, Opcode, Type},
};

/// The value-identity of a computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A literal
    Const(Literal),
    /// A pure operation over value numbers, commutative operands sorted
    Op(Opcode, Vec<usize>),
    /// A phi in a given block over (predecessor, value number) pairs
    Phi(String, Vec<(String, usize)>),
}

impl Expr {
    /// Builds the canonical expression of `op` applied to `args`.
    #[must_use]
    pub fn op(op: Opcode, mut args: Vec<usize>) -> Self {
        if op.is_commutative() {
            args.sort_unstable();
        }
        Expr::Op(op, args)
    }
}

/// One value.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// How the value is computed, `None` for opaque values (inputs, calls, loads)
    pub expr: Option<Expr>,
    /// The variable that first held the value
    pub var: String,
    /// The value, if it is a compile-time constant
    pub constant: Option<Literal>,
}

#[derive(Debug)]
enum Undo {
    Var(String, Option<usize>),
    Expr(Expr, Option<usize>),
}

/// A position to roll a [`ValueTable`] back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    rows: usize,
    journal: usize,
}

/// Rows, the expression index and the variable bindings.
#[derive(Debug, Default)]
pub struct ValueTable {
    rows: Vec<Row>,
    exprs: HashMap<Expr, usize>,
    vars: HashMap<String, usize>,
    journal: Vec<Undo>,
}

impl ValueTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a row.
    #[must_use]
    pub fn row(&self, num: usize) -> Option<&Row> {
        self.rows.get(num)
    }

    /// Returns the value number of `var`.
    #[must_use]
    pub fn number_of(&self, var: &str) -> Option<usize> {
        self.vars.get(var).copied()
    }

    /// Returns the value number of `var`, adding an opaque row if it has none.
    pub fn number_or_input(&mut self, var: &str) -> usize {
        match self.number_of(var) {
            Some(num) => num,
            None => {
                let num = self.push_opaque(var);
                self.bind(var, num);
                num
            }
        }
    }

    /// Returns the row computing `expr`, if its value is still held by a variable.
    #[must_use]
    pub fn lookup(&self, expr: &Expr) -> Option<usize> {
        self.exprs.get(expr).copied().filter(|&num| self.holds(num))
    }

    /// Returns the constant of a row.
    #[must_use]
    pub fn constant(&self, num: usize) -> Option<Literal> {
        self.rows.get(num).and_then(|r| r.constant)
    }

    /// Returns `true` if the canonical variable of `num` still holds its value.
    ///
    /// Always true in SSA form. Outside SSA a later write to the variable clobbers it.
    #[must_use]
    pub fn holds(&self, num: usize) -> bool {
        self.rows
            .get(num)
            .is_some_and(|row| self.vars.get(&row.var) == Some(&num))
    }

    /// Returns the canonical variable of `num`, if it still holds the value.
    #[must_use]
    pub fn canonical(&self, num: usize) -> Option<&str> {
        if self.holds(num) {
            self.rows.get(num).map(|r| r.var.as_str())
        } else {
            None
        }
    }

    /// Adds a row for a value nothing is known about.
    pub fn push_opaque(&mut self, var: &str) -> usize {
        self.rows.push(Row {
            expr: None,
            var: var.to_string(),
            constant: None,
        });
        self.rows.len() - 1
    }

    /// Adds a row computing `expr`, held by `var`.
    ///
    /// A constant row is indexed under its literal as well, so a later `const` of
    /// the same value finds it.
    pub fn push(&mut self, expr: Expr, var: &str, constant: Option<Literal>) -> usize {
        self.rows.push(Row {
            expr: Some(expr.clone()),
            var: var.to_string(),
            constant,
        });
        let num = self.rows.len() - 1;
        self.index(expr, num);
        if let Some(lit) = constant {
            let key = Expr::Const(lit);
            if self.lookup(&key).is_none() {
                self.index(key, num);
            }
        }
        num
    }

    /// Makes `expr` resolve to `num`.
    pub fn index(&mut self, expr: Expr, num: usize) {
        let previous = self.exprs.insert(expr.clone(), num);
        self.journal.push(Undo::Expr(expr, previous));
    }

    /// Makes `var` hold value `num`.
    pub fn bind(&mut self, var: &str, num: usize) {
        let previous = self.vars.insert(var.to_string(), num);
        self.journal.push(Undo::Var(var.to_string(), previous));
    }

    /// Remembers the current state.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            rows: self.rows.len(),
            journal: self.journal.len(),
        }
    }

    /// Forgets every row, binding and index entry added after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.journal {
            match self.journal.pop() {
                Some(Undo::Var(var, Some(num))) => {
                    self.vars.insert(var, num);
                }
                Some(Undo::Var(var, None)) => {
                    self.vars.remove(&var);
                }
                Some(Undo::Expr(expr, Some(num))) => {
                    self.exprs.insert(expr, num);
                }
                Some(Undo::Expr(expr, None)) => {
                    self.exprs.remove(&expr);
                }
                None => break,
            }
        }
        self.rows.truncate(checkpoint.rows);
    }
}

/// Collects the rewrites of one pass run.
pub(crate) struct Rewrites {
    pub(crate) events: EventLog,
    function: String,
    pass: &'static str,
    pub(crate) block: String,
    count: usize,
}

impl Rewrites {
    pub(crate) fn new(function: impl Into<String>, pass: &'static str) -> Self {
        Self {
            events: EventLog::new(),
            function: function.into(),
            pass,
            block: String::new(),
            count: 0,
        }
    }

    pub(crate) fn record(&mut self, kind: EventKind, message: String) {
        self.count += 1;
        self.events
            .record(kind)
            .function(self.function.as_str())
            .block(self.block.as_str())
            .pass(self.pass)
            .message(message);
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }
}

/// Replaces each argument by the canonical variable of its value.
pub(crate) fn canonicalize_args(table: &mut ValueTable, instr: &mut Instruction, rewrites: &mut Rewrites) {
    for arg in instr.args_mut() {
        let num = table.number_or_input(arg);
        if let Some(canonical) = table.canonical(num) {
            if canonical != arg.as_str() {
                rewrites.record(EventKind::CopyPropagated, format!("{arg} -> {canonical}"));
                *arg = canonical.to_string();
            }
        }
    }
}

/// Rewrites `instr` to `dest = const lit`.
pub(crate) fn to_const(instr: &mut Instruction, dest: &str, ty: &Type, lit: Literal) {
    instr.rewrite(InstrKind::Const {
        dest: dest.to_string(),
        ty: ty.clone(),
        value: lit,
    });
}

/// Rewrites `instr` to `dest = id src`.
pub(crate) fn to_copy(instr: &mut Instruction, dest: &str, ty: &Type, src: &str) {
    instr.rewrite(InstrKind::Value {
        op: Opcode::Id,
        dest: dest.to_string(),
        ty: ty.clone(),
        args: vec![src.to_string()],
        funcs: Vec::new(),
        labels: Vec::new(),
    });
}

/// Numbers one non-phi instruction, rewriting it when its value is already known.
pub(crate) fn number_instruction(table: &mut ValueTable, instr: &mut Instruction, rewrites: &mut Rewrites) {
    if instr.is_label() || instr.is_phi() {
        return;
    }
    canonicalize_args(table, instr, rewrites);

    let (dest, ty) = match (instr.dest(), instr.ty()) {
        (Some(dest), Some(ty)) => (dest.to_string(), ty.clone()),
        _ => return,
    };

    let num = match &instr.kind {
        InstrKind::Const { value, .. } => match table.lookup(&Expr::Const(*value)) {
            Some(num) => num,
            None => table.push(Expr::Const(*value), &dest, Some(*value)),
        },
        InstrKind::Value { op: Opcode::Id, args, .. } if args.len() == 1 => {
            let num = table.number_or_input(&args[0]);
            if let Some(lit) = table.constant(num) {
                rewrites.record(EventKind::ConstantFolded, format!("{dest} = {lit}"));
                to_const(instr, &dest, &ty, lit);
            }
            num
        }
        InstrKind::Value { op, args, .. } if op.is_pure() && *op != Opcode::Undef => {
            let op = *op;
            let nums: Vec<usize> = args.iter().map(|a| table.number_or_input(a)).collect();
            let expr = Expr::op(op, nums.clone());

            if let Some(num) = table.lookup(&expr) {
                match (table.constant(num), table.canonical(num)) {
                    (Some(lit), _) => {
                        rewrites.record(EventKind::ConstantFolded, format!("{dest} = {lit}"));
                        to_const(instr, &dest, &ty, lit);
                    }
                    (None, Some(canonical)) => {
                        let canonical = canonical.to_string();
                        rewrites.record(EventKind::ExpressionReused, format!("{dest} = id {canonical}"));
                        to_copy(instr, &dest, &ty, &canonical);
                    }
                    (None, None) => {}
                }
                num
            } else {
                let constants: Vec<Option<Literal>> = nums.iter().map(|&n| table.constant(n)).collect();
                let same = nums.len() == 2 && nums[0] == nums[1];
                match fold(op, &constants, same) {
                    Some(lit) => {
                        rewrites.record(EventKind::ConstantFolded, format!("{dest} = {lit}"));
                        to_const(instr, &dest, &ty, lit);
                        match table.lookup(&Expr::Const(lit)) {
                            Some(num) => {
                                table.index(expr, num);
                                num
                            }
                            None => table.push(expr, &dest, Some(lit)),
                        }
                    }
                    None => table.push(expr, &dest, None),
                }
            }
        }
        _ => table.push_opaque(&dest),
    };

    table.bind(&dest, num);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commutative_canonical() {
        assert_eq!(Expr::op(Opcode::Add, vec![3, 1]), Expr::op(Opcode::Add, vec![1, 3]));
        assert_ne!(Expr::op(Opcode::Sub, vec![3, 1]), Expr::op(Opcode::Sub, vec![1, 3]));
    }

    #[test]
    fn test_rollback_restores_bindings() {
        let mut table = ValueTable::new();
        let a = table.number_or_input("a");
        let outer = table.push(Expr::op(Opcode::Not, vec![a]), "b", None);
        table.bind("b", outer);

        let mark = table.checkpoint();
        let inner = table.push(Expr::op(Opcode::Add, vec![a, a]), "c", None);
        table.bind("c", inner);
        table.bind("b", inner);
        assert_eq!(table.lookup(&Expr::op(Opcode::Add, vec![a, a])), Some(inner));
        assert!(!table.holds(outer));

        table.rollback(mark);
        assert_eq!(table.len(), 2);
        assert_eq!(table.number_of("b"), Some(outer));
        assert_eq!(table.number_of("c"), None);
        assert!(table.holds(outer));
        assert_eq!(table.lookup(&Expr::op(Opcode::Add, vec![a, a])), None);
    }

    #[test]
    fn test_clobbered_rows_not_canonical() {
        let mut table = ValueTable::new();
        let x = table.number_or_input("x");
        assert_eq!(table.canonical(x), Some("x"));
        let five = table.push(Expr::Const(Literal::Int(5)), "x", Some(Literal::Int(5)));
        table.bind("x", five);
        assert_eq!(table.canonical(x), None);
        assert_eq!(table.lookup(&Expr::Const(Literal::Int(5))), Some(five));
    }

    #[test]
    fn test_number_instruction_folds() {
        let mut table = ValueTable::new();
        let mut rewrites = Rewrites::new("f", "test");
        let mut instrs = vec![
            Instruction::constant("a", Type::Int, Literal::Int(2)),
            Instruction::constant("b", Type::Int, Literal::Int(3)),
            Instruction::value(Opcode::Add, "c", Type::Int, ["a", "b"]),
            Instruction::value(Opcode::Add, "d", Type::Int, ["b", "a"]),
            Instruction::constant("e", Type::Int, Literal::Int(5)),
        ];
        for instr in &mut instrs {
            number_instruction(&mut table, instr, &mut rewrites);
        }
        assert_eq!(instrs[2].to_string(), "c: int = const 5;");
        assert_eq!(instrs[3].to_string(), "d: int = const 5;");
        assert_eq!(table.number_of("e"), table.number_of("c"));
        assert_eq!(rewrites.count(), 2);
    }
}
