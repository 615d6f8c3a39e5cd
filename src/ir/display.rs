//! Textual form of the IR.
//!
//! ```text
//! @main(n: int): int {
//!   one: int = const 1;
//! .loop:
//!   n: int = sub n one;
//!   br c .loop .done;
//! }
//! ```

use std::fmt;

use crate::ir::{Function, InstrKind, Instruction, Program};

fn write_operands(
    f: &mut fmt::Formatter<'_>,
    funcs: &[String],
    args: &[String],
    labels: &[String],
) -> fmt::Result {
    for func in funcs {
        write!(f, " @{func}")?;
    }
    for arg in args {
        write!(f, " {arg}")?;
    }
    for label in labels {
        write!(f, " .{label}")?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            InstrKind::Label { name } => write!(f, ".{name}:"),
            InstrKind::Const { dest, ty, value } => write!(f, "{dest}: {ty} = const {value};"),
            InstrKind::Value {
                op,
                dest,
                ty,
                args,
                funcs,
                labels,
            } => {
                write!(f, "{dest}: {ty} = {op}")?;
                write_operands(f, funcs, args, labels)?;
                write!(f, ";")
            }
            InstrKind::Effect {
                op,
                args,
                funcs,
                labels,
            } => {
                write!(f, "{op}")?;
                write_operands(f, funcs, args, labels)?;
                write!(f, ";")
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty))
                .collect();
            write!(f, "({})", params.join(", "))?;
        }
        if let Some(ty) = &self.return_type {
            write!(f, ": {ty}")?;
        }
        writeln!(f, " {{")?;
        for instr in &self.instrs {
            if instr.is_label() {
                writeln!(f, "{instr}")?;
            } else {
                writeln!(f, "  {instr}")?;
            }
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{function}")?;
        }
        Ok(())
    }
}
