//! Fluent construction of functions.
//!
//! ```rust
//! use irkit::ir::{FunctionBuilder, Opcode, Type};
//!
//! let f = FunctionBuilder::new("double")
//!     .param("x", Type::Int)
//!     .returns(Type::Int)
//!     .op(Opcode::Add, "y", Type::Int, ["x", "x"])
//!     .ret(Some("y"))
//!     .build();
//! assert_eq!(f.instrs.len(), 2);
//! ```

use crate::ir::{Function, InstrKind, Instruction, Literal, Opcode, Param, Type};

/// Builds a [`Function`] instruction by instruction.
///
/// Instructions receive consecutive sequence keys starting at 1.
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    function: Function,
}

impl FunctionBuilder {
    /// Starts a function named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            function: Function::new(name),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.function.params.push(Param::new(name, ty));
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, ty: Type) -> Self {
        self.function.return_type = Some(ty);
        self
    }

    /// Appends an arbitrary instruction.
    #[must_use]
    pub fn instr(mut self, instr: Instruction) -> Self {
        let key = self.function.instrs.len() as u64 + 1;
        self.function.instrs.push(instr.with_key(key));
        self
    }

    /// Appends `dest: ty = const value`.
    #[must_use]
    pub fn constant(self, dest: &str, ty: Type, value: impl Into<Literal>) -> Self {
        self.instr(Instruction::constant(dest, ty, value.into()))
    }

    /// Appends `dest: ty = op args`.
    #[must_use]
    pub fn op<const N: usize>(self, op: Opcode, dest: &str, ty: Type, args: [&str; N]) -> Self {
        self.instr(Instruction::value(op, dest, ty, args))
    }

    /// Appends `dest: ty = phi args .labels` from `(label, arg)` pairs.
    #[must_use]
    pub fn phi(self, dest: &str, ty: Type, incoming: &[(&str, &str)]) -> Self {
        let labels = incoming.iter().map(|(l, _)| (*l).to_string()).collect();
        let args = incoming.iter().map(|(_, a)| (*a).to_string()).collect();
        self.instr(Instruction::phi(dest, ty, args, labels))
    }

    /// Appends a call, with a destination when `dest` is given.
    #[must_use]
    pub fn call<const N: usize>(self, dest: Option<(&str, Type)>, func: &str, args: [&str; N]) -> Self {
        let args = args.iter().map(|a| (*a).to_string()).collect();
        let funcs = vec![func.to_string()];
        let kind = match dest {
            Some((dest, ty)) => InstrKind::Value {
                op: Opcode::Call,
                dest: dest.to_string(),
                ty,
                args,
                funcs,
                labels: Vec::new(),
            },
            None => InstrKind::Effect {
                op: Opcode::Call,
                args,
                funcs,
                labels: Vec::new(),
            },
        };
        self.instr(Instruction::new(kind))
    }

    /// Appends `print args`.
    #[must_use]
    pub fn print<const N: usize>(self, args: [&str; N]) -> Self {
        self.instr(Instruction::effect(Opcode::Print, args, Vec::<String>::new()))
    }

    /// Appends `.name:`.
    #[must_use]
    pub fn label(self, name: &str) -> Self {
        self.instr(Instruction::label(name))
    }

    /// Appends `jmp .target`.
    #[must_use]
    pub fn jmp(self, target: &str) -> Self {
        self.instr(Instruction::jmp(target))
    }

    /// Appends `br cond .then .els`.
    #[must_use]
    pub fn br(self, cond: &str, then: &str, els: &str) -> Self {
        self.instr(Instruction::br(cond, then, els))
    }

    /// Appends `ret` or `ret value`.
    #[must_use]
    pub fn ret(self, value: Option<&str>) -> Self {
        self.instr(Instruction::ret(value.map(str::to_string)))
    }

    /// Finishes the function.
    #[must_use]
    pub fn build(self) -> Function {
        self.function
    }
}
