//! Instructions.
//!
//! An [`Instruction`] is an [`InstrKind`] plus traceability metadata. The kind is an
//! explicit sum type, so every pass matches exhaustively instead of probing which
//! fields happen to be present.

use serde::{Deserialize, Serialize};

use crate::{
    ir::{Literal, Opcode, Type},
    Result,
};

/// A source position, used by editors to highlight the origin of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 1-based source line
    pub row: u32,
    /// 1-based source column
    pub col: u32,
}

/// The operation an instruction performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstrKind {
    /// `dest: ty = const value`
    Const {
        /// Destination variable
        dest: String,
        /// Declared type
        ty: Type,
        /// The constant
        value: Literal,
    },
    /// `dest: ty = op @funcs args .labels`
    Value {
        /// Operation
        op: Opcode,
        /// Destination variable
        dest: String,
        /// Result type
        ty: Type,
        /// Operand variables
        args: Vec<String>,
        /// Called function (for `call`)
        funcs: Vec<String>,
        /// Incoming blocks (for `phi`, parallel to `args`)
        labels: Vec<String>,
    },
    /// `op @funcs args .labels`
    Effect {
        /// Operation
        op: Opcode,
        /// Operand variables
        args: Vec<String>,
        /// Called function (for `call`)
        funcs: Vec<String>,
        /// Branch targets (for `jmp` and `br`)
        labels: Vec<String>,
    },
    /// `.name:`
    Label {
        /// Label name
        name: String,
    },
}

/// A single IR instruction.
///
/// `key` is a sequence number for external traceability. No algorithm looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// The operation
    pub kind: InstrKind,
    /// Optional source position
    pub pos: Option<Position>,
    /// Sequence key
    pub key: u64,
}

impl Instruction {
    /// Wraps a kind with no position and key 0.
    #[must_use]
    pub fn new(kind: InstrKind) -> Self {
        Self {
            kind,
            pos: None,
            key: 0,
        }
    }

    /// `dest: ty = const value`
    #[must_use]
    pub fn constant(dest: impl Into<String>, ty: Type, value: Literal) -> Self {
        Self::new(InstrKind::Const {
            dest: dest.into(),
            ty,
            value,
        })
    }

    /// `dest: ty = op args`
    #[must_use]
    pub fn value<S: Into<String>>(
        op: Opcode,
        dest: impl Into<String>,
        ty: Type,
        args: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(InstrKind::Value {
            op,
            dest: dest.into(),
            ty,
            args: args.into_iter().map(Into::into).collect(),
            funcs: Vec::new(),
            labels: Vec::new(),
        })
    }

    /// `dest: ty = id src`
    #[must_use]
    pub fn id(dest: impl Into<String>, ty: Type, src: impl Into<String>) -> Self {
        Self::value(Opcode::Id, dest, ty, [src.into()])
    }

    /// `dest: ty = undef`
    #[must_use]
    pub fn undef(dest: impl Into<String>, ty: Type) -> Self {
        Self::value(Opcode::Undef, dest, ty, Vec::<String>::new())
    }

    /// `dest: ty = phi args .labels`
    #[must_use]
    pub fn phi(
        dest: impl Into<String>,
        ty: Type,
        args: Vec<String>,
        labels: Vec<String>,
    ) -> Self {
        Self::new(InstrKind::Value {
            op: Opcode::Phi,
            dest: dest.into(),
            ty,
            args,
            funcs: Vec::new(),
            labels,
        })
    }

    /// `op args .labels` without a destination.
    #[must_use]
    pub fn effect<S: Into<String>, L: Into<String>>(
        op: Opcode,
        args: impl IntoIterator<Item = S>,
        labels: impl IntoIterator<Item = L>,
    ) -> Self {
        Self::new(InstrKind::Effect {
            op,
            args: args.into_iter().map(Into::into).collect(),
            funcs: Vec::new(),
            labels: labels.into_iter().map(Into::into).collect(),
        })
    }

    /// `jmp .target`
    #[must_use]
    pub fn jmp(target: impl Into<String>) -> Self {
        Self::effect(Opcode::Jmp, Vec::<String>::new(), [target.into()])
    }

    /// `br cond .then .else`
    #[must_use]
    pub fn br(cond: impl Into<String>, then: impl Into<String>, els: impl Into<String>) -> Self {
        Self::effect(Opcode::Br, [cond.into()], [then.into(), els.into()])
    }

    /// `ret` or `ret value`
    #[must_use]
    pub fn ret(value: Option<String>) -> Self {
        Self::effect(Opcode::Ret, value, Vec::<String>::new())
    }

    /// `.name:`
    #[must_use]
    pub fn label(name: impl Into<String>) -> Self {
        Self::new(InstrKind::Label { name: name.into() })
    }

    /// Sets the sequence key.
    #[must_use]
    pub fn with_key(mut self, key: u64) -> Self {
        self.key = key;
        self
    }

    /// Sets the source position.
    #[must_use]
    pub fn with_pos(mut self, pos: Option<Position>) -> Self {
        self.pos = pos;
        self
    }

    /// Returns the opcode, or `None` for labels.
    #[must_use]
    pub fn op(&self) -> Option<Opcode> {
        match &self.kind {
            InstrKind::Const { .. } => Some(Opcode::Const),
            InstrKind::Value { op, .. } | InstrKind::Effect { op, .. } => Some(*op),
            InstrKind::Label { .. } => None,
        }
    }

    /// Returns the destination variable, if any.
    #[must_use]
    pub fn dest(&self) -> Option<&str> {
        match &self.kind {
            InstrKind::Const { dest, .. } | InstrKind::Value { dest, .. } => Some(dest.as_str()),
            _ => None,
        }
    }

    /// Returns a mutable reference to the destination variable, if any.
    pub fn dest_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            InstrKind::Const { dest, .. } | InstrKind::Value { dest, .. } => Some(dest),
            _ => None,
        }
    }

    /// Returns the declared result type, if any.
    #[must_use]
    pub fn ty(&self) -> Option<&Type> {
        match &self.kind {
            InstrKind::Const { ty, .. } | InstrKind::Value { ty, .. } => Some(ty),
            _ => None,
        }
    }

    /// Returns the operand variables.
    #[must_use]
    pub fn args(&self) -> &[String] {
        match &self.kind {
            InstrKind::Value { args, .. } | InstrKind::Effect { args, .. } => args,
            _ => &[],
        }
    }

    /// Returns the operand variables for in-place renaming.
    pub fn args_mut(&mut self) -> &mut [String] {
        match &mut self.kind {
            InstrKind::Value { args, .. } | InstrKind::Effect { args, .. } => args,
            _ => &mut [],
        }
    }

    /// Returns the called functions.
    #[must_use]
    pub fn funcs(&self) -> &[String] {
        match &self.kind {
            InstrKind::Value { funcs, .. } | InstrKind::Effect { funcs, .. } => funcs,
            _ => &[],
        }
    }

    /// Returns the label operands (branch targets or phi sources).
    #[must_use]
    pub fn labels(&self) -> &[String] {
        match &self.kind {
            InstrKind::Value { labels, .. } | InstrKind::Effect { labels, .. } => labels,
            _ => &[],
        }
    }

    /// Returns the label operands for in-place retargeting.
    pub fn labels_mut(&mut self) -> &mut [String] {
        match &mut self.kind {
            InstrKind::Value { labels, .. } | InstrKind::Effect { labels, .. } => labels,
            _ => &mut [],
        }
    }

    /// Returns the constant value of a `const` instruction.
    #[must_use]
    pub fn literal(&self) -> Option<&Literal> {
        match &self.kind {
            InstrKind::Const { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns `true` for labels.
    #[must_use]
    pub fn is_label(&self) -> bool {
        matches!(self.kind, InstrKind::Label { .. })
    }

    /// Returns `true` for `jmp`, `br` and `ret`.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.op().is_some_and(Opcode::is_terminator)
    }

    /// Returns `true` for phi instructions.
    #[must_use]
    pub fn is_phi(&self) -> bool {
        matches!(self.kind, InstrKind::Value { op: Opcode::Phi, .. })
    }

    /// Returns `true` if the instruction defines a value without side effects.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        match &self.kind {
            InstrKind::Const { .. } => true,
            InstrKind::Value { op, .. } => op.is_pure(),
            _ => false,
        }
    }

    /// Replaces the operation, keeping destination, type, position and key.
    ///
    /// Used by value numbering to turn a computation into a copy or a constant.
    pub fn rewrite(&mut self, kind: InstrKind) {
        self.kind = kind;
    }

    /// Checks opcode role, operand counts and label counts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            InstrKind::Const { .. } => Ok(()),
            InstrKind::Label { name } => {
                if name.is_empty() {
                    return Err(malformed_error!("Empty label name"));
                }
                Ok(())
            }
            InstrKind::Value {
                op,
                dest,
                args,
                funcs,
                labels,
                ..
            } => {
                if !op.is_value() || *op == Opcode::Const {
                    return Err(malformed_error!("'{}' cannot produce a value ({})", op, dest));
                }
                check_operands(*op, args, funcs, labels)
            }
            InstrKind::Effect {
                op,
                args,
                funcs,
                labels,
            } => {
                if !op.is_effect() {
                    return Err(malformed_error!("'{}' requires a destination", op));
                }
                check_operands(*op, args, funcs, labels)?;
                if *op == Opcode::Ret && args.len() > 1 {
                    return Err(malformed_error!("'ret' takes at most one argument"));
                }
                Ok(())
            }
        }
    }
}

fn check_operands(op: Opcode, args: &[String], funcs: &[String], labels: &[String]) -> Result<()> {
    if let Some(expected) = op.arity() {
        if args.len() != expected {
            return Err(malformed_error!(
                "'{}' expects {} argument(s), found {}",
                op,
                expected,
                args.len()
            ));
        }
    }

    match op.label_count() {
        Some(expected) if labels.len() != expected => {
            return Err(malformed_error!(
                "'{}' expects {} label(s), found {}",
                op,
                expected,
                labels.len()
            ));
        }
        None if labels.len() != args.len() || args.is_empty() => {
            return Err(malformed_error!(
                "'{}' has {} argument(s) but {} label(s)",
                op,
                args.len(),
                labels.len()
            ));
        }
        _ => {}
    }

    let expected_funcs = usize::from(op == Opcode::Call);
    if funcs.len() != expected_funcs {
        return Err(malformed_error!(
            "'{}' expects {} function name(s), found {}",
            op,
            expected_funcs,
            funcs.len()
        ));
    }
    Ok(())
}
