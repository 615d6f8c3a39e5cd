//! Opcodes and their static properties.
//!
//! Every optimization decision that depends only on *which* operation an instruction
//! performs (can it be removed when unused, may its operands be reordered, can it be
//! evaluated at compile time, does it end a block) is answered by [`Opcode::flags`].
//! Passes never match on individual opcodes to answer these questions, which keeps the
//! opcode table the single place to extend.

use bitflags::bitflags;
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Static properties of an [`Opcode`].
    pub struct OpFlags: u8 {
        /// The opcode may produce a value (`dest: type = op ...`)
        const VALUE = 0x01;
        /// The opcode may appear without a destination
        const EFFECT = 0x02;
        /// The opcode ends a basic block
        const TERMINATOR = 0x04;
        /// Evaluation has no side effects; an unused result can be deleted
        const PURE = 0x08;
        /// The two operands may be swapped without changing the result
        const COMMUTATIVE = 0x10;
        /// The result can be computed at compile time from constant operands
        const FOLDABLE = 0x20;
    }
}

/// All operations of the IR.
///
/// The textual (and JSON) name of each opcode is its lowercase variant name.
///
/// ```rust
/// use irkit::ir::Opcode;
///
/// let op: Opcode = "ptradd".parse().unwrap();
/// assert_eq!(op, Opcode::PtrAdd);
/// assert_eq!(Opcode::Add.to_string(), "add");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    Display,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    // Integer arithmetic
    /// Integer addition, wrapping on overflow
    Add,
    /// Integer subtraction, wrapping on overflow
    Sub,
    /// Integer multiplication, wrapping on overflow
    Mul,
    /// Integer division; division by zero is not folded
    Div,
    // Comparison
    /// Equality of two values
    Eq,
    /// Inequality of two values
    Ne,
    /// Integer less-than
    Lt,
    /// Integer greater-than
    Gt,
    /// Integer less-or-equal
    Le,
    /// Integer greater-or-equal
    Ge,
    // Logic
    /// Boolean negation
    Not,
    /// Boolean conjunction
    And,
    /// Boolean disjunction
    Or,
    // Core
    /// Copy of a single variable
    Id,
    /// Literal constant
    Const,
    /// Call of a user function or intrinsic, with or without a result
    Call,
    /// SSA merge selecting an argument by incoming label
    Phi,
    /// A value that is never read on any executed path
    Undef,
    /// Unconditional jump to one label
    Jmp,
    /// Two-way branch on a boolean
    Br,
    /// Return, optionally with a value
    Ret,
    /// Print the arguments on one line
    Print,
    /// Does nothing
    Nop,
    // Memory
    /// Allocate `n` elements and return a pointer
    Alloc,
    /// Release an allocation
    Free,
    /// Read through a pointer
    Load,
    /// Write through a pointer
    Store,
    /// Pointer plus integer offset
    PtrAdd,
    // Floating point
    /// Float addition
    Fadd,
    /// Float subtraction
    Fsub,
    /// Float multiplication
    Fmul,
    /// Float division
    Fdiv,
    /// Float equality
    Feq,
    /// Float less-than
    Flt,
    /// Float less-or-equal
    Fle,
    /// Float greater-than
    Fgt,
    /// Float greater-or-equal
    Fge,
}

impl Opcode {
    /// Returns the static properties of this opcode.
    #[must_use]
    pub const fn flags(self) -> OpFlags {
        const PURE_VALUE: OpFlags = OpFlags::VALUE.union(OpFlags::PURE);
        const FOLD: OpFlags = PURE_VALUE.union(OpFlags::FOLDABLE);
        const FOLD_COMM: OpFlags = FOLD.union(OpFlags::COMMUTATIVE);

        match self {
            Opcode::Add | Opcode::Mul | Opcode::Eq | Opcode::Ne | Opcode::And | Opcode::Or => {
                FOLD_COMM
            }
            Opcode::Sub
            | Opcode::Div
            | Opcode::Lt
            | Opcode::Gt
            | Opcode::Le
            | Opcode::Ge
            | Opcode::Not => FOLD,
            Opcode::Fadd | Opcode::Fmul | Opcode::Feq => PURE_VALUE.union(OpFlags::COMMUTATIVE),
            Opcode::Fsub
            | Opcode::Fdiv
            | Opcode::Flt
            | Opcode::Fle
            | Opcode::Fgt
            | Opcode::Fge
            | Opcode::Id
            | Opcode::Const
            | Opcode::Phi
            | Opcode::Undef
            | Opcode::PtrAdd => PURE_VALUE,
            Opcode::Call => OpFlags::VALUE.union(OpFlags::EFFECT),
            Opcode::Alloc | Opcode::Load => OpFlags::VALUE,
            Opcode::Jmp | Opcode::Br | Opcode::Ret => OpFlags::EFFECT.union(OpFlags::TERMINATOR),
            Opcode::Print | Opcode::Nop | Opcode::Free | Opcode::Store => OpFlags::EFFECT,
        }
    }

    /// Returns `true` if the opcode can produce a value.
    #[must_use]
    pub const fn is_value(self) -> bool {
        self.flags().contains(OpFlags::VALUE)
    }

    /// Returns `true` if the opcode can be used without a destination.
    #[must_use]
    pub const fn is_effect(self) -> bool {
        self.flags().contains(OpFlags::EFFECT)
    }

    /// Returns `true` for `jmp`, `br` and `ret`.
    #[must_use]
    pub const fn is_terminator(self) -> bool {
        self.flags().contains(OpFlags::TERMINATOR)
    }

    /// Returns `true` if removing an unused instance cannot change program behavior.
    #[must_use]
    pub const fn is_pure(self) -> bool {
        self.flags().contains(OpFlags::PURE)
    }

    /// Returns `true` if operand order does not matter.
    #[must_use]
    pub const fn is_commutative(self) -> bool {
        self.flags().contains(OpFlags::COMMUTATIVE)
    }

    /// Returns `true` if constant operands can be folded at compile time.
    #[must_use]
    pub const fn is_foldable(self) -> bool {
        self.flags().contains(OpFlags::FOLDABLE)
    }

    /// Returns the fixed number of `args`, or `None` when the count varies.
    #[must_use]
    pub const fn arity(self) -> Option<usize> {
        match self {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Lt
            | Opcode::Gt
            | Opcode::Le
            | Opcode::Ge
            | Opcode::And
            | Opcode::Or
            | Opcode::Fadd
            | Opcode::Fsub
            | Opcode::Fmul
            | Opcode::Fdiv
            | Opcode::Feq
            | Opcode::Flt
            | Opcode::Fle
            | Opcode::Fgt
            | Opcode::Fge
            | Opcode::Store
            | Opcode::PtrAdd => Some(2),
            Opcode::Not | Opcode::Id | Opcode::Br | Opcode::Alloc | Opcode::Load | Opcode::Free => {
                Some(1)
            }
            Opcode::Const | Opcode::Undef | Opcode::Jmp | Opcode::Nop => Some(0),
            Opcode::Call | Opcode::Phi | Opcode::Ret | Opcode::Print => None,
        }
    }

    /// Returns the fixed number of `labels`, or `None` when it follows `args` (phi).
    #[must_use]
    pub const fn label_count(self) -> Option<usize> {
        match self {
            Opcode::Jmp => Some(1),
            Opcode::Br => Some(2),
            Opcode::Phi => None,
            _ => Some(0),
        }
    }
}
