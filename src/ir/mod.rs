//! The IR model.
//!
//! A [`Program`] is an ordered collection of [`Function`]s, each a flat stream of
//! [`Instruction`]s with labels interleaved. This flat form is what parsers produce and
//! what code generators and interpreters consume; the analyses in
//! [`crate::analysis`] convert it to a [`Cfg`](crate::analysis::Cfg) and back.
//!
//! Values are named by strings. Before SSA construction a name may be assigned many
//! times; afterwards every name has exactly one definition.

mod builder;
mod display;
mod function;
mod instruction;
mod json;
mod opcode;
mod types;

pub use builder::FunctionBuilder;
pub use function::{Function, Param, Program, INTRINSICS};
pub use instruction::{InstrKind, Instruction, Position};
pub use opcode::{OpFlags, Opcode};
pub use types::{Literal, Type};
