//! Constant folding for the foldable opcodes.
//!
//! Integer arithmetic wraps like the interpreter does. Division by zero and
//! `i64::MIN / -1` are left for run time.

use crate::ir::{Literal, Opcode};

/// Evaluates `op` at compile time.
///
/// `args` holds the known constant of each operand (or `None`), and
/// `same_operands` tells whether both operands carry the same value number, which
/// decides comparisons such as `lt x x` even when `x` is unknown. Short-circuiting
/// `and`/`or` fold with a single known operand.
///
/// Returns `None` if `op` is not foldable or the operands are not known enough.
///
/// ```rust
/// use irkit::compiler::passes::fold;
/// use irkit::ir::{Literal, Opcode};
///
/// let two = Some(Literal::Int(2));
/// let three = Some(Literal::Int(3));
/// assert_eq!(fold(Opcode::Add, &[two, three], false), Some(Literal::Int(5)));
/// assert_eq!(fold(Opcode::And, &[None, Some(Literal::Bool(false))], false), Some(Literal::Bool(false)));
/// assert_eq!(fold(Opcode::Le, &[None, None], true), Some(Literal::Bool(true)));
/// ```
#[must_use]
pub fn fold(op: Opcode, args: &[Option<Literal>], same_operands: bool) -> Option<Literal> {
    if !op.is_foldable() {
        return None;
    }

    match op {
        Opcode::Not => match args {
            [Some(Literal::Bool(b))] => Some(Literal::Bool(!b)),
            _ => None,
        },
        Opcode::And => {
            let bools = bool_args(args);
            if bools.contains(&Some(false)) {
                return Some(Literal::Bool(false));
            }
            match bools.as_slice() {
                [Some(a), Some(b)] => Some(Literal::Bool(*a && *b)),
                _ => None,
            }
        }
        Opcode::Or => {
            let bools = bool_args(args);
            if bools.contains(&Some(true)) {
                return Some(Literal::Bool(true));
            }
            match bools.as_slice() {
                [Some(a), Some(b)] => Some(Literal::Bool(*a || *b)),
                _ => None,
            }
        }
        Opcode::Eq | Opcode::Le | Opcode::Ge if same_operands => Some(Literal::Bool(true)),
        Opcode::Ne | Opcode::Lt | Opcode::Gt if same_operands => Some(Literal::Bool(false)),
        Opcode::Eq | Opcode::Ne => match args {
            [Some(a), Some(b)] if a.ty() == b.ty() => Some(Literal::Bool((a == b) == (op == Opcode::Eq))),
            _ => None,
        },
        _ => {
            let [Some(Literal::Int(a)), Some(Literal::Int(b))] = args else {
                return None;
            };
            let (a, b) = (*a, *b);
            match op {
                Opcode::Add => Some(Literal::Int(a.wrapping_add(b))),
                Opcode::Sub => Some(Literal::Int(a.wrapping_sub(b))),
                Opcode::Mul => Some(Literal::Int(a.wrapping_mul(b))),
                Opcode::Div => a.checked_div(b).map(Literal::Int),
                Opcode::Lt => Some(Literal::Bool(a < b)),
                Opcode::Gt => Some(Literal::Bool(a > b)),
                Opcode::Le => Some(Literal::Bool(a <= b)),
                Opcode::Ge => Some(Literal::Bool(a >= b)),
                _ => None,
            }
        }
    }
}

fn bool_args(args: &[Option<Literal>]) -> Vec<Option<bool>> {
    args.iter()
        .map(|a| match a {
            Some(Literal::Bool(b)) => Some(*b),
            _ => None,
        })
        .collect()
}
