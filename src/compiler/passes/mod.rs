//! The built-in function passes.
//!
//! | Pass | Name | Form |
//! |---|---|---|
//! | [`LocalValueNumberingPass`] | `lvn` | any |
//! | [`GlobalValueNumberingPass`] | `gvn` | SSA only |
//! | [`DeadCodeEliminationPass`] | `dce` | any |
//!
//! LVN and GVN share the [`ValueTable`] and the constant folding table in
//! [`fold`]. They rewrite instructions into copies and constants but never delete
//! anything; the leftovers are removed by DCE, which is why the scheduler runs the
//! three to a joint fixpoint.

mod dce;
mod folding;
mod gvn;
mod lvn;
mod valuetable;

pub use dce::DeadCodeEliminationPass;
pub use folding::fold;
pub use gvn::GlobalValueNumberingPass;
pub use lvn::LocalValueNumberingPass;
pub use valuetable::{Checkpoint, Expr, Row, ValueTable};
