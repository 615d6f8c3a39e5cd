//! Program analysis over the IR.
//!
//! The analysis module turns a flat [`crate::ir::Function`] into the structures the
//! optimizer works on, built on the dense graphs of [`crate::utils::graph`]:
//!
//! - [`cfg`] - basic blocks, the control-flow graph and its normalization
//! - [`dominance`] - dominator sets, the dominator tree and dominance frontiers
//! - [`dataflow`] - a generic worklist solver and the classic analyses on top of it
//! - [`ssa`] - conversion into and out of static single assignment form
//!
//! # Usage
//!
//! ```rust
//! use irkit::analysis::{
//!     dataflow::{DataFlowSolver, LiveVariables},
//!     Cfg, Dominance,
//! };
//! use irkit::ir::{FunctionBuilder, Opcode, Type};
//!
//! let f = FunctionBuilder::new("f")
//!     .param("x", Type::Int)
//!     .op(Opcode::Add, "y", Type::Int, ["x", "x"])
//!     .print(["y"])
//!     .build();
//! let cfg = Cfg::from_function(&f)?;
//!
//! let dom = Dominance::compute(&cfg)?;
//! assert_eq!(dom.entry(), "f_0");
//!
//! let live = DataFlowSolver::new(LiveVariables).solve(&cfg)?;
//! assert!(live.in_state("f_0").unwrap().contains("x"));
//! # Ok::<(), irkit::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;
pub mod dominance;
pub mod ssa;

pub use cfg::{BasicBlock, Cfg, CfgBuilder};
pub use dominance::Dominance;
