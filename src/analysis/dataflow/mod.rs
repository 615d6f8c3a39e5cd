//! Dataflow analysis framework.
//!
//! A generic worklist solver over the blocks of a [`Cfg`](crate::analysis::Cfg),
//! parameterized by a [`DataFlowAnalysis`]: a direction, a finite-height lattice,
//! a boundary value, a merge and a per-block transfer function.
//!
//! # Analyses Provided
//!
//! - [`DefinedVariables`]: variables assigned on some path from the entry
//! - [`LiveVariables`]: variables read before being overwritten on some path
//! - [`ReachingDefinitions`]: definitions that may reach each program point
//! - [`ConstantPropagation`]: per-variable literal values, `?` where paths disagree
//!
//! # Example
//!
//! ```rust
//! use irkit::prelude::*;
//!
//! let f = FunctionBuilder::new("f")
//!     .param("n", Type::Int)
//!     .op(Opcode::Add, "m", Type::Int, ["n", "n"])
//!     .print(["m"])
//!     .build();
//! let cfg = Cfg::from_function(&f)?;
//!
//! let live = DataFlowSolver::new(LiveVariables).solve(&cfg)?;
//! let entry = &cfg.entry().name;
//! assert!(live.in_state(entry).unwrap().contains("n"));
//! # Ok::<(), irkit::Error>(())
//! ```

mod constants;
mod defined;
mod framework;
mod liveness;
mod reaching;
mod solver;

pub use constants::{ConstMap, ConstValue, ConstantPropagation};
pub use defined::DefinedVariables;
pub use framework::{AnalysisResults, DataFlowAnalysis, Direction};
pub use liveness::LiveVariables;
pub use reaching::{DefSite, Definition, ReachingDefinitions};
pub use solver::{DataFlowSolver, DEFAULT_MAX_ITERATIONS_PER_BLOCK};
