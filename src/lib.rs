// Copyright 2025 The irkit Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # irkit
//!
//! An optimizing middle-end for a small, typed, JSON-serialized intermediate
//! representation. Functions are lists of instructions: constants, value operations,
//! effect operations and labels. `irkit` turns them into control-flow graphs,
//! analyzes them, optimizes them and colors their variables with machine registers.
//!
//! ## Features
//!
//! - **🧱 Control-flow graphs** - Basic block formation, entry and terminator normalization
//! - **🌳 Dominance** - Dominator sets, dominator tree and dominance frontiers
//! - **🔁 Dataflow** - A generic worklist solver with liveness, reaching definitions,
//!   defined variables and constant propagation
//! - **🔀 SSA** - Phi placement on iterated dominance frontiers, renaming, and
//!   out-of-SSA with parallel copies
//! - **⚡ Optimization** - Local and global value numbering, constant folding and
//!   dead code elimination, run to a fixpoint per function, in parallel across functions
//! - **🎨 Register allocation** - Interference graphs, copy coalescing and Kempe coloring
//! - **📊 Event log** - Every transformation is recorded and can be summarized
//!
//! ## Quick Start
//!
//! ```rust
//! use irkit::prelude::*;
//!
//! let json = r#"{
//!   "functions": [{
//!     "name": "main",
//!     "instrs": [
//!       { "op": "const", "dest": "a", "type": "int", "value": 4 },
//!       { "op": "const", "dest": "b", "type": "int", "value": 2 },
//!       { "op": "add", "dest": "c", "type": "int", "args": ["a", "b"] },
//!       { "op": "add", "dest": "d", "type": "int", "args": ["a", "b"] },
//!       { "op": "mul", "dest": "e", "type": "int", "args": ["c", "d"] },
//!       { "op": "print", "args": ["e"] }
//!     ]
//!   }]
//! }"#;
//!
//! let program = Program::from_json(json)?;
//! let report = Optimizer::default().optimize_program(&program)?;
//!
//! assert!(report.is_success());
//! assert!(report.program.to_string().contains("const 36"));
//! println!("{}", report.stats);
//! # Ok::<(), irkit::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - The instruction set, functions and programs, JSON (de)serialization
//! - [`analysis`] - CFG, dominance, dataflow and SSA
//! - [`compiler`] - Passes, the pass scheduler, the optimizer and register allocation
//! - [`prelude`] - Convenient re-exports of the most commonly used types
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Structural problems with the input
//! are reported as [`Error::Malformed`] with the source location that detected them.
//! Inside the [`compiler::Optimizer`] a failure is confined to the function it
//! occurred in; the other functions are still optimized.
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade: `debug` for per-function summaries,
//! `trace` for single passes, `warn` for failed functions. Install any logger (for
//! example `env_logger`) to see them.

#[macro_use]
pub(crate) mod error;

/// Index-based graphs and bit sets shared by the analyses.
pub mod utils;

/// The intermediate representation.
///
/// - [`ir::Program`] - an ordered collection of [`ir::Function`]s
/// - [`ir::Instruction`] - one constant, value operation, effect operation or label
/// - [`ir::FunctionBuilder`] - fluent construction of functions in code and tests
///
/// Programs load from and save to JSON:
///
/// ```rust
/// use irkit::ir::Program;
///
/// let program = Program::from_json(r#"{"functions": [{"name": "main", "instrs": []}]}"#)?;
/// assert!(program.main().is_some());
/// # Ok::<(), irkit::Error>(())
/// ```
pub mod ir;

/// Control-flow, dominance, dataflow and SSA analyses.
pub mod analysis;

/// Optimization passes, scheduling and register allocation.
pub mod compiler;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use irkit::prelude::*;
///
/// let f = FunctionBuilder::new("main").build();
/// let cfg = Cfg::from_function(&f)?;
/// assert_eq!(cfg.len(), 1);
/// # Ok::<(), irkit::Error>(())
/// ```
pub mod prelude;

/// `irkit` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `irkit` Error type
///
/// The main error type for all operations in this crate.
///
/// ```rust
/// use irkit::{Error, Program};
///
/// match Program::from_json("not json") {
///     Err(Error::Json(_)) => {}
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
pub use error::Error;

/// The top-level unit of work. See [`ir::Program`].
pub use ir::Program;
