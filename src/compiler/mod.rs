//! Optimization passes, their scheduling and register allocation.
//!
//! This module sits on top of [`crate::analysis`]:
//!
//! - [`crate::analysis`] builds CFGs, dominator trees, SSA form and dataflow facts
//! - [`compiler`](self) transforms functions with them and colors registers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Optimizer                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  CompilerContext             Shared state of one run             │
//! │    ├─ CFG per function       (taken and put back by workers)     │
//! │    ├─ Failed functions                                           │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  PassScheduler               Per-function fixpoint               │
//! │    └─ lvn → gvn → dce        repeated until a round is quiet     │
//! │                                                                  │
//! │  FunctionPass trait          Interface for all passes            │
//! │                                                                  │
//! │  RegisterAllocator           Liveness → interference →           │
//! │                              coalescing → Kempe coloring         │
//! │                                                                  │
//! │  EventLog                    Change tracking and diagnostics     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod context;
mod events;
mod pass;
pub mod passes;
mod pipeline;
pub mod regalloc;
mod scheduler;

pub use config::{OptimizerConfig, DEFAULT_REGISTERS};
pub use context::CompilerContext;
pub use events::{Event, EventBuilder, EventKind, EventLog, EventLogIter, OptimizationStats};
pub use pass::FunctionPass;
pub use passes::{DeadCodeEliminationPass, GlobalValueNumberingPass, LocalValueNumberingPass};
pub use pipeline::{OptimizationReport, Optimizer};
pub use regalloc::{
    allocate_program, AllocationFailure, ColorMap, FunctionAllocation, InterferenceGraph,
    RegisterAllocation, RegisterAllocator,
};
pub use scheduler::PassScheduler;
