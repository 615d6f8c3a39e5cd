//! # irkit Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the irkit library. Import this module to get quick access to the essential
//! types for building, analyzing and optimizing programs.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all irkit operations
pub use crate::Error;

/// The result type used throughout irkit
pub use crate::Result;

// ================================================================================================
// Intermediate Representation
// ================================================================================================

/// Programs, functions and their construction
pub use crate::ir::{Function, FunctionBuilder, Param, Program};

/// Instructions and their operands
pub use crate::ir::{InstrKind, Instruction, Literal, Opcode, Type};

// ================================================================================================
// Analysis
// ================================================================================================

/// Control-flow graphs and dominance
pub use crate::analysis::{BasicBlock, Cfg, CfgBuilder, Dominance};

/// The dataflow framework and the built-in analyses
pub use crate::analysis::dataflow::{
    AnalysisResults, ConstantPropagation, DataFlowAnalysis, DataFlowSolver, DefinedVariables,
    Direction, LiveVariables, ReachingDefinitions,
};

/// SSA conversion
pub use crate::analysis::ssa::{from_ssa, to_ssa};

// ================================================================================================
// Optimization and Register Allocation
// ================================================================================================

/// The whole-program pipeline and its configuration
pub use crate::compiler::{OptimizationReport, Optimizer, OptimizerConfig};

/// Writing and scheduling passes
pub use crate::compiler::{CompilerContext, FunctionPass, PassScheduler};

/// The built-in passes
pub use crate::compiler::{
    DeadCodeEliminationPass, GlobalValueNumberingPass, LocalValueNumberingPass,
};

/// Register allocation
pub use crate::compiler::{allocate_program, AllocationFailure, RegisterAllocation, RegisterAllocator};

/// Event tracking
pub use crate::compiler::{EventKind, EventLog, OptimizationStats};
