//! Register allocation by graph coloring.
//!
//! For each function of a program:
//!
//! 1. phis are lowered to copies ([`from_ssa`]), since a register machine has none
//! 2. liveness is solved and the [`InterferenceGraph`] built from it
//! 3. non-interfering copies are [coalesced](coalesce), renaming variables in the
//!    program
//! 4. the graph is [colored](color) with the configured register names
//!
//! A function whose graph cannot be simplified gets an [`AllocationFailure`]
//! instead of a [`ColorMap`]. A function with a malformed body is listed in
//! [`RegisterAllocation::errors`] and keeps its body. Other functions are
//! unaffected either way.
//!
//! # Example
//!
//! ```rust
//! use irkit::compiler::allocate_program;
//! use irkit::ir::{FunctionBuilder, Opcode, Program, Type};
//!
//! let f = FunctionBuilder::new("main")
//!     .param("x", Type::Int)
//!     .op(Opcode::Add, "y", Type::Int, ["x", "x"])
//!     .print(["y"])
//!     .build();
//! let program = Program::new(vec![f]);
//!
//! let registers = vec!["r0".to_string(), "r1".to_string()];
//! let allocation = allocate_program(&program, &registers)?;
//! let colors = allocation.colorings["main"].as_ref().unwrap();
//! assert_eq!(colors["x"], "r0");
//! # Ok::<(), irkit::Error>(())
//! ```

mod coalesce;
mod coloring;
mod interference;

use std::collections::BTreeMap;

use rayon::prelude::*;

pub use coalesce::coalesce;
pub use coloring::{color, is_valid_coloring, ColorMap};
pub use interference::InterferenceGraph;

use crate::{
    analysis::{
        dataflow::{DataFlowSolver, LiveVariables},
        ssa::from_ssa,
        Cfg,
    },
    compiler::EventLog,
    ir::{Function, Program},
    Error, Result,
};

/// A function whose interference graph has no node with fewer neighbors than
/// there are registers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not allocate registers for '{function}': {} variables need a spill", .remaining.len())]
pub struct AllocationFailure {
    /// The function
    pub function: String,
    /// The variables left when simplification got stuck
    pub remaining: Vec<String>,
}

/// The allocation of one function.
#[derive(Debug, Clone)]
pub struct FunctionAllocation {
    /// The function after phi lowering and coalescing
    pub function: Function,
    /// The graph after coalescing
    pub graph: InterferenceGraph,
    /// The coloring, or why there is none
    pub coloring: std::result::Result<ColorMap, AllocationFailure>,
}

/// The allocation of a whole program.
#[derive(Debug)]
pub struct RegisterAllocation {
    /// The program after phi lowering and coalescing; colorings refer to its names
    pub program: Program,
    /// Per analyzed function, its coloring or its failure
    pub colorings: BTreeMap<String, std::result::Result<ColorMap, AllocationFailure>>,
    /// Functions that could not be analyzed, in program order; their bodies are
    /// kept unchanged and they have no entry in `colorings`
    pub errors: Vec<(String, Error)>,
    /// Coalescing events
    pub events: EventLog,
}

impl RegisterAllocation {
    /// Returns `true` if every function was colored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.colorings.values().all(std::result::Result::is_ok)
    }

    /// Iterates over the failed functions.
    pub fn failures(&self) -> impl Iterator<Item = &AllocationFailure> {
        self.colorings.values().filter_map(|c| c.as_ref().err())
    }
}

/// Colors the variables of functions with a fixed list of registers.
pub struct RegisterAllocator<'a> {
    registers: &'a [String],
    events: Option<&'a EventLog>,
}

impl<'a> RegisterAllocator<'a> {
    /// Creates an allocator for `registers`, in order of preference.
    #[must_use]
    pub fn new(registers: &'a [String]) -> Self {
        Self {
            registers,
            events: None,
        }
    }

    /// Records coalescing events into `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Allocates registers for `function`.
    ///
    /// # Errors
    ///
    /// Returns an error if the function is malformed. Running out of registers is
    /// not an error; it is reported in [`FunctionAllocation::coloring`].
    pub fn allocate(&self, function: &Function) -> Result<FunctionAllocation> {
        let mut cfg = Cfg::from_function(function)?;
        if cfg.blocks().iter().any(|b| b.phi_count() > 0) {
            cfg = from_ssa(cfg)?;
        }

        let liveness = DataFlowSolver::new(LiveVariables).solve(&cfg)?;
        let mut graph = InterferenceGraph::build(&cfg, &liveness);

        let local = EventLog::new();
        coalesce(&mut cfg, &mut graph, self.events.unwrap_or(&local));

        let coloring = color(&graph, self.registers).map_err(|remaining| AllocationFailure {
            function: function.name.clone(),
            remaining,
        });
        match &coloring {
            Ok(colors) => log::debug!(
                "'{}': {} variables in {} registers",
                function.name,
                colors.len(),
                self.registers.len()
            ),
            Err(failure) => log::warn!("{failure}"),
        }

        Ok(FunctionAllocation {
            function: cfg.into_function(),
            graph,
            coloring,
        })
    }
}

/// Allocates registers for every function of `program`, in parallel.
///
/// A malformed function is reported in [`RegisterAllocation::errors`], wrapped in
/// [`Error::FunctionFailed`]; its siblings are still allocated.
///
/// # Errors
///
/// Returns [`Error::Malformed`] if the program does not link (see
/// [`Program::validate_linkage`]).
pub fn allocate_program(program: &Program, registers: &[String]) -> Result<RegisterAllocation> {
    program.validate_linkage()?;
    let events = EventLog::new();
    let allocator = RegisterAllocator::new(registers).with_events(&events);

    let allocations: Vec<Result<FunctionAllocation>> = program
        .functions
        .par_iter()
        .map(|f| allocator.allocate(f))
        .collect();

    let mut functions = Vec::with_capacity(allocations.len());
    let mut colorings = BTreeMap::new();
    let mut errors = Vec::new();
    for (original, allocation) in program.functions.iter().zip(allocations) {
        match allocation {
            Ok(allocation) => {
                colorings.insert(allocation.function.name.clone(), allocation.coloring);
                functions.push(allocation.function);
            }
            Err(error) => {
                log::warn!("function '{}' not allocated: {error}", original.name);
                errors.push((original.name.clone(), error.in_function(original.name.as_str())));
                functions.push(original.clone());
            }
        }
    }

    Ok(RegisterAllocation {
        program: Program::new(functions),
        colorings,
        errors,
        events,
    })
}
