//! The whole-program optimization pipeline.

use std::{collections::HashMap, fmt, time::Instant};

use crate::{
    analysis::{
        ssa::{SsaBuilder, SsaDestructor},
        CfgBuilder,
    },
    compiler::{
        allocate_program,
        passes::{DeadCodeEliminationPass, GlobalValueNumberingPass, LocalValueNumberingPass},
        CompilerContext, EventLog, OptimizationStats, OptimizerConfig, PassScheduler,
        RegisterAllocation,
    },
    ir::{Function, Program},
    Error, Result,
};

/// The outcome of [`Optimizer::optimize_program`].
#[derive(Debug)]
pub struct OptimizationReport {
    /// The optimized program, functions in their original order
    pub program: Program,
    /// Every event recorded on the way
    pub events: EventLog,
    /// Functions that failed, with their error; their original bodies are kept
    pub failures: Vec<(String, Error)>,
    /// Aggregate numbers
    pub stats: OptimizationStats,
}

impl OptimizationReport {
    /// Returns `true` if every function was optimized.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stats)?;
        for (function, error) in &self.failures {
            write!(f, "\n  {function}: {error}")?;
        }
        Ok(())
    }
}

/// Runs CFG construction, SSA, the value passes and SSA destruction over a
/// program.
///
/// ```text
/// link check ─► build CFGs ─► to_ssa ─► [lvn ─► gvn ─► dce]* ─► from_ssa ─► flatten
/// ```
///
/// Functions are independent once the program links and are processed concurrently
/// when the configuration allows. A function that fails at any stage, including a
/// malformed body, keeps its original body and is reported in
/// [`OptimizationReport::failures`]; the others continue.
///
/// # Example
///
/// ```rust
/// use irkit::compiler::Optimizer;
/// use irkit::ir::{FunctionBuilder, Literal, Opcode, Program, Type};
///
/// let main = FunctionBuilder::new("main")
///     .constant("a", Type::Int, Literal::Int(2))
///     .constant("b", Type::Int, Literal::Int(3))
///     .op(Opcode::Add, "c", Type::Int, ["a", "b"])
///     .print(["c"])
///     .build();
///
/// let report = Optimizer::default().optimize_program(&Program::new(vec![main]))?;
/// assert!(report.is_success());
/// // the constant, the print and the inserted `ret`
/// assert_eq!(report.program.functions[0].instruction_count(), 3);
/// # Ok::<(), irkit::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    /// Creates an optimizer.
    #[must_use]
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Builds the pass scheduler the configuration asks for.
    ///
    /// GVN is only scheduled when the pipeline runs in SSA form.
    #[must_use]
    pub fn scheduler(&self) -> PassScheduler {
        let mut scheduler = PassScheduler::new(self.config.max_pass_iterations);
        if self.config.lvn {
            scheduler = scheduler.with_pass(LocalValueNumberingPass::new());
        }
        if self.config.gvn && self.config.ssa {
            scheduler = scheduler.with_pass(GlobalValueNumberingPass::new());
        }
        if self.config.dce {
            scheduler = scheduler.with_pass(DeadCodeEliminationPass::new());
        }
        scheduler
    }

    /// Optimizes every function of `program`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the program does not link (see
    /// [`Program::validate_linkage`]). Failures of single functions are reported
    /// in the result instead.
    pub fn optimize_program(&self, program: &Program) -> Result<OptimizationReport> {
        let start = Instant::now();
        program.validate_linkage()?;

        let ctx = CompilerContext::new(self.config.clone());
        for function in &program.functions {
            match CfgBuilder::new(function).with_events(&ctx.events).build() {
                Ok(cfg) => ctx.insert(cfg),
                Err(error) => ctx.fail(&function.name, error.in_function(function.name.as_str())),
            }
        }

        if self.config.ssa {
            ctx.for_each_function(|cfg| SsaBuilder::new(cfg).with_events(&ctx.events).build());
        }

        let scheduler = self.scheduler();
        let rounds = scheduler.run(&ctx);

        if self.config.ssa {
            ctx.for_each_function(|cfg| SsaDestructor::new(cfg).with_events(&ctx.events).build());
        }

        let (cfgs, failures, events) = ctx.into_parts();
        let mut optimized: HashMap<String, Function> = cfgs
            .into_iter()
            .map(|cfg| (cfg.name().to_string(), cfg.into_function()))
            .collect();
        let functions = program
            .functions
            .iter()
            .map(|f| optimized.remove(&f.name).unwrap_or_else(|| f.clone()))
            .collect();

        let stats = OptimizationStats::from_log(&events)
            .with_iterations(rounds)
            .with_time(start.elapsed());
        log::debug!("optimized {} functions: {stats}", program.functions.len());

        Ok(OptimizationReport {
            program: Program::new(functions),
            events,
            failures,
            stats,
        })
    }

    /// Optimizes a single function.
    ///
    /// # Errors
    ///
    /// Returns the function's failure, wrapped in [`Error::FunctionFailed`].
    pub fn optimize_function(&self, function: &Function) -> Result<Function> {
        let program = Program::new(vec![function.clone()]);
        let mut report = self.optimize_program(&program)?;
        if let Some((_, error)) = report.failures.pop() {
            return Err(error);
        }
        report
            .program
            .functions
            .pop()
            .ok_or_else(|| Error::FunctionNotFound(function.name.clone()))
    }

    /// Allocates registers for `program` with the configured register names.
    ///
    /// # Errors
    ///
    /// Returns an error if the program does not link.
    pub fn allocate(&self, program: &Program) -> Result<RegisterAllocation> {
        allocate_program(program, &self.config.registers)
    }
}
