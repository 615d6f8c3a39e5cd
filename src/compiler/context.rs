//! Shared state of one optimizer run.

use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    analysis::{
        dataflow::{AnalysisResults, DataFlowAnalysis, DataFlowSolver},
        Cfg,
    },
    compiler::{EventKind, EventLog, OptimizerConfig},
    Error, Result,
};

/// Holds the CFG of every function while passes run over them.
///
/// Each function's CFG is owned by exactly one worker at a time: a worker
/// [`take`](Self::take)s it out of the map, transforms it without holding any lock,
/// and [`put`](Self::put)s it back. A function whose pipeline fails is moved to the
/// failure map and skipped from then on.
pub struct CompilerContext {
    /// Events recorded by every pass of this run
    pub events: EventLog,
    /// The configuration of this run
    pub config: OptimizerConfig,
    cfgs: DashMap<String, Cfg>,
    failures: DashMap<String, Error>,
}

impl CompilerContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            events: EventLog::new(),
            config,
            cfgs: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    /// Adds a function's CFG.
    pub fn insert(&self, cfg: Cfg) {
        self.cfgs.insert(cfg.name().to_string(), cfg);
    }

    /// Removes and returns the CFG of `function`.
    #[must_use]
    pub fn take(&self, function: &str) -> Option<Cfg> {
        self.cfgs.remove(function).map(|(_, cfg)| cfg)
    }

    /// Puts a CFG back after a worker is done with it.
    pub fn put(&self, cfg: Cfg) {
        self.insert(cfg);
    }

    /// Returns the names of all functions still in the pipeline, sorted.
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cfgs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns the number of functions still in the pipeline.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cfgs.len()
    }

    /// Returns `true` if no function is in the pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cfgs.is_empty()
    }

    /// Marks `function` as failed; it is skipped by every later stage.
    pub fn fail(&self, function: &str, error: Error) {
        log::warn!("function '{function}' failed: {error}");
        self.events
            .record(EventKind::Error)
            .function(function)
            .message(error.to_string());
        self.cfgs.remove(function);
        self.failures.insert(function.to_string(), error);
    }

    /// Returns `true` if `function` has failed.
    #[must_use]
    pub fn is_failed(&self, function: &str) -> bool {
        self.failures.contains_key(function)
    }

    /// Runs a dataflow analysis with this run's iteration cap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonConvergence`] if the analysis does not settle.
    pub fn solve<A: DataFlowAnalysis>(&self, analysis: A, cfg: &Cfg) -> Result<AnalysisResults<A::Lattice>> {
        DataFlowSolver::new(analysis)
            .with_max_iterations_per_block(self.config.max_dataflow_iterations_per_block)
            .solve(cfg)
    }

    /// Applies `stage` to every function, concurrently if the configuration allows.
    ///
    /// A function whose stage returns an error is marked failed.
    pub fn for_each_function<F>(&self, stage: F)
    where
        F: Fn(Cfg) -> Result<Cfg> + Send + Sync,
    {
        let run = |name: &String| {
            let Some(cfg) = self.take(name) else {
                return;
            };
            match stage(cfg) {
                Ok(cfg) => self.put(cfg),
                Err(error) => self.fail(name, error.in_function(name.as_str())),
            }
        };

        let names = self.function_names();
        if self.config.parallel {
            names.par_iter().for_each(run);
        } else {
            names.iter().for_each(run);
        }
    }

    /// Consumes the context, returning the surviving CFGs and the failures.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Cfg>, Vec<(String, Error)>, EventLog) {
        let mut cfgs: Vec<Cfg> = self.cfgs.into_iter().map(|(_, cfg)| cfg).collect();
        cfgs.sort_by(|a, b| a.name().cmp(b.name()));
        let mut failures: Vec<(String, Error)> = self.failures.into_iter().collect();
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        (cfgs, failures, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, Type};

    fn context() -> CompilerContext {
        let ctx = CompilerContext::new(OptimizerConfig::default());
        for name in ["b", "a"] {
            let f = FunctionBuilder::new(name).param("x", Type::Int).ret(Some("x")).build();
            ctx.insert(Cfg::from_function(&f).unwrap());
        }
        ctx
    }

    #[test]
    fn test_take_and_put() {
        let ctx = context();
        assert_eq!(ctx.function_names(), ["a", "b"]);
        let cfg = ctx.take("a").unwrap();
        assert_eq!(ctx.len(), 1);
        assert!(ctx.take("a").is_none());
        ctx.put(cfg);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_failing_stage_isolated() {
        let ctx = context();
        ctx.for_each_function(|cfg| {
            if cfg.name() == "a" {
                Err(Error::UnknownBlock("nowhere".into()))
            } else {
                Ok(cfg)
            }
        });

        assert!(ctx.is_failed("a"));
        assert!(!ctx.is_failed("b"));
        assert_eq!(ctx.events.count_kind(EventKind::Error), 1);

        let (cfgs, failures, _) = ctx.into_parts();
        assert_eq!(cfgs.len(), 1);
        assert_eq!(failures[0].0, "a");
        assert!(matches!(failures[0].1, Error::FunctionFailed { .. }));
    }
}
