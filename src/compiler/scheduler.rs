//! Pass scheduler.
//!
//! The `PassScheduler` runs an ordered list of [`FunctionPass`]es over every
//! function of a [`CompilerContext`]. For each function the whole list is repeated
//! until a round changes nothing; functions are independent and may be processed in
//! parallel.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::{
    analysis::Cfg,
    compiler::{context::CompilerContext, pass::FunctionPass, EventKind},
    Error, Result,
};

/// Runs passes to a per-function fixpoint.
pub struct PassScheduler {
    /// Maximum rounds over the pass list, per function.
    max_iterations: usize,
    /// The passes, in execution order.
    passes: Vec<Box<dyn FunctionPass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(16)
    }
}

impl PassScheduler {
    /// Creates an empty scheduler.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Rounds allowed per function before giving up with
    ///   [`Error::NonConvergence`].
    #[must_use]
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            passes: Vec::new(),
        }
    }

    /// Appends a pass.
    #[must_use]
    pub fn with_pass(mut self, pass: impl FunctionPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Returns the pass names in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Returns `true` if no pass is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Runs every pass once over `cfg`. Returns `true` if any pass made changes.
    fn run_passes_once(&self, cfg: &mut Cfg, ctx: &CompilerContext) -> Result<bool> {
        let mut changed = false;
        for pass in &self.passes {
            if pass.run_on_function(cfg, ctx)? {
                log::trace!("{} changed '{}'", pass.name(), cfg.name());
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Repeats the pass list over `cfg` until nothing changes.
    ///
    /// Returns the number of rounds run, including the final unchanged one.
    ///
    /// # Errors
    ///
    /// Returns the first pass error, or [`Error::NonConvergence`] if the function
    /// still changes after `max_iterations` rounds.
    pub fn run_on_function(&self, cfg: &mut Cfg, ctx: &CompilerContext) -> Result<usize> {
        for round in 1..=self.max_iterations {
            if !self.run_passes_once(cfg, ctx)? {
                return Ok(round);
            }
        }
        Err(Error::NonConvergence {
            analysis: "pass scheduler",
            iterations: self.max_iterations,
        })
    }

    /// Runs the pipeline over every function in `ctx`.
    ///
    /// Failing functions are recorded in the context and do not stop the others.
    /// Returns the largest number of rounds any function needed.
    pub fn run(&self, ctx: &CompilerContext) -> usize {
        if self.passes.is_empty() {
            return 0;
        }

        for pass in &self.passes {
            ctx.events
                .record(EventKind::PassStarted)
                .pass(pass.name())
                .message(pass.description());
        }

        let rounds = AtomicUsize::new(0);
        let process = |name: &String| {
            let Some(mut cfg) = ctx.take(name) else {
                return;
            };
            match self.run_on_function(&mut cfg, ctx) {
                Ok(n) => {
                    rounds.fetch_max(n, Ordering::Relaxed);
                    ctx.put(cfg);
                }
                Err(error) => ctx.fail(name, error.in_function(name.as_str())),
            }
        };

        let names = ctx.function_names();
        if ctx.config.parallel {
            names.par_iter().for_each(process);
        } else {
            names.iter().for_each(process);
        }

        let rounds = rounds.load(Ordering::Relaxed);
        for pass in &self.passes {
            ctx.events
                .record(EventKind::PassCompleted)
                .pass(pass.name())
                .message(format!("{rounds} rounds"));
        }
        log::debug!("pass pipeline {:?} settled after {rounds} rounds", self.pass_names());
        rounds
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::{
        compiler::OptimizerConfig,
        ir::{FunctionBuilder, Type},
    };

    /// Reports a change on its first `budget` calls.
    struct Countdown {
        name: &'static str,
        budget: AtomicUsize,
    }

    impl Countdown {
        fn new(name: &'static str, budget: usize) -> Self {
            Self {
                name,
                budget: AtomicUsize::new(budget),
            }
        }
    }

    impl FunctionPass for Countdown {
        fn name(&self) -> &'static str {
            self.name
        }

        fn run_on_function(&self, cfg: &mut Cfg, ctx: &CompilerContext) -> Result<bool> {
            let left = self.budget.load(Ordering::Relaxed);
            if left == 0 {
                return Ok(false);
            }
            self.budget.store(left - 1, Ordering::Relaxed);
            ctx.events.record(EventKind::Info).function(cfg.name()).message("tick");
            Ok(true)
        }
    }

    fn context() -> CompilerContext {
        let ctx = CompilerContext::new(OptimizerConfig {
            parallel: false,
            ..OptimizerConfig::default()
        });
        let f = FunctionBuilder::new("f").param("x", Type::Int).ret(Some("x")).build();
        ctx.insert(Cfg::from_function(&f).unwrap());
        ctx
    }

    #[test]
    fn test_runs_to_fixpoint() {
        let ctx = context();
        let scheduler = PassScheduler::new(10).with_pass(Countdown::new("tick", 3));
        assert_eq!(scheduler.run(&ctx), 4);
        assert_eq!(ctx.events.count_kind(EventKind::Info), 3);
        assert_eq!(ctx.events.count_kind(EventKind::PassCompleted), 1);
    }

    #[test]
    fn test_non_convergence_fails_function() {
        let ctx = context();
        let scheduler = PassScheduler::new(2).with_pass(Countdown::new("tick", 100));
        scheduler.run(&ctx);
        assert!(ctx.is_failed("f"));
        let (_, failures, _) = ctx.into_parts();
        let Error::FunctionFailed { source, .. } = &failures[0].1 else {
            panic!("expected a wrapped failure");
        };
        assert!(matches!(**source, Error::NonConvergence { iterations: 2, .. }));
    }

    #[test]
    fn test_pass_names() {
        let scheduler = PassScheduler::default()
            .with_pass(Countdown::new("pass1", 0))
            .with_pass(Countdown::new("pass2", 0));
        assert_eq!(scheduler.pass_names(), ["pass1", "pass2"]);
        assert!(!PassScheduler::default().pass_names().contains(&"pass1"));
    }
}
