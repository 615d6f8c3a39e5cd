use std::path::Path;

use anyhow::Context;
use irkit::compiler::{OptimizationReport, Optimizer};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_config, load_program},
    output::{Cell, ReportTable},
};

pub struct OptOptions<'a> {
    pub output: Option<&'a Path>,
    pub lvn: bool,
    pub gvn: bool,
    pub dce: bool,
    pub ssa: bool,
    pub max_iterations: Option<usize>,
    pub events: bool,
    pub global: &'a GlobalOptions,
}

#[derive(Debug, Serialize)]
struct FailureOutput {
    function: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct StatsOutput {
    constants_folded: usize,
    values_reused: usize,
    phis_inserted: usize,
    phis_simplified: usize,
    instructions_removed: usize,
    blocks_removed: usize,
    iterations: usize,
    time_ms: u128,
}

#[derive(Debug, Serialize)]
struct OptOutput {
    program: serde_json::Value,
    stats: StatsOutput,
    failures: Vec<FailureOutput>,
}

pub fn run(path: &Path, opts: &OptOptions<'_>) -> anyhow::Result<()> {
    let program = load_program(path)?;

    let mut config = load_config(opts.global)?;
    config.lvn &= opts.lvn;
    config.gvn &= opts.gvn;
    config.dce &= opts.dce;
    config.ssa &= opts.ssa;
    if let Some(max) = opts.max_iterations {
        config.max_pass_iterations = max;
    }

    let report = Optimizer::new(config)
        .optimize_program(&program)
        .with_context(|| format!("failed to optimize {}", path.display()))?;

    if let Some(out) = opts.output {
        std::fs::write(out, report.program.to_json()?)
            .with_context(|| format!("failed to write {}", out.display()))?;
        log::info!("wrote {}", out.display());
    }

    if opts.global.json {
        let output = OptOutput {
            program: serde_json::from_str(&report.program.to_json()?)?,
            stats: stats_output(&report),
            failures: report
                .failures
                .iter()
                .map(|(function, error)| FailureOutput {
                    function: function.clone(),
                    error: error.to_string(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if opts.output.is_none() {
        print!("{}", report.program);
    }
    for (function, error) in &report.failures {
        log::warn!("{function}: {error}");
    }
    if opts.events {
        print_events(&report);
    }
    eprintln!("{}", report.stats);
    Ok(())
}

fn stats_output(report: &OptimizationReport) -> StatsOutput {
    let stats = &report.stats;
    StatsOutput {
        constants_folded: stats.constants_folded,
        values_reused: stats.values_reused,
        phis_inserted: stats.phis_inserted,
        phis_simplified: stats.phis_simplified,
        instructions_removed: stats.instructions_removed,
        blocks_removed: stats.blocks_removed,
        iterations: stats.iterations,
        time_ms: stats.total_time.as_millis(),
    }
}

fn print_events(report: &OptimizationReport) {
    println!();
    println!("Events:");
    let mut table = ReportTable::new(&["KIND", "FUNCTION", "BLOCK", "MESSAGE"]);
    for event in report.events.iter() {
        table.row([
            Cell::from(event.kind.to_string()),
            Cell::from(event.function.clone()),
            Cell::from(event.block.clone()),
            Cell::from(event.message.clone()),
        ]);
    }
    table.print();
}
