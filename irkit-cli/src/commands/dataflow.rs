use std::{collections::BTreeMap, fmt::Display, path::Path};

use irkit::analysis::{
    dataflow::{
        AnalysisResults, ConstantPropagation, DataFlowAnalysis, DataFlowSolver, DefinedVariables,
        LiveVariables, ReachingDefinitions,
    },
    Cfg,
};
use serde::Serialize;

use crate::{
    app::{Analysis, GlobalOptions},
    commands::common::{load_config, load_program, select_functions},
    output::{print_output, Cell, ReportTable},
};

#[derive(Debug, Serialize)]
struct BlockSets {
    #[serde(rename = "in")]
    input: Vec<String>,
    #[serde(rename = "out")]
    output: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DataflowOutput {
    function: String,
    analysis: String,
    iterations: usize,
    blocks: BTreeMap<String, BlockSets>,
}

pub fn run(
    path: &Path,
    analysis: Analysis,
    function: Option<&str>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let program = load_program(path)?;
    let limit = load_config(opts)?.max_dataflow_iterations_per_block;

    let mut outputs = Vec::new();
    for f in select_functions(&program, function)? {
        let cfg = Cfg::from_function(f)?;
        let output = match analysis {
            Analysis::Defined => solve(&cfg, DefinedVariables, limit, |s| render(s))?,
            Analysis::Live => solve(&cfg, LiveVariables, limit, |s| render(s))?,
            Analysis::Reaching => solve(&cfg, ReachingDefinitions, limit, |s| render(s))?,
            Analysis::Constants => solve(&cfg, ConstantPropagation, limit, |m| {
                m.iter().map(|(var, value)| format!("{var}={value}")).collect()
            })?,
        };
        outputs.push(DataflowOutput {
            function: f.name.clone(),
            analysis: format!("{analysis:?}").to_lowercase(),
            iterations: output.0,
            blocks: output.1,
        });
    }

    print_output(&outputs, opts, |outputs| {
        for output in outputs {
            print_text(output);
        }
    })
}

fn render<T: Display>(set: &std::collections::BTreeSet<T>) -> Vec<String> {
    set.iter().map(ToString::to_string).collect()
}

fn solve<A: DataFlowAnalysis>(
    cfg: &Cfg,
    analysis: A,
    limit: usize,
    show: impl Fn(&A::Lattice) -> Vec<String>,
) -> anyhow::Result<(usize, BTreeMap<String, BlockSets>)> {
    let results: AnalysisResults<A::Lattice> = DataFlowSolver::new(analysis)
        .with_max_iterations_per_block(limit)
        .solve(cfg)?;
    let mut blocks = BTreeMap::new();
    for name in cfg.names() {
        let (Some(input), Some(output)) = (results.in_state(name), results.out_state(name)) else {
            continue;
        };
        blocks.insert(
            name.to_string(),
            BlockSets {
                input: show(input),
                output: show(output),
            },
        );
    }
    Ok((results.iterations(), blocks))
}

fn print_text(output: &DataflowOutput) {
    println!(
        "{} for @{} ({} iterations)",
        output.analysis, output.function, output.iterations
    );
    let mut table = ReportTable::new(&["BLOCK", "IN", "OUT"]);
    for (name, sets) in &output.blocks {
        table.row([
            Cell::from(name.as_str()),
            Cell::names(sets.input.iter().map(String::as_str)),
            Cell::names(sets.output.iter().map(String::as_str)),
        ]);
    }
    table.print();
    println!();
}
