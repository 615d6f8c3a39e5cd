use std::path::Path;

use irkit::analysis::Cfg;
use serde::Serialize;

use crate::{
    app::GraphFormat,
    commands::common::{load_program, select_functions},
    output::{Cell, ReportTable},
};

#[derive(Debug, Serialize)]
struct CfgBlockOutput {
    name: String,
    instruction_count: usize,
    predecessors: Vec<String>,
    successors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CfgOutput {
    function: String,
    entry: String,
    block_count: usize,
    blocks: Vec<CfgBlockOutput>,
}

pub fn run(path: &Path, function: Option<&str>, format: GraphFormat) -> anyhow::Result<()> {
    let program = load_program(path)?;

    let mut cfgs = Vec::new();
    for f in select_functions(&program, function)? {
        cfgs.push(Cfg::from_function(f)?);
    }

    match format {
        GraphFormat::Json => {
            let output: Vec<CfgOutput> = cfgs.iter().map(cfg_output).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        GraphFormat::Dot => {
            for cfg in &cfgs {
                println!("{}", cfg.to_dot());
            }
        }
        GraphFormat::Text => {
            for cfg in &cfgs {
                print_text(cfg);
            }
        }
    }
    Ok(())
}

fn cfg_output(cfg: &Cfg) -> CfgOutput {
    let to_strings = |names: Vec<&str>| names.into_iter().map(str::to_string).collect();
    CfgOutput {
        function: cfg.name().to_string(),
        entry: cfg.entry().name.clone(),
        block_count: cfg.len(),
        blocks: cfg
            .blocks()
            .iter()
            .map(|b| CfgBlockOutput {
                name: b.name.clone(),
                instruction_count: b.instrs.len(),
                predecessors: to_strings(cfg.predecessors_of(&b.name)),
                successors: to_strings(b.successors()),
            })
            .collect(),
    }
}

fn print_text(cfg: &Cfg) {
    println!("CFG for @{}", cfg.name());
    println!("  Blocks: {}", cfg.len());
    println!("  Entry:  {}", cfg.entry().name);
    println!();

    let mut table = ReportTable::new(&["BLOCK", "INSTRS", "PREDS", "SUCCS"]);
    for block in cfg.blocks() {
        table.row([
            Cell::from(block.name.as_str()),
            Cell::from(block.instrs.len()),
            Cell::names(cfg.predecessors_of(&block.name)),
            Cell::names(block.successors()),
        ]);
    }
    table.print();
    println!();
}
