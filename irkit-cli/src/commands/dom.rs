use std::{collections::BTreeMap, path::Path};

use irkit::analysis::{Cfg, Dominance};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_program, select_functions},
    output::{print_output, Cell, ReportTable},
};

#[derive(Debug, Serialize)]
struct DomBlockOutput {
    dominators: Vec<String>,
    idom: Option<String>,
    children: Vec<String>,
    frontier: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DomOutput {
    function: String,
    entry: String,
    blocks: BTreeMap<String, DomBlockOutput>,
}

pub fn run(path: &Path, function: Option<&str>, opts: &GlobalOptions) -> anyhow::Result<()> {
    let program = load_program(path)?;

    let mut outputs = Vec::new();
    for f in select_functions(&program, function)? {
        let cfg = Cfg::from_function(f)?;
        let dom = Dominance::compute(&cfg)?;
        outputs.push(dom_output(&cfg, &dom));
    }

    print_output(&outputs, opts, |outputs| {
        for output in outputs {
            print_text(output);
        }
    })
}

fn dom_output(cfg: &Cfg, dom: &Dominance) -> DomOutput {
    let to_strings = |names: Vec<&str>| names.into_iter().map(str::to_string).collect();
    let blocks = dom
        .blocks()
        .map(|b| {
            (
                b.to_string(),
                DomBlockOutput {
                    dominators: to_strings(dom.dominators(b)),
                    idom: dom.immediate_dominator(b).map(str::to_string),
                    children: to_strings(dom.children(b)),
                    frontier: to_strings(dom.frontier(b)),
                },
            )
        })
        .collect();
    DomOutput {
        function: cfg.name().to_string(),
        entry: dom.entry().to_string(),
        blocks,
    }
}

fn print_text(output: &DomOutput) {
    println!("Dominance for @{} (entry {})", output.function, output.entry);
    let mut table = ReportTable::new(&["BLOCK", "IDOM", "DOMINATORS", "CHILDREN", "FRONTIER"]);
    for (name, block) in &output.blocks {
        table.row([
            Cell::from(name.as_str()),
            Cell::from(block.idom.clone()),
            Cell::Names(block.dominators.clone()),
            Cell::Names(block.children.clone()),
            Cell::Names(block.frontier.clone()),
        ]);
    }
    table.print();
    println!();
}
