use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use irkit::compiler::{allocate_program, Optimizer};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_config, load_program},
    output::{print_output, Cell, ReportTable},
};

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ColoringOutput {
    Colored(BTreeMap<String, String>),
    Failed { error: String, remaining: Vec<String> },
}

pub fn run(
    path: &Path,
    registers: Option<&[String]>,
    optimize: bool,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let mut program = load_program(path)?;
    let config = load_config(opts)?;
    let registers = registers.map_or_else(|| config.registers.clone(), <[String]>::to_vec);

    if optimize {
        let report = Optimizer::new(config)
            .optimize_program(&program)
            .with_context(|| format!("failed to optimize {}", path.display()))?;
        for (function, error) in &report.failures {
            log::warn!("{function}: {error}");
        }
        program = report.program;
    }

    let allocation = allocate_program(&program, &registers)?;
    let mut output: BTreeMap<String, ColoringOutput> = allocation
        .colorings
        .iter()
        .map(|(function, coloring)| {
            let entry = match coloring {
                Ok(colors) => ColoringOutput::Colored(colors.clone()),
                Err(failure) => ColoringOutput::Failed {
                    error: failure.to_string(),
                    remaining: failure.remaining.clone(),
                },
            };
            (function.clone(), entry)
        })
        .collect();
    for (function, error) in &allocation.errors {
        output.insert(
            function.clone(),
            ColoringOutput::Failed {
                error: error.to_string(),
                remaining: Vec::new(),
            },
        );
    }

    print_output(&output, opts, |output| {
        for (function, coloring) in output {
            println!("@{function}");
            match coloring {
                ColoringOutput::Colored(colors) => {
                    let mut table = ReportTable::new(&["VARIABLE", "REGISTER"]);
                    for (var, reg) in colors {
                        table.row([Cell::from(var.as_str()), Cell::from(reg.as_str())]);
                    }
                    table.print();
                }
                ColoringOutput::Failed { error, .. } => println!("  {error}"),
            }
            println!();
        }
    })?;

    if !allocation.is_complete() {
        log::warn!(
            "{} of {} functions could not be allocated",
            allocation.failures().count() + allocation.errors.len(),
            allocation.program.functions.len()
        );
    }
    Ok(())
}
