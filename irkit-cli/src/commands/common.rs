use std::path::Path;

use anyhow::{bail, Context};
use irkit::{
    compiler::OptimizerConfig,
    ir::{Function, Program},
};

use crate::app::GlobalOptions;

/// Load a JSON program and check that it links.
pub fn load_program(path: &Path) -> anyhow::Result<Program> {
    Program::from_file(path).with_context(|| format!("failed to load program: {}", path.display()))
}

/// The optimizer configuration from `--config`, or the defaults.
pub fn load_config(opts: &GlobalOptions) -> anyhow::Result<OptimizerConfig> {
    let Some(path) = &opts.config else {
        return Ok(OptimizerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    OptimizerConfig::from_json(&text)
        .with_context(|| format!("invalid config: {}", path.display()))
}

/// The functions selected by `--function`, or all of them.
pub fn select_functions<'a>(
    program: &'a Program,
    filter: Option<&str>,
) -> anyhow::Result<Vec<&'a Function>> {
    match filter {
        None => Ok(program.functions.iter().collect()),
        Some(name) => match program.function(name) {
            Some(function) => Ok(vec![function]),
            None => bail!("no function named '{name}'"),
        },
    }
}
