use std::path::Path;

use anyhow::Context;
use irkit::{
    analysis::{ssa, Cfg},
    ir::Program,
};

use crate::{
    app::GlobalOptions,
    commands::common::{load_program, select_functions},
};

pub fn run(
    path: &Path,
    function: Option<&str>,
    roundtrip: bool,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let program = load_program(path)?;

    let mut functions = Vec::new();
    for f in select_functions(&program, function)? {
        let cfg = Cfg::from_function(f)?;
        let mut converted = ssa::to_ssa(cfg)
            .with_context(|| format!("cannot build SSA for '{}'", f.name))?;
        if roundtrip {
            converted = ssa::from_ssa(converted)
                .with_context(|| format!("cannot leave SSA for '{}'", f.name))?;
        }
        functions.push(converted.into_function());
    }

    let program = Program::new(functions);
    if opts.json {
        println!("{}", program.to_json()?);
    } else {
        print!("{program}");
    }
    Ok(())
}
