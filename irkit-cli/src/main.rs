mod app;
mod commands;
mod output;

use anyhow::Context;
use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .context("failed to set Ctrl+C handler")?;

    let cli = Cli::parse();

    // Show irkit info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("irkit", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Opt {
            path,
            output,
            no_lvn,
            no_gvn,
            no_dce,
            no_ssa,
            max_iterations,
            events,
        } => commands::opt::run(
            path,
            &commands::opt::OptOptions {
                output: output.as_deref(),
                lvn: !*no_lvn,
                gvn: !*no_gvn,
                dce: !*no_dce,
                ssa: !*no_ssa,
                max_iterations: *max_iterations,
                events: *events,
                global: &cli.global,
            },
        ),
        Command::Ssa {
            path,
            function,
            roundtrip,
        } => commands::ssa::run(path, function.as_deref(), *roundtrip, &cli.global),
        Command::Cfg {
            path,
            function,
            format,
        } => commands::cfg::run(path, function.as_deref(), *format),
        Command::Dom { path, function } => {
            commands::dom::run(path, function.as_deref(), &cli.global)
        }
        Command::Dataflow {
            path,
            analysis,
            function,
        } => commands::dataflow::run(path, *analysis, function.as_deref(), &cli.global),
        Command::Regalloc {
            path,
            registers,
            optimize,
        } => commands::regalloc::run(path, registers.as_deref(), *optimize, &cli.global),
    }
}
