use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// irkit - optimize and inspect programs in the JSON IR
#[derive(Debug, Parser)]
#[command(name = "irkit", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Optimizer configuration file (JSON). Flags override its fields.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Output format of graph-shaped results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Json,
}

/// The dataflow analyses the `dataflow` command can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Analysis {
    /// Variables defined on some path to each point
    Defined,
    /// Variables read later without an intervening write
    Live,
    /// Definitions that reach each point
    Reaching,
    /// Variables with a known constant value
    Constants,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Optimize a program and print the result.
    Opt {
        /// Path to the JSON program.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Write the optimized program as JSON to this file.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Disable local value numbering.
        #[arg(long)]
        no_lvn: bool,

        /// Disable global value numbering.
        #[arg(long)]
        no_gvn: bool,

        /// Disable dead code elimination.
        #[arg(long)]
        no_dce: bool,

        /// Skip the SSA round trip (also disables GVN).
        #[arg(long)]
        no_ssa: bool,

        /// Maximum rounds of the pass fixpoint.
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Print every recorded event.
        #[arg(long)]
        events: bool,
    },

    /// Print a function in SSA form.
    Ssa {
        /// Path to the JSON program.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Only this function (default: all).
        #[arg(long, value_name = "NAME")]
        function: Option<String>,

        /// Convert back out of SSA before printing.
        #[arg(long)]
        roundtrip: bool,
    },

    /// Display the control-flow graph of functions.
    Cfg {
        /// Path to the JSON program.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Only this function (default: all).
        #[arg(long, value_name = "NAME")]
        function: Option<String>,

        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: GraphFormat,
    },

    /// Display dominators, the dominator tree and dominance frontiers.
    Dom {
        /// Path to the JSON program.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Only this function (default: all).
        #[arg(long, value_name = "NAME")]
        function: Option<String>,
    },

    /// Run a dataflow analysis and print the in/out sets of every block.
    Dataflow {
        /// Path to the JSON program.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// The analysis to run.
        #[arg(long, value_enum, default_value = "live")]
        analysis: Analysis,

        /// Only this function (default: all).
        #[arg(long, value_name = "NAME")]
        function: Option<String>,
    },

    /// Allocate registers and print the coloring of every function.
    Regalloc {
        /// Path to the JSON program.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Comma-separated register names (default: from config).
        #[arg(long, value_delimiter = ',', value_name = "REGS")]
        registers: Option<Vec<String>>,

        /// Optimize before allocating.
        #[arg(long)]
        optimize: bool,
    },
}
