//! Optimizer configuration.

use serde::{Deserialize, Serialize};

use crate::{analysis::dataflow::DEFAULT_MAX_ITERATIONS_PER_BLOCK, Result};

/// The RISC-V integer registers handed to the allocator by default.
///
/// `t0..t6`, `s1..s11` and `a2..a7`. `a0`/`a1` carry arguments and return values
/// and `s0` is the frame pointer, so they are left out.
pub const DEFAULT_REGISTERS: [&str; 24] = [
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9",
    "s10", "s11", "a2", "a3", "a4", "a5", "a6", "a7",
];

/// Which passes run and how long fixpoints may iterate.
///
/// Deserializes from JSON with every field optional:
///
/// ```rust
/// use irkit::compiler::OptimizerConfig;
///
/// let config = OptimizerConfig::from_json(r#"{ "gvn": false, "registers": ["r1", "r2"] }"#)?;
/// assert!(!config.gvn);
/// assert!(config.lvn);
/// assert_eq!(config.registers.len(), 2);
/// # Ok::<(), irkit::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Convert to SSA before the value passes and back afterwards
    pub ssa: bool,
    /// Run local value numbering
    pub lvn: bool,
    /// Run global value numbering (only in SSA form)
    pub gvn: bool,
    /// Run dead code elimination
    pub dce: bool,
    /// Cap on rounds of the pass fixpoint
    pub max_pass_iterations: usize,
    /// Dataflow solver cap, in visits per block
    pub max_dataflow_iterations_per_block: usize,
    /// Ordered color names for register allocation
    pub registers: Vec<String>,
    /// Process the functions of a program concurrently
    pub parallel: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            ssa: true,
            lvn: true,
            gvn: true,
            dce: true,
            max_pass_iterations: 16,
            max_dataflow_iterations_per_block: DEFAULT_MAX_ITERATIONS_PER_BLOCK,
            registers: DEFAULT_REGISTERS.iter().map(|r| (*r).to_string()).collect(),
            parallel: true,
        }
    }
}

impl OptimizerConfig {
    /// CFG normalization and the SSA round trip, no value passes.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            lvn: false,
            gvn: false,
            dce: false,
            ..Self::default()
        }
    }

    /// Every pass, with generous iteration caps.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            max_pass_iterations: 64,
            max_dataflow_iterations_per_block: 4 * DEFAULT_MAX_ITERATIONS_PER_BLOCK,
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] for invalid JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns `true` if any value pass is enabled.
    #[must_use]
    pub fn has_value_passes(&self) -> bool {
        self.lvn || self.gvn || self.dce
    }
}
