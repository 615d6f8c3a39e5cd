use thiserror::Error;

use crate::compiler::AllocationFailure;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every pass in the middle-end fails fast: as soon as a structural problem with the IR is
/// detected, the pass returns one of these variants instead of continuing on inconsistent state.
/// The program-level pipeline catches per-function errors and keeps going with the sibling
/// functions, see [`crate::compiler::Optimizer`].
///
/// # Error Categories
///
/// ## Structural Errors
/// - [`Error::Malformed`] - The IR violates a structural invariant (bad arity, missing labels,
///   unknown opcode, mismatched phi operands, ...)
/// - [`Error::UnknownBlock`] - A block name was looked up that does not exist in the CFG
/// - [`Error::FunctionNotFound`] - A function name was looked up that does not exist
///
/// ## Analysis Errors
/// - [`Error::NonConvergence`] - A fixpoint iteration exceeded its configured cap
/// - [`Error::AllocationFailed`] - The register allocator ran out of colors
///
/// ## I/O Errors
/// - [`Error::Json`] - The JSON representation of a program could not be (de)serialized
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// # Examples
///
/// ```rust
/// use irkit::{Error, Program};
///
/// match Program::from_json(r#"{"functions": [{"name": "main", "instrs": [{"op": "frob"}]}]}"#) {
///     Ok(_) => unreachable!(),
///     Err(Error::Malformed { message, .. }) => assert!(message.contains("frob")),
///     Err(e) => panic!("unexpected error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The IR is structurally invalid.
    ///
    /// This error indicates that a function or instruction does not satisfy the invariants
    /// of the IR model. The error includes the source location where the malformation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A block name did not resolve to a block of the CFG.
    #[error("Unknown block - {0}")]
    UnknownBlock(String),

    /// A function name did not resolve to a function of the program.
    #[error("Function not found - {0}")]
    FunctionNotFound(String),

    /// A fixpoint computation did not settle within its iteration budget.
    ///
    /// All lattices used by this crate have finite height, so hitting this limit means
    /// either a bug in a transfer function or a cap that is configured too low.
    #[error("{analysis} did not converge after {iterations} iterations")]
    NonConvergence {
        /// Name of the analysis or pass that was iterating
        analysis: &'static str,
        /// Number of iterations performed before giving up
        iterations: usize,
    },

    /// Register coloring found no valid color for some node.
    ///
    /// The allocator does not spill, so this is reported instead of generating code
    /// that would silently share a register between interfering variables.
    #[error(transparent)]
    AllocationFailed(#[from] AllocationFailure),

    /// A function failed somewhere inside the optimization pipeline.
    #[error("Function '{function}' failed: {source}")]
    FunctionFailed {
        /// Name of the failing function
        function: String,
        /// The underlying error
        source: Box<Error>,
    },

    /// JSON (de)serialization error.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

impl Error {
    /// Wraps this error with the name of the function it occurred in.
    #[must_use]
    pub fn in_function(self, function: impl Into<String>) -> Self {
        match self {
            already @ Error::FunctionFailed { .. } => already,
            other => Error::FunctionFailed {
                function: function.into(),
                source: Box::new(other),
            },
        }
    }
}
