//! Functions and programs.

use std::collections::{BTreeSet, HashSet};

use crate::{
    ir::{InstrKind, Instruction, Opcode, Position, Type},
    Error, Result,
};

/// Function names a `call` may target without a declaration.
pub const INTRINSICS: &[&str] = &["print", "alloc", "free"];

/// A named, typed function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: Type,
}

impl Param {
    /// Creates a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A function in flat (pre-CFG) form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Ordered parameters
    pub params: Vec<Param>,
    /// Return type, `None` for procedures
    pub return_type: Option<Type>,
    /// Flat instruction stream, labels included
    pub instrs: Vec<Instruction>,
    /// Source position of the declaration
    pub pos: Option<Position>,
}

impl Function {
    /// Creates an empty function.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the largest sequence key in use.
    #[must_use]
    pub fn max_key(&self) -> u64 {
        self.instrs.iter().map(|i| i.key).max().unwrap_or(0)
    }

    /// Returns every variable the function mentions: parameters, destinations and operands.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars: BTreeSet<String> = self.params.iter().map(|p| p.name.clone()).collect();
        for instr in &self.instrs {
            vars.extend(instr.dest().map(str::to_string));
            vars.extend(instr.args().iter().cloned());
        }
        vars
    }

    /// Returns the number of non-label instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instrs.iter().filter(|i| !i.is_label()).count()
    }

    /// Checks the function-level invariants.
    ///
    /// - parameter names are distinct
    /// - every instruction is well formed
    /// - labels are unique and every `jmp`/`br` target is a declared label
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let mut params = HashSet::new();
        for param in &self.params {
            if !params.insert(param.name.as_str()) {
                return Err(malformed_error!(
                    "Duplicate parameter '{}' in function '{}'",
                    param.name,
                    self.name
                ));
            }
        }

        let mut labels = HashSet::new();
        for instr in &self.instrs {
            instr.validate()?;
            if let InstrKind::Label { name } = &instr.kind {
                if !labels.insert(name.as_str()) {
                    return Err(malformed_error!(
                        "Duplicate label '{}' in function '{}'",
                        name,
                        self.name
                    ));
                }
            }
        }

        for instr in self.instrs.iter().filter(|i| i.is_terminator()) {
            for target in instr.labels() {
                if !labels.contains(target.as_str()) {
                    return Err(malformed_error!(
                        "Branch to undeclared label '{}' in function '{}'",
                        target,
                        self.name
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A whole program: an ordered, name-keyed collection of functions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    /// Functions in declaration order
    pub functions: Vec<Function>,
}

impl Program {
    /// Creates a program from a list of functions.
    #[must_use]
    pub fn new(functions: Vec<Function>) -> Self {
        Self { functions }
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Looks up a function by name, failing with [`Error::FunctionNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::FunctionNotFound`] if no function has that name.
    pub fn get(&self, name: &str) -> Result<&Function> {
        self.function(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))
    }

    /// Looks up a function by name for modification.
    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    /// Returns the entry point, if the program has one.
    #[must_use]
    pub fn main(&self) -> Option<&Function> {
        self.function("main")
    }

    /// Checks the invariants that span functions.
    ///
    /// Function names must be unique (so there is at most one `main`), and every
    /// `call` must target a declared function or one of [`INTRINSICS`]. The bodies
    /// themselves are not checked; a malformed body only fails its own function
    /// when its CFG is built.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] describing the first violation.
    pub fn validate_linkage(&self) -> Result<()> {
        let mut names = HashSet::new();
        for function in &self.functions {
            if !names.insert(function.name.as_str()) {
                return Err(malformed_error!("Duplicate function '{}'", function.name));
            }
        }

        for function in &self.functions {
            let calls = function
                .instrs
                .iter()
                .filter(|i| i.op() == Some(Opcode::Call))
                .flat_map(Instruction::funcs);
            for callee in calls {
                if !names.contains(callee.as_str()) && !INTRINSICS.contains(&callee.as_str()) {
                    return Err(malformed_error!(
                        "Function '{}' calls undeclared function '{}'",
                        function.name,
                        callee
                    ));
                }
            }
        }
        Ok(())
    }

    /// Checks [the linkage](Self::validate_linkage) and then every function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        self.validate_linkage()?;
        self.functions.iter().try_for_each(Function::validate)
    }
}
