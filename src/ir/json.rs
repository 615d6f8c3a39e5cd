//! JSON serialization of programs.
//!
//! The wire shape is the common one for this IR family:
//!
//! ```json
//! {"functions": [{"name": "main", "args": [{"name": "n", "type": "int"}], "type": "int",
//!   "instrs": [{"op": "const", "dest": "one", "type": "int", "value": 1},
//!              {"label": "loop"},
//!              {"op": "add", "dest": "n", "type": "int", "args": ["n", "one"]}]}]}
//! ```
//!
//! Parsing goes through loosely typed `Raw*` mirrors of that shape and is then
//! converted into the strongly typed model, so that every structural problem surfaces
//! as an [`Error::Malformed`](crate::Error::Malformed) naming the offending field
//! rather than a generic deserializer message.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    ir::{Function, InstrKind, Instruction, Literal, Opcode, Param, Position, Program, Type},
    Result,
};

#[derive(Serialize, Deserialize)]
struct RawProgram {
    functions: Vec<RawFunction>,
}

#[derive(Serialize, Deserialize)]
struct RawFunction {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<RawParam>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    ty: Option<Type>,
    #[serde(default)]
    instrs: Vec<RawInstruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pos: Option<Position>,
}

#[derive(Serialize, Deserialize)]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: Type,
}

#[derive(Serialize, Deserialize, Default)]
struct RawInstruction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dest: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    ty: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    funcs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pos: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<u64>,
}

impl RawInstruction {
    fn into_kind(self) -> Result<InstrKind> {
        if let Some(name) = self.label {
            if self.op.is_some() {
                return Err(malformed_error!("Label '{}' must not carry an opcode", name));
            }
            return Ok(InstrKind::Label { name });
        }

        let op_name = self
            .op
            .ok_or_else(|| malformed_error!("Instruction without 'op' or 'label'"))?;
        let op: Opcode = op_name
            .parse()
            .map_err(|_| malformed_error!("Unknown opcode '{}'", op_name))?;

        if op == Opcode::Const {
            let dest = self
                .dest
                .ok_or_else(|| malformed_error!("'const' without 'dest'"))?;
            let ty = self
                .ty
                .ok_or_else(|| malformed_error!("'const' {} without 'type'", dest))?;
            let raw = self
                .value
                .ok_or_else(|| malformed_error!("'const' {} without 'value'", dest))?;
            let value = Literal::from_json(&raw, &ty)?;
            return Ok(InstrKind::Const { dest, ty, value });
        }

        match self.dest {
            Some(dest) => {
                let ty = self
                    .ty
                    .ok_or_else(|| malformed_error!("'{}' {} without 'type'", op, dest))?;
                Ok(InstrKind::Value {
                    op,
                    dest,
                    ty,
                    args: self.args,
                    funcs: self.funcs,
                    labels: self.labels,
                })
            }
            None => Ok(InstrKind::Effect {
                op,
                args: self.args,
                funcs: self.funcs,
                labels: self.labels,
            }),
        }
    }

    fn from_instruction(instr: &Instruction) -> Self {
        let mut raw = RawInstruction {
            pos: instr.pos,
            key: Some(instr.key),
            ..RawInstruction::default()
        };
        match &instr.kind {
            InstrKind::Label { name } => raw.label = Some(name.clone()),
            InstrKind::Const { dest, ty, value } => {
                raw.op = Some(Opcode::Const.to_string());
                raw.dest = Some(dest.clone());
                raw.ty = Some(ty.clone());
                raw.value = Some(value.to_json());
            }
            InstrKind::Value {
                op,
                dest,
                ty,
                args,
                funcs,
                labels,
            } => {
                raw.op = Some(op.to_string());
                raw.dest = Some(dest.clone());
                raw.ty = Some(ty.clone());
                raw.args.clone_from(args);
                raw.funcs.clone_from(funcs);
                raw.labels.clone_from(labels);
            }
            InstrKind::Effect {
                op,
                args,
                funcs,
                labels,
            } => {
                raw.op = Some(op.to_string());
                raw.args.clone_from(args);
                raw.funcs.clone_from(funcs);
                raw.labels.clone_from(labels);
            }
        }
        raw
    }
}

impl Program {
    /// Parses a program from its JSON representation and checks its linkage.
    ///
    /// Instructions without a `key` receive one from a program-wide counter that
    /// continues after the largest key seen so far. Function bodies are only
    /// checked for what the IR types can represent; [`Program::validate`] checks
    /// the rest.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] for syntactically invalid JSON and
    /// [`crate::Error::Malformed`] for unknown opcodes, bad literals and the
    /// violations of [`Program::validate_linkage`].
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawProgram = serde_json::from_str(text)?;
        let mut next_key = 1u64;
        let mut functions = Vec::with_capacity(raw.functions.len());

        for raw_fn in raw.functions {
            let mut instrs = Vec::with_capacity(raw_fn.instrs.len());
            for raw_instr in raw_fn.instrs {
                let pos = raw_instr.pos;
                let key = match raw_instr.key {
                    Some(key) => key,
                    None => next_key,
                };
                next_key = next_key.max(key.saturating_add(1));
                let kind = raw_instr.into_kind()?;
                instrs.push(Instruction { kind, pos, key });
            }
            functions.push(Function {
                name: raw_fn.name,
                params: raw_fn
                    .args
                    .into_iter()
                    .map(|p| Param::new(p.name, p.ty))
                    .collect(),
                return_type: raw_fn.ty,
                instrs,
                pos: raw_fn.pos,
            });
        }

        let program = Program::new(functions);
        program.validate_linkage()?;
        Ok(program)
    }

    /// Reads and parses a JSON program file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be read, otherwise
    /// the errors of [`Program::from_json`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serializes the program to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let raw = RawProgram {
            functions: self
                .functions
                .iter()
                .map(|f| RawFunction {
                    name: f.name.clone(),
                    args: f
                        .params
                        .iter()
                        .map(|p| RawParam {
                            name: p.name.clone(),
                            ty: p.ty.clone(),
                        })
                        .collect(),
                    ty: f.return_type.clone(),
                    instrs: f.instrs.iter().map(RawInstruction::from_instruction).collect(),
                    pos: f.pos,
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}
