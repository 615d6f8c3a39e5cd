//! A small reference interpreter used to check that optimization preserves behavior.
//!
//! Only what the tests need: integer, boolean and float arithmetic, control flow,
//! phis, calls, `print` and `ret`. Memory operations are rejected.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use irkit::ir::{Function, InstrKind, Instruction, Literal, Opcode, Program};

/// A run-time value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Float(f64),
    Char(char),
    /// The result of `undef`; copying it is fine, computing with it is not
    Undef,
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Int(v) => Value::Int(v),
            Literal::Bool(v) => Value::Bool(v),
            Literal::Float(v) => Value::Float(v),
            Literal::Char(v) => Value::Char(v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.17}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::Undef => f.write_str("undef"),
        }
    }
}

/// What a run printed and returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub prints: Vec<String>,
    pub ret: Option<Value>,
}

/// Instructions executed before a run is considered stuck.
const STEP_LIMIT: usize = 100_000;

struct Machine<'a> {
    program: &'a Program,
    prints: Vec<String>,
    steps: usize,
}

/// Runs `main` of `program` with `args`.
pub fn run(program: &Program, args: &[Value]) -> Result<Outcome, String> {
    run_function(program, "main", args)
}

/// Runs the function `name` of `program` with `args`.
pub fn run_function(program: &Program, name: &str, args: &[Value]) -> Result<Outcome, String> {
    let mut machine = Machine {
        program,
        prints: Vec::new(),
        steps: 0,
    };
    let ret = machine.call(name, args)?;
    Ok(Outcome {
        prints: machine.prints,
        ret,
    })
}

impl Machine<'_> {
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, String> {
        let function = self
            .program
            .function(name)
            .ok_or_else(|| format!("unknown function {name}"))?;
        if function.params.len() != args.len() {
            return Err(format!("{name}: expected {} arguments", function.params.len()));
        }
        let env: HashMap<String, Value> = function
            .params
            .iter()
            .map(|p| p.name.clone())
            .zip(args.iter().copied())
            .collect();
        self.execute(function, env)
    }

    fn execute(
        &mut self,
        function: &Function,
        mut env: HashMap<String, Value>,
    ) -> Result<Option<Value>, String> {
        let labels: HashMap<&str, usize> = function
            .instrs
            .iter()
            .enumerate()
            .filter_map(|(i, instr)| match &instr.kind {
                InstrKind::Label { name } => Some((name.as_str(), i)),
                _ => None,
            })
            .collect();

        let mut pc = 0;
        let mut current: Option<String> = None;
        let mut previous: Option<String> = None;

        while let Some(instr) = function.instrs.get(pc) {
            self.steps += 1;
            if self.steps > STEP_LIMIT {
                return Err("step limit exceeded".to_string());
            }

            if let InstrKind::Label { name } = &instr.kind {
                previous = current.replace(name.clone());
                pc += 1;
                continue;
            }

            if instr.is_phi() {
                let phis: Vec<&Instruction> = function.instrs[pc..]
                    .iter()
                    .take_while(|i| i.is_phi())
                    .collect();
                let mut incoming = Vec::with_capacity(phis.len());
                for phi in &phis {
                    let from = previous.as_deref().ok_or("phi without predecessor")?;
                    let slot = phi
                        .labels()
                        .iter()
                        .position(|l| l == from)
                        .ok_or_else(|| format!("phi has no operand for {from}"))?;
                    let value = lookup(&env, &phi.args()[slot])?;
                    incoming.push((phi.dest().unwrap_or_default().to_string(), value));
                }
                env.extend(incoming);
                pc += phis.len();
                continue;
            }

            match &instr.kind {
                InstrKind::Const { dest, value, .. } => {
                    env.insert(dest.clone(), Value::from(*value));
                }
                InstrKind::Value {
                    op, dest, args, funcs, ..
                } => {
                    let value = match op {
                        Opcode::Call => {
                            let values = args
                                .iter()
                                .map(|a| lookup(&env, a))
                                .collect::<Result<Vec<_>, _>>()?;
                            let callee = funcs.first().ok_or("call without function")?;
                            self.call(callee, &values)?
                                .ok_or_else(|| format!("{callee} returned nothing"))?
                        }
                        Opcode::Id => lookup(&env, &args[0])?,
                        Opcode::Undef => Value::Undef,
                        _ => {
                            let values = args
                                .iter()
                                .map(|a| lookup(&env, a))
                                .collect::<Result<Vec<_>, _>>()?;
                            apply(*op, &values)?
                        }
                    };
                    env.insert(dest.clone(), value);
                }
                InstrKind::Effect {
                    op,
                    args,
                    funcs,
                    labels: targets,
                } => match op {
                    Opcode::Jmp => {
                        pc = *labels.get(targets[0].as_str()).ok_or("bad jump")?;
                        continue;
                    }
                    Opcode::Br => {
                        let target = match lookup(&env, &args[0])? {
                            Value::Bool(true) => &targets[0],
                            Value::Bool(false) => &targets[1],
                            other => return Err(format!("branch on {other}")),
                        };
                        pc = *labels.get(target.as_str()).ok_or("bad branch")?;
                        continue;
                    }
                    Opcode::Ret => {
                        return match args.first() {
                            Some(arg) => Ok(Some(defined(lookup(&env, arg)?)?)),
                            None => Ok(None),
                        };
                    }
                    Opcode::Print => {
                        let values = args
                            .iter()
                            .map(|a| lookup(&env, a).and_then(defined).map(|v| v.to_string()))
                            .collect::<Result<Vec<_>, _>>()?;
                        self.prints.push(values.join(" "));
                    }
                    Opcode::Call => {
                        let values = args
                            .iter()
                            .map(|a| lookup(&env, a))
                            .collect::<Result<Vec<_>, _>>()?;
                        let callee = funcs.first().ok_or("call without function")?;
                        self.call(callee, &values)?;
                    }
                    Opcode::Nop => {}
                    other => return Err(format!("unsupported effect {other}")),
                },
                InstrKind::Label { .. } => unreachable!(),
            }
            pc += 1;
        }
        Ok(None)
    }
}

fn lookup(env: &HashMap<String, Value>, var: &str) -> Result<Value, String> {
    env.get(var)
        .copied()
        .ok_or_else(|| format!("undefined variable {var}"))
}

fn defined(value: Value) -> Result<Value, String> {
    if value == Value::Undef {
        Err("use of undef".to_string())
    } else {
        Ok(value)
    }
}

fn apply(op: Opcode, args: &[Value]) -> Result<Value, String> {
    let args = args
        .iter()
        .copied()
        .map(defined)
        .collect::<Result<Vec<_>, _>>()?;
    let value = match (op, args.as_slice()) {
        (Opcode::Add, [Value::Int(a), Value::Int(b)]) => Value::Int(a.wrapping_add(*b)),
        (Opcode::Sub, [Value::Int(a), Value::Int(b)]) => Value::Int(a.wrapping_sub(*b)),
        (Opcode::Mul, [Value::Int(a), Value::Int(b)]) => Value::Int(a.wrapping_mul(*b)),
        (Opcode::Div, [Value::Int(a), Value::Int(b)]) => {
            Value::Int(a.checked_div(*b).ok_or("division error")?)
        }
        (Opcode::Eq, [a, b]) => Value::Bool(a == b),
        (Opcode::Ne, [a, b]) => Value::Bool(a != b),
        (Opcode::Lt, [Value::Int(a), Value::Int(b)]) => Value::Bool(a < b),
        (Opcode::Gt, [Value::Int(a), Value::Int(b)]) => Value::Bool(a > b),
        (Opcode::Le, [Value::Int(a), Value::Int(b)]) => Value::Bool(a <= b),
        (Opcode::Ge, [Value::Int(a), Value::Int(b)]) => Value::Bool(a >= b),
        (Opcode::Not, [Value::Bool(a)]) => Value::Bool(!a),
        (Opcode::And, [Value::Bool(a), Value::Bool(b)]) => Value::Bool(*a && *b),
        (Opcode::Or, [Value::Bool(a), Value::Bool(b)]) => Value::Bool(*a || *b),
        (Opcode::Fadd, [Value::Float(a), Value::Float(b)]) => Value::Float(a + b),
        (Opcode::Fsub, [Value::Float(a), Value::Float(b)]) => Value::Float(a - b),
        (Opcode::Fmul, [Value::Float(a), Value::Float(b)]) => Value::Float(a * b),
        (Opcode::Fdiv, [Value::Float(a), Value::Float(b)]) => Value::Float(a / b),
        (Opcode::Feq, [Value::Float(a), Value::Float(b)]) => Value::Bool(a == b),
        (Opcode::Flt, [Value::Float(a), Value::Float(b)]) => Value::Bool(a < b),
        (Opcode::Fle, [Value::Float(a), Value::Float(b)]) => Value::Bool(a <= b),
        (Opcode::Fgt, [Value::Float(a), Value::Float(b)]) => Value::Bool(a > b),
        (Opcode::Fge, [Value::Float(a), Value::Float(b)]) => Value::Bool(a >= b),
        (op, args) => return Err(format!("cannot apply {op} to {args:?}")),
    };
    Ok(value)
}

/// Renames every variable of `function` to its register in `colors`.
///
/// Running the result shows whether the coloring is sound: two variables that
/// share a register must never hold different values at the same time.
pub fn apply_coloring(function: &Function, colors: &BTreeMap<String, String>) -> Function {
    let reg = |var: &str| colors.get(var).cloned().unwrap_or_else(|| var.to_string());
    let mut out = function.clone();
    for param in &mut out.params {
        param.name = reg(&param.name);
    }
    for instr in &mut out.instrs {
        if let Some(dest) = instr.dest_mut() {
            *dest = reg(dest);
        }
        for arg in instr.args_mut() {
            *arg = reg(arg);
        }
    }
    out
}
