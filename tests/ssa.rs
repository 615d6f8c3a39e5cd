//! SSA integration tests.
//!
//! These tests drive the public API end to end:
//! 1. Build a function with `FunctionBuilder` (or load it from JSON)
//! 2. Build the CFG and its dominance information
//! 3. Convert to SSA and check phi placement and naming
//! 4. Convert back and check, with the reference interpreter, that behavior is unchanged

mod common;

use std::collections::{BTreeSet, HashMap};

use common::{run_function, Value};
use irkit::{
    analysis::{ssa, Cfg, Dominance},
    ir::{Function, FunctionBuilder, Literal, Opcode, Program, Type},
    Result,
};

/// `while (x < 10) { x = x + 1; } print x;`
fn counting_loop() -> Function {
    FunctionBuilder::new("count")
        .param("x", Type::Int)
        .label("test")
        .constant("ten", Type::Int, Literal::Int(10))
        .op(Opcode::Lt, "c", Type::Bool, ["x", "ten"])
        .br("c", "body", "done")
        .label("body")
        .constant("one", Type::Int, Literal::Int(1))
        .op(Opcode::Add, "x", Type::Int, ["x", "one"])
        .jmp("test")
        .label("done")
        .print(["x"])
        .ret(None)
        .build()
}

/// `if (c) { y = 1; } else { y = 2; } print y;`
fn diamond() -> Function {
    FunctionBuilder::new("diamond")
        .param("c", Type::Bool)
        .br("c", "then", "else")
        .label("then")
        .constant("y", Type::Int, Literal::Int(1))
        .jmp("join")
        .label("else")
        .constant("y", Type::Int, Literal::Int(2))
        .jmp("join")
        .label("join")
        .print(["y"])
        .ret(None)
        .build()
}

/// Phis of `block` whose destination was derived from `var`.
fn phis_for(cfg: &Cfg, block: &str, var: &str) -> Result<usize> {
    let prefix = format!("{var}.");
    Ok(cfg
        .block(block)?
        .phis()
        .filter(|p| p.dest().is_some_and(|d| d.starts_with(&prefix) && !d.contains("undef")))
        .count())
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

#[test]
fn test_counting_loop_shape() -> Result<()> {
    let cfg = Cfg::from_function(&counting_loop())?;

    let names: Vec<&str> = cfg.names().collect();
    assert_eq!(names, ["count_entry", "test", "body", "done"]);
    assert_eq!(cfg.successors_of("count_entry"), ["test"]);
    assert_eq!(cfg.successors_of("test"), ["body", "done"]);
    assert_eq!(cfg.successors_of("body"), ["test"]);

    let dom = Dominance::compute(&cfg)?;
    assert_eq!(dom.dom_map()["body"], set(&["count_entry", "test", "body"]));
    assert_eq!(dom.frontier("test"), ["test"]);
    assert_eq!(dom.frontier("body"), ["test"]);
    assert!(dom.frontier("done").is_empty());

    let ssa = ssa::to_ssa(cfg)?;
    assert_eq!(phis_for(&ssa, "test", "x")?, 1);
    for block in ["count_entry", "body", "done"] {
        assert_eq!(ssa.block(block)?.phi_count(), 0, "no phis expected in {block}");
    }
    Ok(())
}

#[test]
fn test_diamond_single_phi() -> Result<()> {
    let ssa = ssa::to_ssa(Cfg::from_function(&diamond())?)?;

    let join = ssa.block("join")?;
    assert_eq!(join.phi_count(), 1);
    let phi = &join.instrs[0];
    let labels: BTreeSet<String> = phi.labels().iter().cloned().collect();
    assert_eq!(labels, set(&["then", "else"]));
    assert_eq!(phi.args().len(), 2);
    assert_ne!(phi.args()[0], phi.args()[1]);
    assert_eq!(join.instrs[1].args(), [phi.dest().unwrap_or_default()]);
    Ok(())
}

#[test]
fn test_straight_line_needs_no_phis() -> Result<()> {
    let f = FunctionBuilder::new("f")
        .param("a", Type::Int)
        .op(Opcode::Add, "b", Type::Int, ["a", "a"])
        .op(Opcode::Mul, "c", Type::Int, ["b", "a"])
        .print(["c"])
        .build();
    let ssa = ssa::to_ssa(Cfg::from_function(&f)?)?;
    assert!(ssa.blocks().iter().all(|b| b.phi_count() == 0));
    Ok(())
}

#[test]
fn test_single_assignment_after_conversion() -> Result<()> {
    let ssa = ssa::to_ssa(Cfg::from_function(&counting_loop())?)?;

    let mut seen: HashMap<String, usize> = HashMap::new();
    for block in ssa.blocks() {
        for dest in block.defs() {
            *seen.entry(dest.to_string()).or_default() += 1;
        }
    }
    assert!(seen.values().all(|&n| n == 1), "multiple definitions: {seen:?}");
    Ok(())
}

#[test]
fn test_roundtrip_preserves_behavior() -> Result<()> {
    for function in [counting_loop(), diamond()] {
        let name = function.name.clone();
        let original = Program::new(vec![function.clone()]);

        let roundtrip = ssa::from_ssa(ssa::to_ssa(Cfg::from_function(&function)?)?)?;
        assert!(roundtrip.blocks().iter().all(|b| b.phi_count() == 0));
        let lowered = Program::new(vec![roundtrip.into_function()]);

        let args: Vec<Vec<Value>> = if name == "count" {
            vec![vec![Value::Int(0)], vec![Value::Int(7)], vec![Value::Int(42)]]
        } else {
            vec![vec![Value::Bool(true)], vec![Value::Bool(false)]]
        };
        for input in args {
            assert_eq!(
                run_function(&original, &name, &input),
                run_function(&lowered, &name, &input),
                "{name} with {input:?}"
            );
        }
    }
    Ok(())
}

#[test]
fn test_variable_undefined_on_one_path() -> Result<()> {
    // `y` only exists when `c` holds; the phi gets an explicit undef for the other edge.
    let f = FunctionBuilder::new("maybe")
        .param("c", Type::Bool)
        .br("c", "set", "join")
        .label("set")
        .constant("y", Type::Int, Literal::Int(5))
        .print(["y"])
        .label("join")
        .ret(None)
        .build();
    let ssa = ssa::to_ssa(Cfg::from_function(&f)?)?;
    let text = ssa.clone().into_function().to_string();
    assert!(text.contains("= undef;"), "{text}");

    let lowered = Program::new(vec![ssa::from_ssa(ssa)?.into_function()]);
    for c in [true, false] {
        let outcome = run_function(&lowered, "maybe", &[Value::Bool(c)]).expect("runs");
        assert_eq!(outcome.prints.len(), usize::from(c));
    }
    Ok(())
}

#[test]
fn test_swap_through_parallel_copies() -> Result<()> {
    // a and b trade places every iteration: lowering the header phis needs a temporary.
    let json = r#"{"functions": [{
        "name": "swap",
        "args": [{"name": "n", "type": "int"}],
        "instrs": [
            {"op": "const", "dest": "a", "type": "int", "value": 1},
            {"op": "const", "dest": "b", "type": "int", "value": 2},
            {"op": "const", "dest": "one", "type": "int", "value": 1},
            {"label": "head"},
            {"op": "phi", "dest": "x", "type": "int", "args": ["a", "y"], "labels": ["swap_0", "head"]},
            {"op": "phi", "dest": "y", "type": "int", "args": ["b", "x"], "labels": ["swap_0", "head"]},
            {"op": "phi", "dest": "i", "type": "int", "args": ["n", "j"], "labels": ["swap_0", "head"]},
            {"op": "sub", "dest": "j", "type": "int", "args": ["i", "one"]},
            {"op": "gt", "dest": "c", "type": "bool", "args": ["j", "one"]},
            {"op": "print", "args": ["x", "y"]},
            {"op": "br", "args": ["c"], "labels": ["head", "done"]},
            {"label": "done"},
            {"op": "ret"}
        ]
    }]}"#;
    let program = Program::from_json(json)?;
    let lowered = ssa::from_ssa(Cfg::from_function(&program.functions[0])?)?;
    let lowered = Program::new(vec![lowered.into_function()]);

    let outcome = run_function(&lowered, "swap", &[Value::Int(4)]);
    let prints = outcome.map(|o| o.prints).unwrap_or_default();
    assert_eq!(prints, ["1 2", "2 1", "1 2"]);
    Ok(())
}

#[test]
fn test_already_in_ssa_rejected() -> Result<()> {
    let ssa = ssa::to_ssa(Cfg::from_function(&diamond())?)?;
    assert!(matches!(ssa::to_ssa(ssa), Err(irkit::Error::Malformed { .. })));
    Ok(())
}
