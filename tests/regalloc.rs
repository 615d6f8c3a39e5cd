//! Register allocation integration tests.
//!
//! The strongest check of a coloring is to apply it: every variable is renamed to
//! its register and the program must still print the same thing.

mod common;

use common::{apply_coloring, run, run_function, Value};
use irkit::{
    compiler::{
        allocate_program,
        regalloc::{is_valid_coloring, ColorMap, InterferenceGraph},
        Optimizer, RegisterAllocator, DEFAULT_REGISTERS,
    },
    ir::{FunctionBuilder, Literal, Opcode, Program, Type},
    Error, Result,
};

const FIBONACCI: &str = r#"{"functions": [{
    "name": "main",
    "instrs": [
        {"op": "const", "dest": "n", "type": "int", "value": 12},
        {"op": "const", "dest": "a", "type": "int", "value": 0},
        {"op": "const", "dest": "b", "type": "int", "value": 1},
        {"op": "const", "dest": "i", "type": "int", "value": 0},
        {"op": "const", "dest": "one", "type": "int", "value": 1},
        {"label": "loop"},
        {"op": "lt", "dest": "more", "type": "bool", "args": ["i", "n"]},
        {"op": "br", "args": ["more"], "labels": ["step", "done"]},
        {"label": "step"},
        {"op": "add", "dest": "t", "type": "int", "args": ["a", "b"]},
        {"op": "id", "dest": "a", "type": "int", "args": ["b"]},
        {"op": "id", "dest": "b", "type": "int", "args": ["t"]},
        {"op": "add", "dest": "i", "type": "int", "args": ["i", "one"]},
        {"op": "jmp", "labels": ["loop"]},
        {"label": "done"},
        {"op": "print", "args": ["a"]}
    ]
}]}"#;

fn default_registers() -> Vec<String> {
    DEFAULT_REGISTERS.iter().map(|r| (*r).to_string()).collect()
}

fn check_coloring(graph: &InterferenceGraph, colors: &ColorMap) {
    assert!(is_valid_coloring(graph, colors), "{colors:?}");
    for (a, b) in graph.edges() {
        assert_ne!(colors[a], colors[b], "{a} and {b} interfere");
    }
}

#[test]
fn test_loop_runs_in_registers() -> Result<()> {
    let program = Program::from_json(FIBONACCI)?;
    let expected = run(&program, &[]).expect("original runs");
    assert_eq!(expected.prints, ["144"]);

    let allocation = allocate_program(&program, &default_registers())?;
    assert!(allocation.is_complete());

    let main = allocation.program.main().expect("main allocated");
    let colors = allocation.colorings["main"].as_ref().expect("colored");
    let in_registers = Program::new(vec![apply_coloring(main, colors)]);
    assert_eq!(run(&in_registers, &[]), Ok(expected));
    Ok(())
}

#[test]
fn test_optimized_program_runs_in_registers() -> Result<()> {
    let program = Program::from_json(FIBONACCI)?;
    let optimizer = Optimizer::default();
    let optimized = optimizer.optimize_program(&program)?.program;
    let allocation = optimizer.allocate(&optimized)?;

    let regs = default_registers();
    for function in &allocation.program.functions {
        let result = RegisterAllocator::new(&regs).allocate(function)?;
        let colors = result.coloring.as_ref().expect("colored");
        check_coloring(&result.graph, colors);
    }

    let main = allocation.program.main().expect("main allocated");
    let colors = allocation.colorings["main"].as_ref().expect("colored");
    let in_registers = Program::new(vec![apply_coloring(main, colors)]);
    assert_eq!(run(&in_registers, &[]), run(&program, &[]));
    Ok(())
}

#[test]
fn test_parameters_keep_distinct_registers() -> Result<()> {
    let f = FunctionBuilder::new("mix")
        .param("x", Type::Int)
        .param("y", Type::Int)
        .op(Opcode::Id, "z", Type::Int, ["x"])
        .op(Opcode::Sub, "w", Type::Int, ["z", "y"])
        .print(["w"])
        .build();
    let program = Program::new(vec![f]);

    let allocation = allocate_program(&program, &default_registers())?;
    let colors = allocation.colorings["mix"].as_ref().expect("colored");
    assert_ne!(colors["x"], colors["y"]);

    let mix = allocation.program.function("mix").expect("mix allocated");
    assert_eq!(mix.params.len(), 2);
    assert_eq!(mix.params[0].name, "x");
    assert_eq!(mix.params[1].name, "y");
    // `z` was merged into `x` and the copy is gone
    assert!(mix.instrs.iter().all(|i| i.op() != Some(Opcode::Id)), "{mix}");

    let in_registers = Program::new(vec![apply_coloring(mix, colors)]);
    let args = [Value::Int(9), Value::Int(4)];
    assert_eq!(
        run_function(&in_registers, "mix", &args),
        run_function(&program, "mix", &args)
    );
    Ok(())
}

#[test]
fn test_interfering_copy_not_coalesced() -> Result<()> {
    // `b` is a copy of `a`, but `a` is changed while `b` is still needed.
    let f = FunctionBuilder::new("keep")
        .param("a", Type::Int)
        .op(Opcode::Id, "b", Type::Int, ["a"])
        .constant("one", Type::Int, Literal::Int(1))
        .op(Opcode::Add, "a", Type::Int, ["a", "one"])
        .print(["a", "b"])
        .build();

    let regs = default_registers();
    let result = RegisterAllocator::new(&regs).allocate(&f)?;
    assert!(result.graph.interferes("a", "b"));
    assert_eq!(
        result.function.instrs.iter().filter(|i| i.op() == Some(Opcode::Id)).count(),
        1
    );

    let colors = result.coloring.as_ref().expect("colored");
    check_coloring(&result.graph, colors);
    let program = Program::new(vec![f]);
    let in_registers = Program::new(vec![apply_coloring(&result.function, colors)]);
    assert_eq!(
        run_function(&in_registers, "keep", &[Value::Int(1)]).map(|o| o.prints),
        Ok(vec!["2 1".to_string()])
    );
    assert_eq!(
        run_function(&program, "keep", &[Value::Int(1)]).map(|o| o.prints),
        Ok(vec!["2 1".to_string()])
    );
    Ok(())
}

#[test]
fn test_too_few_registers_is_typed_failure() -> Result<()> {
    let program = Program::from_json(FIBONACCI)?;
    let registers = vec!["only".to_string()];

    let allocation = allocate_program(&program, &registers)?;
    assert!(!allocation.is_complete());

    let failure = allocation.failures().next().expect("main fails").clone();
    assert_eq!(failure.function, "main");
    assert!(!failure.remaining.is_empty());

    let error = Error::from(failure);
    assert!(matches!(error, Error::AllocationFailed(_)));
    assert!(error.to_string().contains("'main'"));
    Ok(())
}

#[test]
fn test_malformed_sibling_does_not_block_allocation() -> Result<()> {
    let broken = FunctionBuilder::new("broken")
        .op(Opcode::Add, "x", Type::Int, ["y"])
        .build();
    let mut program = Program::from_json(FIBONACCI)?;
    program.functions.push(broken.clone());

    let allocation = allocate_program(&program, &default_registers())?;
    assert!(!allocation.is_complete());
    assert_eq!(allocation.failures().count(), 0);

    let [(name, error)] = allocation.errors.as_slice() else {
        panic!("expected one error, got {:?}", allocation.errors);
    };
    assert_eq!(name, "broken");
    assert!(matches!(error, Error::FunctionFailed { function, .. } if function == "broken"));
    assert_eq!(allocation.program.function("broken"), Some(&broken));

    let main = allocation.program.main().expect("main allocated");
    let colors = allocation.colorings["main"].as_ref().expect("colored");
    let in_registers = Program::new(vec![apply_coloring(main, colors)]);
    assert_eq!(run(&in_registers, &[]).map(|o| o.prints), Ok(vec!["144".to_string()]));
    Ok(())
}

#[test]
fn test_unlinked_program_rejected() {
    let f = FunctionBuilder::new("main").call(None, "missing", []).build();
    let program = Program::new(vec![f]);
    assert!(matches!(
        allocate_program(&program, &default_registers()),
        Err(Error::Malformed { .. })
    ));
}
