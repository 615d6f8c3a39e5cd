#![allow(unused)]
extern crate irkit;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use irkit::{
    analysis::{
        dataflow::{DataFlowSolver, LiveVariables},
        ssa, Cfg, Dominance,
    },
    compiler::{allocate_program, Optimizer, OptimizerConfig, DEFAULT_REGISTERS},
    ir::{Function, FunctionBuilder, Literal, Opcode, Program, Type},
};
use std::hint::black_box;

/// A chain of `diamonds` if/else blocks inside a counting loop.
///
/// Each arm recomputes the same products, so value numbering has work to do, and
/// every diamond reassigns the accumulators, so SSA construction places phis.
fn synthetic(name: &str, diamonds: usize) -> Function {
    let mut b = FunctionBuilder::new(name)
        .param("n", Type::Int)
        .constant("i", Type::Int, Literal::Int(0))
        .constant("acc", Type::Int, Literal::Int(1))
        .constant("one", Type::Int, Literal::Int(1))
        .label("head")
        .op(Opcode::Lt, "go", Type::Bool, ["i", "n"])
        .br("go", "d0", "exit");

    for d in 0..diamonds {
        let (this, left, right, next) = (
            format!("d{d}"),
            format!("l{d}"),
            format!("r{d}"),
            if d + 1 == diamonds { "latch".to_string() } else { format!("d{}", d + 1) },
        );
        b = b
            .label(&this)
            .op(Opcode::Mul, "sq", Type::Int, ["i", "i"])
            .op(Opcode::Gt, "c", Type::Bool, ["sq", "acc"])
            .br("c", &left, &right)
            .label(&left)
            .op(Opcode::Mul, "t", Type::Int, ["i", "i"])
            .op(Opcode::Add, "acc", Type::Int, ["acc", "t"])
            .jmp(&next)
            .label(&right)
            .op(Opcode::Mul, "t", Type::Int, ["i", "i"])
            .op(Opcode::Sub, "acc", Type::Int, ["t", "acc"])
            .jmp(&next);
    }

    b.label("latch")
        .op(Opcode::Add, "i", Type::Int, ["i", "one"])
        .jmp("head")
        .label("exit")
        .print(["acc"])
        .ret(None)
        .build()
}

fn program(functions: usize, diamonds: usize) -> Program {
    Program::new(
        (0..functions)
            .map(|f| synthetic(&format!("f{f}"), diamonds))
            .collect(),
    )
}

fn bench_analyses(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyses");
    for diamonds in [4, 16, 64] {
        let function = synthetic("f", diamonds);
        let cfg = Cfg::from_function(&function).unwrap();
        group.throughput(Throughput::Elements(cfg.len() as u64));

        group.bench_with_input(BenchmarkId::new("cfg", diamonds), &function, |b, f| {
            b.iter(|| black_box(Cfg::from_function(black_box(f)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("dominance", diamonds), &cfg, |b, cfg| {
            b.iter(|| black_box(Dominance::compute(black_box(cfg)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("liveness", diamonds), &cfg, |b, cfg| {
            b.iter(|| black_box(DataFlowSolver::new(LiveVariables).solve(black_box(cfg)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("ssa_roundtrip", diamonds), &cfg, |b, cfg| {
            b.iter(|| {
                let ssa = ssa::to_ssa(black_box(cfg.clone())).unwrap();
                black_box(ssa::from_ssa(ssa).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_optimize(c: &mut Criterion) {
    let program = program(32, 16);
    let mut group = c.benchmark_group("optimize");
    group.throughput(Throughput::Elements(program.functions.len() as u64));
    group.sample_size(20);

    let parallel = Optimizer::default();
    group.bench_function("parallel", |b| {
        b.iter(|| black_box(parallel.optimize_program(black_box(&program)).unwrap()));
    });

    let sequential = Optimizer::new(OptimizerConfig {
        parallel: false,
        ..OptimizerConfig::default()
    });
    group.bench_function("sequential", |b| {
        b.iter(|| black_box(sequential.optimize_program(black_box(&program)).unwrap()));
    });
    group.finish();
}

fn bench_allocate(c: &mut Criterion) {
    let optimized = Optimizer::default()
        .optimize_program(&program(8, 16))
        .unwrap()
        .program;
    let registers: Vec<String> = DEFAULT_REGISTERS.iter().map(|r| r.to_string()).collect();

    c.bench_function("allocate_program", |b| {
        b.iter(|| black_box(allocate_program(black_box(&optimized), &registers).unwrap()));
    });
}

criterion_group!(benches, bench_analyses, bench_optimize, bench_allocate);
criterion_main!(benches);
