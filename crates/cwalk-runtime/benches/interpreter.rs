//! Interpreter execution benchmarks
//!
//! Programs are built directly as trees, so these measure evaluation only:
//! - Loop and arithmetic throughput
//! - Call/return overhead and recursion
//! - Strict versus lazy declarations
//! - Observer and replay cost of stepping

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cwalk_runtime::ast::build::*;
use cwalk_runtime::ast::{AssignOp, BinaryOp, UpdateOp};
use cwalk_runtime::{
    EvaluatorConfig, ExecutionState, Interpreter, Program, StepAction, StepEvent, StepObserver,
    Stepper, Strategy,
};

fn interp_run(program: &Program, config: EvaluatorConfig) {
    let mut interp = Interpreter::with_config(config);
    let _ = interp.eval(program);
}

/// int sum = 0; for (int i = 0; i < n; i++) { sum += i; } sum
fn sum_loop(n: f64) -> Program {
    program(vec![
        var("int", "sum", Some(num(0.0))),
        for_(
            Some(var("int", "i", Some(num(0.0)))),
            Some(bin(BinaryOp::Lt, ident("i"), num(n))),
            Some(update(UpdateOp::Increment, ident("i"), false)),
            block(vec![expr(assign(AssignOp::AddAssign, ident("sum"), ident("i")))]),
        ),
        expr(ident("sum")),
    ])
}

/// int fib(int n) { if (n <= 1) return n; return fib(n - 1) + fib(n - 2); }
fn fibonacci(n: f64) -> Program {
    program(vec![
        func("int", "fib", &[("int", "n")], vec![
            if_(bin(BinaryOp::Le, ident("n"), num(1.0)), ret(Some(ident("n"))), None),
            ret(Some(bin(
                BinaryOp::Add,
                call("fib", vec![bin(BinaryOp::Sub, ident("n"), num(1.0))]),
                call("fib", vec![bin(BinaryOp::Sub, ident("n"), num(2.0))]),
            ))),
        ]),
        expr(call("fib", vec![num(n)])),
    ])
}

/// int inc(int x) { return x + 1; } int r = 0; while (r < n) { r = inc(r); } r
fn call_loop(n: f64) -> Program {
    program(vec![
        func("int", "inc", &[("int", "x")], vec![ret(Some(bin(
            BinaryOp::Add,
            ident("x"),
            num(1.0),
        )))]),
        var("int", "r", Some(num(0.0))),
        while_(
            bin(BinaryOp::Lt, ident("r"), num(n)),
            block(vec![expr(set("r", call("inc", vec![ident("r")])))]),
        ),
        expr(ident("r")),
    ])
}

/// Declarations in a loop body; only half of them are ever read
fn declarations(n: f64) -> Program {
    program(vec![
        var("int", "acc", Some(num(0.0))),
        for_(
            Some(var("int", "i", Some(num(0.0)))),
            Some(bin(BinaryOp::Lt, ident("i"), num(n))),
            Some(update(UpdateOp::Increment, ident("i"), false)),
            block(vec![
                var("int", "used", Some(bin(BinaryOp::Mul, ident("i"), num(3.0)))),
                var("int", "unused", Some(bin(BinaryOp::Mul, ident("i"), ident("i")))),
                expr(assign(AssignOp::AddAssign, ident("acc"), ident("used"))),
            ]),
        ),
        expr(ident("acc")),
    ])
}

// ============================================================================
// Basic Execution Benchmarks
// ============================================================================

fn bench_interp_arithmetic_loop(c: &mut Criterion) {
    let program = sum_loop(10_000.0);
    c.bench_function("interp_arithmetic_loop_10k", |b| {
        b.iter(|| interp_run(black_box(&program), EvaluatorConfig::default()));
    });
}

fn bench_interp_function_calls(c: &mut Criterion) {
    let program = call_loop(10_000.0);
    c.bench_function("interp_function_calls_10k", |b| {
        b.iter(|| interp_run(black_box(&program), EvaluatorConfig::default()));
    });
}

fn bench_interp_recursion(c: &mut Criterion) {
    let mut group = c.benchmark_group("interp_recursion");

    for depth in [10u32, 15, 20].iter() {
        let program = fibonacci(f64::from(*depth));
        group.bench_with_input(BenchmarkId::new("fibonacci", depth), &program, |b, p| {
            b.iter(|| interp_run(black_box(p), EvaluatorConfig::default()));
        });
    }

    group.finish();
}

// ============================================================================
// Strategy and Stepping Benchmarks
// ============================================================================

fn bench_interp_strategy(c: &mut Criterion) {
    let mut group = c.benchmark_group("interp_strategy");
    let program = declarations(2_000.0);

    for strategy in [Strategy::Strict, Strategy::Lazy] {
        let config = EvaluatorConfig::default().with_strategy(strategy);
        group.bench_with_input(
            BenchmarkId::new("declarations", format!("{strategy:?}")),
            &config,
            |b, config| {
                b.iter(|| interp_run(black_box(&program), config.clone()));
            },
        );
    }

    group.finish();
}

struct CountingObserver(u64);

impl StepObserver for CountingObserver {
    fn on_step(&mut self, _event: &StepEvent, _state: &ExecutionState) -> StepAction {
        self.0 += 1;
        StepAction::Continue
    }
}

fn bench_interp_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("interp_throughput");

    for iterations in [100u64, 1_000, 10_000].iter() {
        let program = sum_loop(*iterations as f64);
        group.throughput(Throughput::Elements(*iterations));
        group.bench_with_input(
            BenchmarkId::new("unobserved", iterations),
            &program,
            |b, p| b.iter(|| interp_run(black_box(p), EvaluatorConfig::default())),
        );
        group.bench_with_input(BenchmarkId::new("observed", iterations), &program, |b, p| {
            b.iter(|| {
                let mut interp = Interpreter::new();
                interp.set_observer(Box::new(CountingObserver(0)));
                let _ = interp.eval(black_box(p));
            })
        });
    }

    group.finish();
}

fn bench_stepper_seek(c: &mut Criterion) {
    let program = sum_loop(200.0);
    c.bench_function("stepper_seek_midpoint", |b| {
        b.iter(|| {
            let mut stepper = Stepper::new(program.clone(), EvaluatorConfig::default());
            let end = stepper.run_to_end().step;
            black_box(stepper.seek(end / 2).step)
        });
    });
}

criterion_group!(
    basic_benches,
    bench_interp_arithmetic_loop,
    bench_interp_function_calls,
    bench_interp_recursion
);

criterion_group!(
    advanced_benches,
    bench_interp_strategy,
    bench_interp_throughput,
    bench_stepper_seek
);

criterion_main!(basic_benches, advanced_benches);
