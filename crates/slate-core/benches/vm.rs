//! Virtual machine benchmarks.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use slate_core::{Compiler, Parser, Vm};

fn compile(source: &str) -> slate_core::Bytecode {
    let program = Parser::new(source).parse_program().expect("should parse");
    Compiler::new().compile(&program).expect("should compile")
}

fn bench_fibonacci(c: &mut Criterion) {
    let bytecode = compile(
        "int fib(int n) {
             if (n <= 1) { return n; }
             return fib(n - 1) + fib(n - 2);
         }
         int r = fib(15);",
    );

    c.bench_function("vm_fib_15", |b| {
        let mut vm = Vm::new();
        b.iter(|| {
            vm.run(black_box(&bytecode)).expect("should run");
        });
    });
}

fn bench_loop(c: &mut Criterion) {
    let bytecode = compile(
        "int sum = 0;
         for (int i = 0; i < 10000; i = i + 1) {
             sum = sum + i;
         }",
    );

    c.bench_function("vm_loop_10k", |b| {
        let mut vm = Vm::new();
        b.iter(|| {
            vm.run(black_box(&bytecode)).expect("should run");
        });
    });
}

fn bench_compile(c: &mut Criterion) {
    let source = "int fib(int n) {
             if (n <= 1) { return n; }
             return fib(n - 1) + fib(n - 2);
         }
         int r = fib(15);";

    c.bench_function("compile_fib", |b| {
        b.iter(|| {
            compile(black_box(source));
        });
    });
}

criterion_group!(benches, bench_fibonacci, bench_loop, bench_compile);
criterion_main!(benches);
