//! Saturation-heavy benchmarks: functions whose gradients expand into
//! many distributive/commutative forms before the algebra rules settle.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use gradc::ir::symbol::intern;
use gradc::ir::{Expression, Function, Param, ParamType};
use gradc::{compile, CompileOptions};

fn scalar(name: &str) -> Param {
    Param {
        name: intern(name),
        ty: ParamType::Scalar,
        differentiable: true,
    }
}

/// `(a+b+c+...)^2`-style expansion: heavy on the distribute/combine-
/// like-terms rules once `^2` is rewritten to `a*a` by algebra rules.
fn polynomial_square(n: usize) -> Function {
    let names: Vec<String> = (0..n).map(|i| format!("gradc-bench-sat-v{i}")).collect();
    let params: Vec<Param> = names.iter().map(|n| scalar(n)).collect();
    let mut sum = Expression::variable(intern(&names[0]));
    for name in &names[1..] {
        sum = sum.add(Expression::variable(intern(name)));
    }
    Function {
        params,
        bindings: vec![],
        ret: sum.clone().mul(sum),
    }
}

fn dot_product(n: usize) -> Function {
    let a_names: Vec<String> = (0..n).map(|i| format!("gradc-bench-sat-dot-a{i}")).collect();
    let b_names: Vec<String> = (0..n).map(|i| format!("gradc-bench-sat-dot-b{i}")).collect();
    let mut params = Vec::new();
    for name in a_names.iter().chain(b_names.iter()) {
        params.push(scalar(name));
    }
    let mut terms = a_names
        .iter()
        .zip(&b_names)
        .map(|(a, b)| Expression::variable(intern(a)).mul(Expression::variable(intern(b))));
    let mut sum = terms.next().expect("at least one term");
    for term in terms {
        sum = sum.add(term);
    }
    Function {
        params,
        bindings: vec![],
        ret: sum,
    }
}

fn bench_polynomial_square(c: &mut Criterion) {
    let mut group = c.benchmark_group("saturate_polynomial_square");
    for &n in &[3usize, 5, 8] {
        let function = polynomial_square(n);
        group.bench_function(format!("n{n}"), |b| {
            b.iter(|| compile(black_box(&function), &CompileOptions::default()).expect("compiles"))
        });
    }
    group.finish();
}

fn bench_dot_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("saturate_dot_product");
    for &n in &[4usize, 8, 16] {
        let function = dot_product(n);
        group.bench_function(format!("n{n}"), |b| {
            b.iter(|| compile(black_box(&function), &CompileOptions::default()).expect("compiles"))
        });
    }
    group.finish();
}

fn bench_phased_vs_unphased(c: &mut Criterion) {
    let mut group = c.benchmark_group("saturate_phased_vs_unphased");
    let function = polynomial_square(6);

    group.bench_function("phased", |b| {
        let options = CompileOptions::new().phased(true);
        b.iter(|| compile(black_box(&function), &options).expect("compiles"))
    });

    group.bench_function("unphased", |b| {
        let options = CompileOptions::new().phased(false);
        b.iter(|| compile(black_box(&function), &options).expect("compiles"))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_polynomial_square,
    bench_dot_product,
    bench_phased_vs_unphased,
);
criterion_main!(benches);
