//! Extraction/CSE-heavy benchmarks: functions whose value and gradients
//! share large subexpressions across roots, stressing the reference-
//! counting, temp-creation, and post-extraction-CSE passes.

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

fn vec2(name: &str) -> Param {
    Param {
        name: intern(name),
        ty: ParamType::Vec2,
        differentiable: true,
    }
}

fn component(param: &str, field: &str) -> Expression {
    Expression::component(Expression::variable(intern(param)), intern(field))
}

/// `sqrt(u.x^2 + u.y^2) / (u.x^2 + u.y^2)`: value and every gradient
/// component reuse the same squared-magnitude subexpression.
fn magnitude_ratio(n_vectors: usize) -> Function {
    let names: Vec<String> = (0..n_vectors).map(|i| format!("gradc-bench-ext-u{i}")).collect();
    let params: Vec<Param> = names.iter().map(|n| vec2(n)).collect();

    let mut mag_sq_terms = names.iter().map(|name| {
        component(name, "x")
            .mul(component(name, "x"))
            .add(component(name, "y").mul(component(name, "y")))
    });
    let mut mag_sq = mag_sq_terms.next().expect("at least one vector");
    for term in mag_sq_terms {
        mag_sq = mag_sq.add(term);
    }

    let sqrt_mag = Expression::call(intern("sqrt"), vec![mag_sq.clone()]);
    Function {
        params,
        bindings: vec![],
        ret: sqrt_mag.div(mag_sq),
    }
}

/// A chain of scalar products where every pairwise product recurs
/// across several terms of the return expression, forcing repeated
/// post-extraction-CSE candidates.
fn repeated_products(n: usize) -> Function {
    let names: Vec<String> = (0..n).map(|i| format!("gradc-bench-ext-p{i}")).collect();
    let params: Vec<Param> = names.iter().map(|n| scalar(n)).collect();

    let mut products = Vec::new();
    for window in names.windows(2) {
        let a = Expression::variable(intern(&window[0]));
        let b = Expression::variable(intern(&window[1]));
        products.push(a.mul(b));
    }
    let mut sum = products[0].clone();
    for p in &products[1..] {
        sum = sum.add(p.clone()).add(p.clone().mul(p.clone()));
    }
    Function {
        params,
        bindings: vec![],
        ret: sum,
    }
}

fn bench_magnitude_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_magnitude_ratio");
    for &n in &[1usize, 4, 8] {
        let function = magnitude_ratio(n);
        group.bench_function(format!("n{n}"), |b| {
            b.iter(|| compile(black_box(&function), &CompileOptions::default()).expect("compiles"))
        });
    }
    group.finish();
}

fn bench_repeated_products(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_repeated_products");
    for &n in &[4usize, 8, 12] {
        let function = repeated_products(n);
        group.bench_function(format!("n{n}"), |b| {
            b.iter(|| compile(black_box(&function), &CompileOptions::default()).expect("compiles"))
        });
    }
    group.finish();
}

fn bench_cse_threshold_sensitivity(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_cse_threshold_sensitivity");
    let function = magnitude_ratio(6);

    for &threshold in &[0u32, 3, 10] {
        let options = CompileOptions::new().cse_threshold(threshold);
        group.bench_function(format!("threshold{threshold}"), |b| {
            b.iter(|| compile(black_box(&function), &options).expect("compiles"))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_magnitude_ratio,
    bench_repeated_products,
    bench_cse_threshold_sensitivity,
);
criterion_main!(benches);
