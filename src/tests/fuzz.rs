//! Property-style fuzzing: random expression generation checked against
//! the plain-evaluator oracle in [`super::integration`], seeded so a
//! failure is reproducible.

use std::collections::HashMap;

use rand::{rngs::StdRng, RngExt, SeedableRng};

use crate::ir::symbol::intern;
use crate::ir::{BinOp, Expression, Function, Ident, Param, ParamType};
use crate::{compile, CompileOptions};

use super::integration::eval;

fn random_seed_rng() -> (StdRng, u64) {
    let seed: u64 = rand::random();
    (StdRng::seed_from_u64(seed), seed)
}

const UNARY_CALLS: &[&str] = &["sin", "cos", "exp", "sqrt", "abs"];

/// Build a random expression tree over `vars`, at most `depth` binary
/// levels deep, mixing arithmetic with the occasional unary built-in
/// call. Recursion bottoms out at a variable or a small integer literal.
fn generate_expr(rng: &mut StdRng, vars: &[Ident], depth: usize) -> Expression {
    if depth == 0 || rng.random_range(0..4) == 0 {
        return if rng.random_range(0..2) == 0 {
            Expression::variable(vars[rng.random_range(0..vars.len())])
        } else {
            Expression::number(f64::from(rng.random_range(1..=9)))
        };
    }
    if rng.random_range(0..5) == 0 {
        let name = UNARY_CALLS[rng.random_range(0..UNARY_CALLS.len())];
        let arg = generate_expr(rng, vars, depth - 1);
        // Keep `sqrt`/`log`-reachable arguments positive-ish to avoid
        // domain errors dominating the oracle comparison.
        let arg = if name == "sqrt" { arg.mul(arg.clone()).add(Expression::number(1.0)) } else { arg };
        return Expression::call(intern(name), vec![arg]);
    }
    let l = generate_expr(rng, vars, depth - 1);
    let r = generate_expr(rng, vars, depth - 1);
    let op = match rng.random_range(0..4) {
        0 => BinOp::Add,
        1 => BinOp::Sub,
        2 => BinOp::Mul,
        _ => return l.div(r.add(Expression::number(5.0))), // keep divisors away from zero
    };
    Expression::binary(op, l, r)
}

fn make_env(vars: &[Ident], rng: &mut StdRng) -> HashMap<Ident, f64> {
    vars.iter().map(|&v| (v, rng.random_range(-5..=5) as f64 + 0.25)).collect()
}

/// Compiling a random expression must not change the value it computes:
/// differentiation never runs on the return expression itself, but
/// local simplification and e-graph extraction both rewrite it, and
/// either stage getting the rewrite wrong would show up here.
#[test]
fn fuzz_compiled_value_matches_raw_evaluation() {
    for _ in 0..200 {
        let (mut rng, seed) = random_seed_rng();
        let vars: Vec<Ident> = (0..4).map(|i| intern(&format!("gradc-fuzz-var-{i}"))).collect();
        let params: Vec<Param> = vars
            .iter()
            .map(|&name| Param { name, ty: ParamType::Scalar, differentiable: true })
            .collect();
        let expr = generate_expr(&mut rng, &vars, 5);
        let function = Function { params, bindings: vec![], ret: expr.clone() };

        let Ok(compiled) = compile(&function, &CompileOptions::default()) else {
            continue; // a malformed random tree (e.g. arity mismatch) is not the property under test
        };
        let env = make_env(&vars, &mut rng);
        let mut full_env = env.clone();
        for temp in &compiled.temps {
            full_env.insert(temp.name, eval(&temp.expr, &full_env));
        }
        let raw = eval(&expr, &env);
        let compiled_value = eval(&compiled.value, &full_env);
        if !raw.is_finite() || !compiled_value.is_finite() {
            continue; // domain edge cases (log of a near-zero, etc.) are not the property under test
        }
        let tolerance = 1e-6 * raw.abs().max(1.0);
        assert!(
            (raw - compiled_value).abs() <= tolerance,
            "seed {seed}: raw {raw} vs compiled {compiled_value}, expr {expr:?}"
        );
    }
}

/// Compiling twice from the same `Function` must produce byte-identical
/// output regardless of which random tree was compiled — determinism
/// is a whole-pipeline property, not just one covered by the hand-picked
/// end-to-end scenarios.
#[test]
fn fuzz_compile_is_deterministic_across_random_inputs() {
    for _ in 0..100 {
        let (mut rng, seed) = random_seed_rng();
        let vars: Vec<Ident> = (0..3).map(|i| intern(&format!("gradc-fuzz-det-var-{i}"))).collect();
        let params: Vec<Param> = vars
            .iter()
            .map(|&name| Param { name, ty: ParamType::Scalar, differentiable: true })
            .collect();
        let expr = generate_expr(&mut rng, &vars, 4);
        let function = Function { params, bindings: vec![], ret: expr };

        let (Ok(first), Ok(second)) = (
            compile(&function, &CompileOptions::default()),
            compile(&function, &CompileOptions::default()),
        ) else {
            continue;
        };
        assert_eq!(first.value, second.value, "seed {seed}: non-deterministic extraction");
        assert_eq!(first.temps.len(), second.temps.len(), "seed {seed}: non-deterministic temp count");
    }
}
