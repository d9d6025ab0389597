//! The built-in function registry.
//!
//! A static table, built once and treated as read-only configuration
//! thereafter, mapping an interned name to its definition.
//!
//! Only the *elementary* scalar functions (`sin`, `cos`, ..., `atan2`,
//! `pow`) carry a direct partial-derivative rule here. The vector
//! builtins (`dot2d`, `cross2d`, ...) and the non-smooth `min`/`max`/
//! `clamp` family are desugared into elementary arithmetic by
//! [`crate::expand`] before the differentiator ever sees them — see that
//! module for why that is exact, not an approximation.

use crate::error::{CompileError, Result};
use crate::ir::Ident;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

/// A known discontinuity or non-smooth point, surfaced as an advisory
/// warning rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discontinuity {
    /// `atan2`'s branch cut at `x < 0, y ≈ 0`.
    Atan2BranchCut,
    /// `min`/`max` are non-smooth where their arguments are equal.
    MinMaxTie,
    /// `clamp` is non-smooth at its bounds.
    ClampBound,
}

/// One partial derivative rule: given a built-in's evaluated argument
/// count, return `∂f/∂arg_i` for each `i`. The differentiator sums
/// `∂f/∂arg_i * d(arg_i)/dx` via the chain rule.
pub type PartialsFn = fn(&[crate::ir::Expression]) -> Vec<crate::ir::Expression>;

/// A registered built-in function.
#[derive(Clone, Copy)]
pub struct BuiltinDef {
    /// Canonical name.
    pub name: &'static str,
    /// Accepted argument count.
    pub arity: RangeInclusive<usize>,
    /// Set for built-ins with a known discontinuity/non-smooth point.
    pub discontinuity: Option<Discontinuity>,
    /// `Some` for elementary built-ins with a direct gradient rule.
    /// `None` for built-ins that [`crate::expand`] desugars before
    /// differentiation (vector builtins, `min`/`max`/`clamp`).
    pub partials: Option<PartialsFn>,
}

impl BuiltinDef {
    /// # Errors
    /// Returns [`CompileError::ArityMismatch`] if `got` is outside `self.arity`.
    pub fn check_arity(&self, got: usize) -> Result<()> {
        if self.arity.contains(&got) {
            Ok(())
        } else {
            Err(CompileError::ArityMismatch {
                name: self.name.to_owned(),
                expected: format_arity(&self.arity),
                got,
            })
        }
    }
}

fn format_arity(arity: &RangeInclusive<usize>) -> String {
    if arity.start() == arity.end() {
        arity.start().to_string()
    } else {
        format!("{}..={}", arity.start(), arity.end())
    }
}

use crate::ir::Expression;

fn unary(name: &'static str, partials: PartialsFn) -> BuiltinDef {
    BuiltinDef {
        name,
        arity: 1..=1,
        discontinuity: None,
        partials: Some(partials),
    }
}

fn sin_partials(args: &[Expression]) -> Vec<Expression> {
    vec![call1("cos", args[0].clone())]
}

fn cos_partials(args: &[Expression]) -> Vec<Expression> {
    vec![call1("sin", args[0].clone()).neg()]
}

fn tan_partials(args: &[Expression]) -> Vec<Expression> {
    let c = call1("cos", args[0].clone());
    vec![Expression::number(1.0).div(c.clone().mul(c))]
}

fn asin_partials(args: &[Expression]) -> Vec<Expression> {
    let one_minus_sq = Expression::number(1.0).sub(args[0].clone().mul(args[0].clone()));
    vec![Expression::number(1.0).div(call1("sqrt", one_minus_sq))]
}

fn acos_partials(args: &[Expression]) -> Vec<Expression> {
    asin_partials(args).into_iter().map(Expression::neg).collect()
}

fn atan_partials(args: &[Expression]) -> Vec<Expression> {
    let denom = Expression::number(1.0).add(args[0].clone().mul(args[0].clone()));
    vec![Expression::number(1.0).div(denom)]
}

fn exp_partials(args: &[Expression]) -> Vec<Expression> {
    vec![call1("exp", args[0].clone())]
}

fn log_partials(args: &[Expression]) -> Vec<Expression> {
    vec![Expression::number(1.0).div(args[0].clone())]
}

fn sqrt_partials(args: &[Expression]) -> Vec<Expression> {
    let two_sqrt = Expression::number(2.0).mul(call1("sqrt", args[0].clone()));
    vec![Expression::number(1.0).div(two_sqrt)]
}

fn abs_partials(args: &[Expression]) -> Vec<Expression> {
    // d|x|/dx = sign(x), reported as abs(x)/x.
    vec![call1("abs", args[0].clone()).div(args[0].clone())]
}

fn atan2_partials(args: &[Expression]) -> Vec<Expression> {
    // atan2(y, x): d/dy = x/(x²+y²), d/dx = -y/(x²+y²).
    let y = args[0].clone();
    let x = args[1].clone();
    let denom = x.clone().mul(x.clone()).add(y.clone().mul(y.clone()));
    vec![x.div(denom.clone()), y.neg().div(denom)]
}

fn pow_partials(args: &[Expression]) -> Vec<Expression> {
    // d(a^b)/da, d(a^b)/db via the general rule; the differentiator
    // substitutes the literal-exponent specialization for `Binary(Pow, ..)`
    // itself, this path only serves the `pow(a, b)` call spelling.
    let a = args[0].clone();
    let b = args[1].clone();
    let a_pow_b = a.clone().pow(b.clone());
    let d_da = b.clone().mul(a.clone().pow(b.clone().sub(Expression::number(1.0))));
    let d_db = a_pow_b.mul(call1("log", a));
    vec![d_da, d_db]
}

fn call1(name: &str, arg: Expression) -> Expression {
    Expression::call(crate::ir::symbol::intern(name), vec![arg])
}

fn binary(name: &'static str, discontinuity: Option<Discontinuity>, partials: PartialsFn) -> BuiltinDef {
    BuiltinDef {
        name,
        arity: 2..=2,
        discontinuity,
        partials: Some(partials),
    }
}

/// Vector/non-smooth built-ins desugared by [`crate::expand`]: no direct
/// `partials` rule, just arity + advisory metadata.
fn desugared(name: &'static str, arity: RangeInclusive<usize>, discontinuity: Option<Discontinuity>) -> BuiltinDef {
    BuiltinDef {
        name,
        arity,
        discontinuity,
        partials: None,
    }
}

fn all_definitions() -> Vec<BuiltinDef> {
    vec![
        unary("sin", sin_partials),
        unary("cos", cos_partials),
        unary("tan", tan_partials),
        unary("asin", asin_partials),
        unary("acos", acos_partials),
        unary("atan", atan_partials),
        unary("exp", exp_partials),
        unary("log", log_partials),
        unary("sqrt", sqrt_partials),
        unary("abs", abs_partials),
        binary("atan2", Some(Discontinuity::Atan2BranchCut), atan2_partials),
        binary("pow", None, pow_partials),
        desugared("min", 2..=2, Some(Discontinuity::MinMaxTie)),
        desugared("max", 2..=2, Some(Discontinuity::MinMaxTie)),
        desugared("clamp", 3..=3, Some(Discontinuity::ClampBound)),
        desugared("dot2d", 4..=4, None),
        desugared("cross2d", 4..=4, None),
        desugared("magnitude2d", 2..=2, None),
        desugared("normalize2d", 2..=2, None),
        desugared("distance2d", 4..=4, None),
        desugared("dot3d", 6..=6, None),
        desugared("cross3d", 6..=6, None),
        desugared("magnitude3d", 3..=3, None),
        desugared("normalize3d", 3..=3, None),
        desugared("distance3d", 6..=6, None),
    ]
}

fn registry() -> &'static HashMap<Ident, BuiltinDef> {
    static REGISTRY: OnceLock<HashMap<Ident, BuiltinDef>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        all_definitions()
            .into_iter()
            .map(|def| (crate::ir::symbol::intern(def.name), def))
            .collect()
    })
}

/// Look up a built-in by its (already interned) call name.
#[must_use]
pub fn lookup(name: Ident) -> Option<&'static BuiltinDef> {
    registry().get(&name)
}

/// Look up a built-in by name, erroring if unknown.
///
/// # Errors
/// Returns [`CompileError::UnknownBuiltin`] if `name` is not registered.
pub fn require(name: Ident) -> Result<&'static BuiltinDef> {
    lookup(name).ok_or_else(|| CompileError::UnknownBuiltin {
        name: (*name.as_str()).to_owned(),
    })
}
