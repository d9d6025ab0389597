//! Desugaring of compound built-ins into elementary arithmetic, so the
//! Jacobian of a vector-argument call is expanded componentwise before
//! differentiation ever runs.
//!
//! Two families are expanded here, both as *exact* algebraic rewrites
//! rather than approximations, so extraction soundness still holds
//! bit-for-bit on the real line:
//!
//! - **Vector built-ins** (`dot2d`, `cross2d`, `magnitude2d`,
//!   `normalize2d`, `distance2d`, and their 3D counterparts) expand into
//!   their definitions over scalar components. A call that *returns* a
//!   vector (`normalize2d`, `normalize3d`, `cross3d`) only makes sense
//!   under a [`crate::ir::ExprKind::Component`] access (`normalize2d(x,
//!   y).x`); a bare call to one is a caller bug, the same class the
//!   inliner already declines to detect.
//! - **`min`/`max`/`clamp`** expand via the identities
//!   `max(a, b) = (a + b + |a - b|) / 2` and
//!   `min(a, b) = (a + b - |a - b|) / 2`, and `clamp(x, lo, hi) =
//!   min(max(x, lo), hi)`. This is exact everywhere, including at the
//!   non-smooth tie point the discontinuity advisory already flags —
//!   it just means the resulting derivative there is whatever subgradient
//!   `abs` picks, not an approximation of the true (undefined) derivative.

use crate::ir::symbol::intern;
use crate::ir::{Expression, ExprKind};

/// Recursively desugar every vector/`min`/`max`/`clamp` built-in call in
/// `expr` into elementary arithmetic.
#[must_use]
pub fn expand(expr: &Expression) -> Expression {
    match expr.kind() {
        ExprKind::Number(_) | ExprKind::Variable(_) => expr.clone(),
        ExprKind::Binary(op, l, r) => Expression::binary(*op, expand(l), expand(r)),
        ExprKind::Unary(op, inner) => Expression::unary(*op, expand(inner)),
        ExprKind::Call(name, args) => {
            let args: Vec<Expression> = args.iter().map(expand).collect();
            expand_scalar_call(name.as_str().as_ref(), &args)
                .unwrap_or_else(|| Expression::call(*name, args))
        }
        ExprKind::Component(object, field) => {
            if let ExprKind::Call(name, args) = object.kind() {
                let args: Vec<Expression> = args.iter().map(expand).collect();
                if let Some(expanded) =
                    expand_vector_component(name.as_str().as_ref(), &args, field.as_str().as_ref())
                {
                    return expanded;
                }
                return Expression::component(Expression::call(*name, args), *field);
            }
            Expression::component(expand(object), *field)
        }
    }
}

fn call1(name: &str, arg: Expression) -> Expression {
    Expression::call(intern(name), vec![arg])
}

fn magnitude2(x: Expression, y: Expression) -> Expression {
    call1("sqrt", x.clone().mul(x).add(y.clone().mul(y)))
}

fn magnitude3(x: Expression, y: Expression, z: Expression) -> Expression {
    call1(
        "sqrt",
        x.clone()
            .mul(x)
            .add(y.clone().mul(y))
            .add(z.clone().mul(z)),
    )
}

fn abs_identity_max(a: Expression, b: Expression) -> Expression {
    let diff = a.clone().sub(b.clone());
    a.add(b)
        .add(call1("abs", diff))
        .div(Expression::number(2.0))
}

fn abs_identity_min(a: Expression, b: Expression) -> Expression {
    let diff = a.clone().sub(b.clone());
    a.add(b)
        .sub(call1("abs", diff))
        .div(Expression::number(2.0))
}

/// Expand a scalar-returning compound call. Returns `None` for built-ins
/// that are not desugared (elementary functions, or vector builtins that
/// return a vector and must be accessed through [`expand_vector_component`]).
fn expand_scalar_call(name: &str, args: &[Expression]) -> Option<Expression> {
    match (name, args) {
        ("max", [a, b]) => Some(abs_identity_max(a.clone(), b.clone())),
        ("min", [a, b]) => Some(abs_identity_min(a.clone(), b.clone())),
        ("clamp", [x, lo, hi]) => {
            Some(abs_identity_min(abs_identity_max(x.clone(), lo.clone()), hi.clone()))
        }
        ("dot2d", [ax, ay, bx, by]) => {
            Some(ax.clone().mul(bx.clone()).add(ay.clone().mul(by.clone())))
        }
        ("cross2d", [ax, ay, bx, by]) => {
            Some(ax.clone().mul(by.clone()).sub(ay.clone().mul(bx.clone())))
        }
        ("magnitude2d", [x, y]) => Some(magnitude2(x.clone(), y.clone())),
        ("distance2d", [ax, ay, bx, by]) => {
            Some(magnitude2(ax.clone().sub(bx.clone()), ay.clone().sub(by.clone())))
        }
        ("dot3d", [ax, ay, az, bx, by, bz]) => Some(
            ax.clone()
                .mul(bx.clone())
                .add(ay.clone().mul(by.clone()))
                .add(az.clone().mul(bz.clone())),
        ),
        ("magnitude3d", [x, y, z]) => Some(magnitude3(x.clone(), y.clone(), z.clone())),
        ("distance3d", [ax, ay, az, bx, by, bz]) => Some(magnitude3(
            ax.clone().sub(bx.clone()),
            ay.clone().sub(by.clone()),
            az.clone().sub(bz.clone()),
        )),
        _ => None,
    }
}

/// Expand `component(call(name, args), field)` for the vector-returning
/// built-ins (`normalize2d`, `normalize3d`, `cross3d`).
fn expand_vector_component(name: &str, args: &[Expression], field: &str) -> Option<Expression> {
    match (name, args) {
        ("normalize2d", [x, y]) => {
            let mag = magnitude2(x.clone(), y.clone());
            match field {
                "x" => Some(x.clone().div(mag)),
                "y" => Some(y.clone().div(mag)),
                _ => None,
            }
        }
        ("normalize3d", [x, y, z]) => {
            let mag = magnitude3(x.clone(), y.clone(), z.clone());
            match field {
                "x" => Some(x.clone().div(mag)),
                "y" => Some(y.clone().div(mag)),
                "z" => Some(z.clone().div(mag)),
                _ => None,
            }
        }
        ("cross3d", [ax, ay, az, bx, by, bz]) => match field {
            "x" => Some(ay.clone().mul(bz.clone()).sub(az.clone().mul(by.clone()))),
            "y" => Some(az.clone().mul(bx.clone()).sub(ax.clone().mul(bz.clone()))),
            "z" => Some(ax.clone().mul(by.clone()).sub(ay.clone().mul(bx.clone()))),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Expression;

    #[test]
    fn dot2d_expands_to_scalar_sum() {
        let ax = Expression::variable(intern("gradc-expand-ax"));
        let ay = Expression::variable(intern("gradc-expand-ay"));
        let bx = Expression::variable(intern("gradc-expand-bx"));
        let by = Expression::variable(intern("gradc-expand-by"));
        let call = Expression::call(intern("dot2d"), vec![ax, ay, bx, by]);
        let expanded = expand(&call);
        assert!(matches!(expanded.kind(), ExprKind::Binary(crate::ir::BinOp::Add, _, _)));
    }

    #[test]
    fn normalize2d_component_expands_to_division() {
        let x = Expression::variable(intern("gradc-expand-nx"));
        let y = Expression::variable(intern("gradc-expand-ny"));
        let call = Expression::call(intern("normalize2d"), vec![x, y]);
        let comp = Expression::component(call, intern("x"));
        let expanded = expand(&comp);
        assert!(matches!(expanded.kind(), ExprKind::Binary(crate::ir::BinOp::Div, _, _)));
    }

    #[test]
    fn bare_vector_call_without_component_is_left_unexpanded() {
        let x = Expression::variable(intern("gradc-expand-bare-x"));
        let y = Expression::variable(intern("gradc-expand-bare-y"));
        let call = Expression::call(intern("normalize2d"), vec![x, y]);
        let expanded = expand(&call);
        assert!(matches!(expanded.kind(), ExprKind::Call(..)));
    }
}
