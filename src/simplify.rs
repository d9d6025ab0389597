//! The local simplifier.
//!
//! A fixpoint bottom-up rewriter applying safe algebraic rules directly
//! on the IR — constant folding, identity elimination, double negation,
//! sign propagation, component distribution, and a handful of patterns
//! that arise specifically from the differentiator's raw output. This
//! stage exists purely to bound the e-graph's starting size — it is a
//! complexity reducer, not a correctness contract; the e-graph optimizer
//! is the component that actually has to be correct under every rewrite.
//!
//! Collapsed to a single ordered list rather than a categorized,
//! user-extensible rule registry, since this stage's rule set is a
//! fixed few dozen patterns.

use crate::ir::{BinOp, ExprKind, Expression, UnOp};

const MAX_ITERATIONS: usize = 64;

/// Simplify `expr` to a fixpoint: converges when one pass produces a
/// structurally equal output.
#[must_use]
pub fn simplify(expr: &Expression) -> Expression {
    let mut current = expr.clone();
    for _ in 0..MAX_ITERATIONS {
        let next = pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
    current
}

/// One bottom-up pass: simplify children first, then this node.
fn pass(expr: &Expression) -> Expression {
    let rebuilt = match expr.kind() {
        ExprKind::Number(_) | ExprKind::Variable(_) => expr.clone(),
        ExprKind::Binary(op, l, r) => Expression::binary(*op, pass(l), pass(r)),
        ExprKind::Unary(op, inner) => Expression::unary(*op, pass(inner)),
        ExprKind::Call(name, args) => Expression::call(*name, args.iter().map(pass).collect()),
        ExprKind::Component(object, field) => {
            let object = pass(object);
            distribute_component(object, *field)
        }
    };
    apply_node_rules(rebuilt)
}

fn as_number(expr: &Expression) -> Option<f64> {
    match expr.kind() {
        ExprKind::Number(n) => Some(*n),
        _ => None,
    }
}

fn is_zero(expr: &Expression) -> bool {
    as_number(expr) == Some(0.0)
}

fn is_one(expr: &Expression) -> bool {
    as_number(expr) == Some(1.0)
}

/// `true` if `l` and `r` are `a*b` and `b*a` for the same `a`/`b` in
/// either order — a commutative match the plain `l == r` check above
/// misses since the factors are swapped, not identical.
fn commuted_product_match(l: &Expression, r: &Expression) -> bool {
    let (ExprKind::Binary(BinOp::Mul, la, lb), ExprKind::Binary(BinOp::Mul, ra, rb)) =
        (l.kind(), r.kind())
    else {
        return false;
    };
    la == rb && lb == ra
}

/// If both `l` and `r` are `n * x` for the same numeric literal `n`,
/// return the two `x` factors. Lets the `Div` arm cancel a common
/// numeric multiplier without a full polynomial-GCD pass.
fn shared_numeric_factor(l: &Expression, r: &Expression) -> Option<(Expression, Expression)> {
    let (ExprKind::Binary(BinOp::Mul, ln, lx), ExprKind::Binary(BinOp::Mul, rn, rx)) =
        (l.kind(), r.kind())
    else {
        return None;
    };
    let (ln, rn) = (as_number(ln)?, as_number(rn)?);
    if ln == rn && ln != 0.0 {
        Some((lx.as_ref().clone(), rx.as_ref().clone()))
    } else {
        None
    }
}

/// `(a + b).x -> a.x + b.x` and similarly for the other binary ops:
/// distribution of component access over binary operators.
fn distribute_component(object: Expression, field: crate::ir::Ident) -> Expression {
    if let ExprKind::Binary(op, l, r) = object.kind() {
        let (op, l, r) = (*op, l.clone(), r.clone());
        return Expression::binary(
            op,
            Expression::component(l, field),
            Expression::component(r, field),
        );
    }
    if let ExprKind::Unary(op, inner) = object.kind() {
        return Expression::unary(*op, Expression::component(inner.clone(), field));
    }
    Expression::component(object, field)
}

/// Rewrites applied at a single node after its children are simplified.
fn apply_node_rules(expr: Expression) -> Expression {
    match expr.kind().clone() {
        ExprKind::Binary(op, l, r) => simplify_binary(op, l, r),
        ExprKind::Unary(op, inner) => simplify_unary(op, inner),
        _ => expr,
    }
}

#[allow(
    clippy::too_many_lines,
    reason = "one rewrite table per binary op reads better flat than split across helpers"
)]
fn simplify_binary(op: BinOp, l: Expression, r: Expression) -> Expression {
    if let (Some(a), Some(b)) = (as_number(&l), as_number(&r)) {
        // Constant folding; IEEE-754 results (incl. NaN/Inf) pass
        // through unchanged — the compiler continues.
        let folded = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Pow => a.powf(b),
        };
        return Expression::number(folded);
    }

    match op {
        BinOp::Add => {
            if is_zero(&l) {
                return r;
            }
            if is_zero(&r) {
                return l;
            }
            if l == r {
                // a + a -> 2*a
                return Expression::number(2.0).mul(l);
            }
            if let (ExprKind::Unary(UnOp::Neg, nr), _) = (r.kind(), ()) {
                // a + (-b) -> a - b
                return l.sub(nr.clone());
            }
            if commuted_product_match(&l, &r) {
                // a*b + b*a -> 2*(a*b)
                return Expression::number(2.0).mul(l);
            }
            l.add(r)
        }
        BinOp::Sub => {
            if is_zero(&r) {
                return l;
            }
            if l == r {
                return Expression::number(0.0);
            }
            if is_zero(&l) {
                return r.neg();
            }
            l.sub(r)
        }
        BinOp::Mul => {
            if is_zero(&l) || is_zero(&r) {
                return Expression::number(0.0);
            }
            if is_one(&l) {
                return r;
            }
            if is_one(&r) {
                return l;
            }
            if let ExprKind::Unary(UnOp::Neg, inner) = l.kind() {
                return simplify_binary(BinOp::Mul, inner.clone(), r).neg();
            }
            if let ExprKind::Unary(UnOp::Neg, inner) = r.kind() {
                return simplify_binary(BinOp::Mul, l, inner.clone()).neg();
            }
            l.mul(r)
        }
        BinOp::Div => {
            if is_one(&r) {
                return l;
            }
            if l == r && !is_zero(&l) {
                return Expression::number(1.0);
            }
            if let Some((l_factor, r_factor)) = shared_numeric_factor(&l, &r) {
                // (n*a)/(n*c) -> a/c, e.g. the (a*b + b*a)/(2*c) shape
                // the product rule plus CSE tends to produce, already
                // folded by the Add arm into 2*(a*b) before this Div runs.
                return l_factor.div(r_factor);
            }
            l.div(r)
        }
        BinOp::Pow => {
            if is_zero(&r) {
                return Expression::number(1.0);
            }
            if is_one(&r) {
                return l;
            }
            l.pow(r)
        }
    }
}

fn simplify_unary(op: UnOp, inner: Expression) -> Expression {
    match op {
        UnOp::Plus => inner,
        UnOp::Neg => {
            if let Some(n) = as_number(&inner) {
                return Expression::number(-n);
            }
            if let ExprKind::Unary(UnOp::Neg, doubly_negated) = inner.kind() {
                // double negation
                return doubly_negated.clone();
            }
            inner.neg()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::symbol::intern;

    #[test]
    fn folds_constants() {
        let expr = Expression::number(2.0).add(Expression::number(3.0));
        assert_eq!(simplify(&expr), Expression::number(5.0));
    }

    #[test]
    fn eliminates_additive_identity() {
        let x = intern("gradc-simplify-x");
        let expr = Expression::variable(x).add(Expression::number(0.0));
        assert_eq!(simplify(&expr), Expression::variable(x));
    }

    #[test]
    fn eliminates_self_subtraction() {
        let x = intern("gradc-simplify-y");
        let expr = Expression::variable(x).sub(Expression::variable(x));
        assert_eq!(simplify(&expr), Expression::number(0.0));
    }

    #[test]
    fn combines_like_terms() {
        let x = intern("gradc-simplify-z");
        let expr = Expression::variable(x).add(Expression::variable(x));
        assert_eq!(
            simplify(&expr),
            Expression::number(2.0).mul(Expression::variable(x))
        );
    }

    #[test]
    fn double_negation_cancels() {
        let x = intern("gradc-simplify-w");
        let expr = Expression::variable(x).neg().neg();
        assert_eq!(simplify(&expr), Expression::variable(x));
    }

    #[test]
    fn distributes_component_over_addition() {
        let u = intern("gradc-simplify-u");
        let v = intern("gradc-simplify-v");
        let expr = Expression::component(
            Expression::variable(u).add(Expression::variable(v)),
            intern("x"),
        );
        let expected = Expression::component(Expression::variable(u), intern("x"))
            .add(Expression::component(Expression::variable(v), intern("x")));
        assert_eq!(simplify(&expr), expected);
    }
}
