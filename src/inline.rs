//! The inliner.
//!
//! Walks the statement list once, producing a map from intermediate name
//! to its defining expression, then substitutes the return expression's
//! free variables against that map until only parameter components and
//! number literals remain. Bindings are assumed single-assignment and
//! forward-use only; a binding that (incorrectly) references a name
//! defined later, or itself, is a caller bug the inliner does not detect
//! — it is simply left unexpanded, exactly as an undefined variable
//! would be.

use crate::ir::{BinOp, ExprKind, Expression, Function, Ident, UnOp};
use rustc_hash::FxHashMap;

/// Inline every intermediate binding of `function` into its return
/// expression.
#[must_use]
pub fn inline(function: &Function) -> Expression {
    let mut defined: FxHashMap<Ident, Expression> = FxHashMap::default();
    for (name, expr) in &function.bindings {
        let substituted = substitute(expr, &defined);
        defined.insert(*name, substituted);
    }
    substitute(&function.ret, &defined)
}

fn substitute(expr: &Expression, defined: &FxHashMap<Ident, Expression>) -> Expression {
    match expr.kind() {
        ExprKind::Number(_) => expr.clone(),
        ExprKind::Variable(name) => defined.get(name).cloned().unwrap_or_else(|| expr.clone()),
        ExprKind::Binary(op, l, r) => binary(*op, substitute(l, defined), substitute(r, defined)),
        ExprKind::Unary(op, inner) => unary(*op, substitute(inner, defined)),
        ExprKind::Call(name, args) => {
            Expression::call(*name, args.iter().map(|a| substitute(a, defined)).collect())
        }
        ExprKind::Component(object, field) => {
            Expression::component(substitute(object, defined), *field)
        }
    }
}

fn binary(op: BinOp, l: Expression, r: Expression) -> Expression {
    Expression::binary(op, l, r)
}

fn unary(op: UnOp, inner: Expression) -> Expression {
    Expression::unary(op, inner)
}
