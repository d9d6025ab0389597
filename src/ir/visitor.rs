//! Visitor pattern for [`Expression`] traversal.
//!
//! Exposed so the (external) type checker or emitter can walk the IR
//! without depending on inliner/differentiator/simplifier internals.

use super::expr::{BinOp, ExprKind, Expression, UnOp};
use super::symbol::Ident;

/// Visit the nodes of an [`Expression`] tree.
///
/// Each method returns `true` to continue into that node's children, or
/// `false` to skip them. Default implementations continue.
pub trait ExprVisitor {
    /// Visit a number literal.
    fn visit_number(&mut self, value: f64) {
        let _ = value;
    }

    /// Visit a variable reference.
    fn visit_variable(&mut self, name: Ident) {
        let _ = name;
    }

    /// Visit a binary operation; returns whether to visit `left`/`right`.
    fn visit_binary(&mut self, op: BinOp, left: &Expression, right: &Expression) -> bool {
        let _ = (op, left, right);
        true
    }

    /// Visit a unary operation; returns whether to visit the operand.
    fn visit_unary(&mut self, op: UnOp, operand: &Expression) -> bool {
        let _ = (op, operand);
        true
    }

    /// Visit a function call; returns whether to visit its arguments.
    fn visit_call(&mut self, name: Ident, args: &[Expression]) -> bool {
        let _ = (name, args);
        true
    }

    /// Visit a field-access node; returns whether to visit the object.
    fn visit_component(&mut self, object: &Expression, field: Ident) -> bool {
        let _ = (object, field);
        true
    }
}

/// Walk `expr` in pre-order (parent before children).
pub fn walk_expr<V: ExprVisitor>(expr: &Expression, visitor: &mut V) {
    match expr.kind() {
        ExprKind::Number(n) => visitor.visit_number(*n),
        ExprKind::Variable(name) => visitor.visit_variable(*name),
        ExprKind::Binary(op, l, r) => {
            if visitor.visit_binary(*op, l, r) {
                walk_expr(l, visitor);
                walk_expr(r, visitor);
            }
        }
        ExprKind::Unary(op, inner) => {
            if visitor.visit_unary(*op, inner) {
                walk_expr(inner, visitor);
            }
        }
        ExprKind::Call(name, args) => {
            if visitor.visit_call(*name, args) {
                for arg in args {
                    walk_expr(arg, visitor);
                }
            }
        }
        ExprKind::Component(object, field) => {
            if visitor.visit_component(object, *field) {
                walk_expr(object, visitor);
            }
        }
    }
}

/// Counts every node visited; a minimal [`ExprVisitor`] example and a
/// handy AST-size guard against pathologically deep or wide input trees.
#[derive(Debug, Default)]
pub struct NodeCounter {
    /// Number of nodes visited so far.
    pub count: usize,
}

impl ExprVisitor for NodeCounter {
    fn visit_number(&mut self, _value: f64) {
        self.count += 1;
    }

    fn visit_variable(&mut self, _name: Ident) {
        self.count += 1;
    }

    fn visit_binary(&mut self, _op: BinOp, _left: &Expression, _right: &Expression) -> bool {
        self.count += 1;
        true
    }

    fn visit_unary(&mut self, _op: UnOp, _operand: &Expression) -> bool {
        self.count += 1;
        true
    }

    fn visit_call(&mut self, _name: Ident, _args: &[Expression]) -> bool {
        self.count += 1;
        true
    }

    fn visit_component(&mut self, _object: &Expression, _field: Ident) -> bool {
        self.count += 1;
        true
    }
}

/// Count the nodes in `expr`.
#[must_use]
pub fn node_count(expr: &Expression) -> usize {
    let mut counter = NodeCounter::default();
    walk_expr(expr, &mut counter);
    counter.count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::symbol::intern;

    #[test]
    fn counts_every_node() {
        let x = intern("gradc-visitor-test-x");
        let expr = Expression::variable(x)
            .mul(Expression::number(2.0))
            .add(Expression::number(1.0));
        // x, 2.0, (x*2.0), 1.0, (x*2.0 + 1.0)
        assert_eq!(node_count(&expr), 5);
    }
}
