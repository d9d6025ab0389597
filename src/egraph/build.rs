//! Insert an [`Expression`] IR tree into an e-graph — hash-consing the
//! value expression and every gradient expression into one shared graph
//! ahead of saturation.
//!
//! The inverse direction — an e-class back to an [`Expression`] — is
//! [`super::extract::extract`]'s job; this module only ever hash-conses
//! forward, the same direction [`super::pattern::instantiate`] takes for
//! a rule's right-hand side.

use crate::ir::{BinOp, ExprKind, Expression, UnOp};

use super::graph::EGraph;
use super::node::ENode;
use super::EClassId;

/// Recursively hash-cons `expr` into `graph`, returning the e-class id
/// of its root.
///
/// `UnOp::Plus` is a no-op at the IR level (`+a` is just `a`), so it is
/// not materialized as its own e-node; the operand's class is returned
/// directly.
pub fn insert_expr(graph: &mut EGraph, expr: &Expression) -> EClassId {
    match expr.kind() {
        ExprKind::Number(n) => graph.add(ENode::num(*n)),
        ExprKind::Variable(name) => graph.add(ENode::Var(*name)),
        ExprKind::Binary(op, l, r) => {
            let l = insert_expr(graph, l);
            let r = insert_expr(graph, r);
            let node = match op {
                BinOp::Add => ENode::Add(l, r),
                BinOp::Sub => ENode::Sub(l, r),
                BinOp::Mul => ENode::Mul(l, r),
                BinOp::Div => ENode::Div(l, r),
                BinOp::Pow => ENode::Pow(l, r),
            };
            graph.add(node)
        }
        ExprKind::Unary(op, inner) => {
            let inner = insert_expr(graph, inner);
            match op {
                UnOp::Plus => inner,
                UnOp::Neg => graph.add(ENode::Neg(inner)),
            }
        }
        ExprKind::Call(name, args) => {
            let args = args.iter().map(|a| insert_expr(graph, a)).collect();
            graph.add(ENode::Call(*name, args))
        }
        ExprKind::Component(object, field) => {
            let object = insert_expr(graph, object);
            graph.add(ENode::Component(object, *field))
        }
    }
}
