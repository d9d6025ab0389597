//! The expression IR.
//!
//! Trees are immutable; every transformation in this crate returns a new
//! tree rather than mutating in place. Structural equality is recursive
//! and total, with a precomputed hash for O(1) inequality rejection.

use super::symbol::Ident;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a ^ b`
    Pow,
}

/// Unary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// `+a` (identity; kept so the IR round-trips unary-plus syntax)
    Plus,
    /// `-a`
    Neg,
}

/// A symbolic expression node.
///
/// Wraps [`ExprKind`] with a precomputed structural hash so that
/// `PartialEq` can fast-reject unequal trees before recursing.
#[derive(Debug, Clone)]
pub struct Expression {
    hash: u64,
    kind: Arc<ExprKind>,
}

/// The variant tag of an [`Expression`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A number literal.
    Number(f64),
    /// A reference to a parameter component or intermediate binding.
    Variable(Ident),
    /// A binary operation.
    Binary(BinOp, Expression, Expression),
    /// A unary operation.
    Unary(UnOp, Expression),
    /// A named function call (built-in or, before inlining, a user intermediate).
    Call(Ident, Vec<Expression>),
    /// Field access on a vector/struct-valued object, e.g. `u.x`.
    Component(Expression, Ident),
}

fn hash_kind(kind: &ExprKind) -> u64 {
    let mut hasher = ahash::AHasher::default();
    std::mem::discriminant(kind).hash(&mut hasher);
    match kind {
        ExprKind::Number(n) => n.to_bits().hash(&mut hasher),
        ExprKind::Variable(id) => id.hash(&mut hasher),
        ExprKind::Binary(op, l, r) => {
            op.hash(&mut hasher);
            l.hash.hash(&mut hasher);
            r.hash.hash(&mut hasher);
        }
        ExprKind::Unary(op, inner) => {
            op.hash(&mut hasher);
            inner.hash.hash(&mut hasher);
        }
        ExprKind::Call(name, args) => {
            name.hash(&mut hasher);
            args.len().hash(&mut hasher);
            for a in args {
                a.hash.hash(&mut hasher);
            }
        }
        ExprKind::Component(obj, field) => {
            obj.hash.hash(&mut hasher);
            field.hash(&mut hasher);
        }
    }
    hasher.finish()
}

impl Expression {
    fn new(kind: ExprKind) -> Self {
        let hash = hash_kind(&kind);
        Self {
            hash,
            kind: Arc::new(kind),
        }
    }

    /// Build a number literal.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::new(ExprKind::Number(value))
    }

    /// Build a variable reference.
    #[must_use]
    pub fn variable(name: Ident) -> Self {
        Self::new(ExprKind::Variable(name))
    }

    /// Build a binary operation.
    #[must_use]
    pub fn binary(op: BinOp, left: Self, right: Self) -> Self {
        Self::new(ExprKind::Binary(op, left, right))
    }

    /// Build a unary operation.
    #[must_use]
    pub fn unary(op: UnOp, operand: Self) -> Self {
        Self::new(ExprKind::Unary(op, operand))
    }

    /// Build a function call.
    #[must_use]
    pub fn call(name: Ident, args: Vec<Self>) -> Self {
        Self::new(ExprKind::Call(name, args))
    }

    /// Build a field-access expression.
    #[must_use]
    pub fn component(object: Self, field: Ident) -> Self {
        Self::new(ExprKind::Component(object, field))
    }

    /// View this expression's kind.
    #[must_use]
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// `self + other`
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::binary(BinOp::Add, self, other)
    }

    /// `self - other`
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self::binary(BinOp::Sub, self, other)
    }

    /// `self * other`
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Self::binary(BinOp::Mul, self, other)
    }

    /// `self / other`
    #[must_use]
    pub fn div(self, other: Self) -> Self {
        Self::binary(BinOp::Div, self, other)
    }

    /// `self ^ other`
    #[must_use]
    pub fn pow(self, other: Self) -> Self {
        Self::binary(BinOp::Pow, self, other)
    }

    /// `-self`
    #[must_use]
    pub fn neg(self) -> Self {
        Self::unary(UnOp::Neg, self)
    }

    /// The structural hash used for O(1) inequality rejection.
    #[must_use]
    pub fn structural_hash(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.kind == other.kind
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::symbol::intern;

    #[test]
    fn structurally_equal_trees_compare_equal() {
        let x = intern("gradc-expr-test-x");
        let a = Expression::variable(x).mul(Expression::number(2.0));
        let b = Expression::variable(x).mul(Expression::number(2.0));
        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn different_trees_compare_unequal() {
        let x = intern("gradc-expr-test-x2");
        let a = Expression::variable(x).mul(Expression::number(2.0));
        let b = Expression::variable(x).mul(Expression::number(3.0));
        assert_ne!(a, b);
    }
}
