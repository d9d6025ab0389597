//! The e-node variant.
//!
//! Isomorphic to [`crate::ir::ExprKind`] but with children replaced by
//! e-class ids, plus one variant [`ENode::Inv`] doesn't exist in the IR
//! at all: `inv` (reciprocal) is a rewrite-only node, introduced by the
//! algebra rules' division/reciprocal identities and emitted back out as
//! `1/x` by the extractor.
//!
//! `ENode` derives `Eq`/`Hash` directly rather than serializing to a
//! canonical string key: once a node's children are canonicalized (every
//! child id equals `find(child)`), the derived `Eq`/`Hash` on the struct
//! itself already gives the same identity a string key would, without
//! the allocation.

use crate::ir::Ident;
use std::fmt;

use super::EClassId;

/// An e-graph node: an [`crate::ir::Expression`] constructor whose
/// children are e-class ids rather than sub-trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ENode {
    /// A number literal, stored as its IEEE-754 bit pattern so the node
    /// can derive `Eq`/`Hash` — no attempt is made to collapse
    /// signed-zero or distinct NaN payloads, so they hash-cons separately,
    /// which is within the real-valued arithmetic assumption.
    Num(u64),
    /// A variable (parameter-component) reference.
    Var(Ident),
    /// `left + right`
    Add(EClassId, EClassId),
    /// `left - right`
    Sub(EClassId, EClassId),
    /// `left * right`
    Mul(EClassId, EClassId),
    /// `left / right`
    Div(EClassId, EClassId),
    /// `left ^ right`
    Pow(EClassId, EClassId),
    /// `-operand`
    Neg(EClassId),
    /// `1 / operand`, rewrite-only.
    Inv(EClassId),
    /// A named function call.
    Call(Ident, Vec<EClassId>),
    /// Field access on a vector/struct-valued object.
    Component(EClassId, Ident),
}

impl ENode {
    /// Build a number node from an `f64` value.
    #[must_use]
    pub fn num(value: f64) -> Self {
        ENode::Num(value.to_bits())
    }

    /// The value of a [`ENode::Num`] node, if this is one.
    #[must_use]
    pub fn as_num(&self) -> Option<f64> {
        match self {
            ENode::Num(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    /// This node's children, in order.
    #[must_use]
    pub fn children(&self) -> Vec<EClassId> {
        match self {
            ENode::Num(_) | ENode::Var(_) => Vec::new(),
            ENode::Add(l, r)
            | ENode::Sub(l, r)
            | ENode::Mul(l, r)
            | ENode::Div(l, r)
            | ENode::Pow(l, r) => vec![*l, *r],
            ENode::Neg(a) | ENode::Inv(a) => vec![*a],
            ENode::Call(_, args) => args.clone(),
            ENode::Component(obj, _) => vec![*obj],
        }
    }

    /// Rebuild this node with each child id passed through `f`.
    #[must_use]
    pub fn map_children(&self, mut f: impl FnMut(EClassId) -> EClassId) -> Self {
        match self {
            ENode::Num(bits) => ENode::Num(*bits),
            ENode::Var(name) => ENode::Var(*name),
            ENode::Add(l, r) => ENode::Add(f(*l), f(*r)),
            ENode::Sub(l, r) => ENode::Sub(f(*l), f(*r)),
            ENode::Mul(l, r) => ENode::Mul(f(*l), f(*r)),
            ENode::Div(l, r) => ENode::Div(f(*l), f(*r)),
            ENode::Pow(l, r) => ENode::Pow(f(*l), f(*r)),
            ENode::Neg(a) => ENode::Neg(f(*a)),
            ENode::Inv(a) => ENode::Inv(f(*a)),
            ENode::Call(name, args) => ENode::Call(*name, args.iter().map(|&a| f(a)).collect()),
            ENode::Component(obj, field) => ENode::Component(f(*obj), *field),
        }
    }

    /// A short tag name, used by traced diagnostics.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            ENode::Num(_) => "num",
            ENode::Var(_) => "var",
            ENode::Add(..) => "add",
            ENode::Sub(..) => "sub",
            ENode::Mul(..) => "mul",
            ENode::Div(..) => "div",
            ENode::Pow(..) => "pow",
            ENode::Neg(_) => "neg",
            ENode::Inv(_) => "inv",
            ENode::Call(..) => "call",
            ENode::Component(..) => "component",
        }
    }
}

impl fmt::Display for ENode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ENode::Num(bits) => write!(f, "{}", f64::from_bits(*bits)),
            ENode::Var(name) => write!(f, "{name}"),
            ENode::Add(l, r) => write!(f, "(+ {l:?} {r:?})"),
            ENode::Sub(l, r) => write!(f, "(- {l:?} {r:?})"),
            ENode::Mul(l, r) => write!(f, "(* {l:?} {r:?})"),
            ENode::Div(l, r) => write!(f, "(/ {l:?} {r:?})"),
            ENode::Pow(l, r) => write!(f, "(^ {l:?} {r:?})"),
            ENode::Neg(a) => write!(f, "(neg {a:?})"),
            ENode::Inv(a) => write!(f, "(inv {a:?})"),
            ENode::Call(name, args) => write!(f, "({name} {args:?})"),
            ENode::Component(obj, field) => write!(f, "(. {obj:?} {field})"),
        }
    }
}
