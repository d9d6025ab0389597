//! The cost model.
//!
//! A total function from e-node tag to a positive integer weight.
//! Division is deliberately pricier than multiplication so the
//! extractor prefers `a*inv(b)`-turned-back-into-`a/b` forms only when
//! nothing cheaper is available, and `pow`/`call` sit between the two so
//! genuinely expensive built-ins don't get preferred over a short chain
//! of multiplications that computes the same value.

use super::ENode;

/// Per-tag node weights used by the extractor, overridable via
/// `CompileOptions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    /// Weight of a [`ENode::Num`] node.
    pub num: u32,
    /// Weight of a [`ENode::Var`] node.
    pub var: u32,
    /// Weight of [`ENode::Add`].
    pub add: u32,
    /// Weight of [`ENode::Sub`].
    pub sub: u32,
    /// Weight of [`ENode::Mul`].
    pub mul: u32,
    /// Weight of [`ENode::Neg`].
    pub neg: u32,
    /// Weight of [`ENode::Component`].
    pub component: u32,
    /// Weight of [`ENode::Call`].
    pub call: u32,
    /// Weight of [`ENode::Pow`].
    pub pow: u32,
    /// Weight of [`ENode::Inv`].
    pub inv: u32,
    /// Weight of [`ENode::Div`].
    pub div: u32,
}

impl Default for CostModel {
    /// The default table: `num=1, var=1, add=sub=mul=2, neg=component=1,
    /// call=3, pow=4, inv=5, div=8`.
    fn default() -> Self {
        Self {
            num: 1,
            var: 1,
            add: 2,
            sub: 2,
            mul: 2,
            neg: 1,
            component: 1,
            call: 3,
            pow: 4,
            inv: 5,
            div: 8,
        }
    }
}

impl CostModel {
    /// The weight of `node`'s own tag, excluding its children.
    #[must_use]
    pub fn node_cost(&self, node: &ENode) -> u32 {
        match node {
            ENode::Num(_) => self.num,
            ENode::Var(_) => self.var,
            ENode::Add(..) => self.add,
            ENode::Sub(..) => self.sub,
            ENode::Mul(..) => self.mul,
            ENode::Div(..) => self.div,
            ENode::Pow(..) => self.pow,
            ENode::Neg(_) => self.neg,
            ENode::Inv(_) => self.inv,
            ENode::Call(..) => self.call,
            ENode::Component(..) => self.component,
        }
    }

    /// The weight of an IR-level binary/unary op, mirroring
    /// [`Self::node_cost`] for the post-extraction CSE pass, which
    /// operates on [`crate::ir::Expression`] trees rather than e-nodes.
    #[must_use]
    pub fn expr_node_cost(&self, kind: &crate::ir::ExprKind) -> u32 {
        use crate::ir::{BinOp, ExprKind, UnOp};
        match kind {
            ExprKind::Number(_) => self.num,
            ExprKind::Variable(_) => self.var,
            ExprKind::Binary(BinOp::Add, ..) => self.add,
            ExprKind::Binary(BinOp::Sub, ..) => self.sub,
            ExprKind::Binary(BinOp::Mul, ..) => self.mul,
            ExprKind::Binary(BinOp::Div, ..) => self.div,
            ExprKind::Binary(BinOp::Pow, ..) => self.pow,
            // `UnOp::Plus` is a syntactic no-op kept only so the IR round-trips
            // unary-plus input; it shares `neg`'s weight rather than adding a
            // separate near-zero tier to the cost table.
            ExprKind::Unary(UnOp::Neg | UnOp::Plus, _) => self.neg,
            ExprKind::Call(..) => self.call,
            ExprKind::Component(..) => self.component,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_is_pricier_than_multiplication() {
        let model = CostModel::default();
        assert!(model.div > model.mul);
    }
}
