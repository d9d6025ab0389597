//! The end-to-end compile pipeline.
//!
//! Wires every stage together: inline, expand compound built-ins,
//! differentiate, locally simplify, insert the value and every gradient
//! into one e-graph, saturate, extract with CSE shared across all roots.
//! The result is the interface exposed to an (external) emitter: an
//! ordered temp list, a value expression, and a
//! `parameter -> component -> Expression` gradient map.

use std::collections::HashMap;

use crate::builtins::{self, Discontinuity};
use crate::diff;
use crate::egraph::{
    self, CostModel, EGraph, ExtractOptions, RuleSet, SaturationLimits, SaturationStats, Temp,
};
use crate::error::Result;
use crate::expand;
use crate::inline;
use crate::ir::visitor::{walk_expr, ExprVisitor};
use crate::ir::{ComponentPath, Expression, ExprKind, Function, Ident};
use crate::simplify;

/// A discontinuity/non-smooth built-in used somewhere in the compiled
/// function, surfaced informationally rather than as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advisory {
    /// The built-in call responsible.
    pub builtin: Ident,
    /// The kind of discontinuity/non-smooth point.
    pub kind: Discontinuity,
}

struct AdvisoryVisitor<'a> {
    out: &'a mut Vec<Advisory>,
}

impl ExprVisitor for AdvisoryVisitor<'_> {
    fn visit_call(&mut self, name: Ident, args: &[Expression]) -> bool {
        if let Some(def) = builtins::lookup(name) {
            if let Some(kind) = def.discontinuity {
                let advisory = Advisory { builtin: name, kind };
                if !self.out.contains(&advisory) {
                    self.out.push(advisory);
                }
            }
        }
        true
    }
}

/// Collect discontinuity advisories from `expr`, in first-occurrence
/// order with duplicates removed.
///
/// Scans the expression *before* [`crate::expand`] desugars `min`/`max`/
/// `clamp` into `abs`-based arithmetic, since that rewrite is exact but
/// erases the very call site the advisory is about.
fn collect_advisories(expr: &Expression) -> Vec<Advisory> {
    let mut out = Vec::new();
    walk_expr(expr, &mut AdvisoryVisitor { out: &mut out });
    out
}

fn expr_depth(expr: &Expression) -> usize {
    match expr.kind() {
        ExprKind::Number(_) | ExprKind::Variable(_) => 1,
        ExprKind::Binary(_, l, r) => 1 + expr_depth(l).max(expr_depth(r)),
        ExprKind::Unary(_, a) => 1 + expr_depth(a),
        ExprKind::Call(_, args) => 1 + args.iter().map(expr_depth).max().unwrap_or(0),
        ExprKind::Component(obj, _) => 1 + expr_depth(obj),
    }
}

/// Chainable compile configuration, mirroring a `Diff`/`Simplify`
/// builder-pattern API. Defaults match the default cost model and a
/// 10,000-class saturation ceiling (widened slightly here; see
/// [`Self::max_classes`]).
#[derive(Debug, Clone)]
pub struct CompileOptions {
    max_iterations: usize,
    max_classes: usize,
    max_ast_depth: usize,
    cse_threshold: u32,
    cost_model: CostModel,
    phased: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        let limits = SaturationLimits::default();
        Self {
            max_iterations: limits.max_iterations,
            max_classes: limits.max_classes,
            max_ast_depth: 1_000,
            cse_threshold: ExtractOptions::default().cse_threshold,
            cost_model: CostModel::default(),
            phased: true,
        }
    }
}

impl CompileOptions {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum saturation passes before the iteration bound is hit.
    #[must_use]
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Maximum live e-classes before saturation stops early (default 10,000).
    #[must_use]
    pub fn max_classes(mut self, n: usize) -> Self {
        self.max_classes = n;
        self
    }

    /// Maximum expression-tree depth before the e-graph stage is skipped
    /// in favor of the locally-simplified expressions alone, a safe
    /// fallback if the host runtime has a small default stack.
    #[must_use]
    pub fn max_ast_depth(mut self, n: usize) -> Self {
        self.max_ast_depth = n;
        self
    }

    /// Minimum per-node cost (exclusive) for a shared subexpression to
    /// become a named temporary (default 3).
    #[must_use]
    pub fn cse_threshold(mut self, t: u32) -> Self {
        self.cse_threshold = t;
        self
    }

    /// Override the default per-tag node weights.
    #[must_use]
    pub fn cost_model(mut self, model: CostModel) -> Self {
        self.cost_model = model;
        self
    }

    /// Use the phased core/algebra/function saturation driver (the
    /// default) instead of saturating all rules at once.
    #[must_use]
    pub fn phased(mut self, yes: bool) -> Self {
        self.phased = yes;
        self
    }

    fn limits(&self) -> SaturationLimits {
        SaturationLimits {
            max_iterations: self.max_iterations,
            max_classes: self.max_classes,
        }
    }

    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            cost_model: self.cost_model,
            cse_threshold: self.cse_threshold,
        }
    }
}

/// The interface exposed to the (external) emitter for one compiled
/// function.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    /// The value expression.
    pub value: Expression,
    /// `parameter component -> gradient expression`, one entry per
    /// differentiable component, in [`Function::differentiable_components`] order.
    pub gradients: HashMap<ComponentPath, Expression>,
    /// Shared temporaries, topologically ordered.
    pub temps: Vec<Temp>,
    /// Summed AST cost across every root and temp body.
    pub total_cost: u32,
    /// Saturation run statistics.
    pub stats: SaturationStats,
    /// Discontinuity advisories, informational only.
    pub advisories: Vec<Advisory>,
    /// `true` if [`CompileOptions::max_ast_depth`] was exceeded and the
    /// e-graph optimizer was skipped in favor of the locally-simplified
    /// expressions alone.
    pub depth_guard_tripped: bool,
}

/// Run the full pipeline on `function`: inline, expand, differentiate,
/// locally simplify, e-graph optimize, extract with CSE.
///
/// # Errors
/// Propagates a fatal [`crate::error::CompileError`] — an unknown
/// built-in, one with no registered gradient rule, or (only possible if
/// this crate's own hardcoded rule library were malformed) an unbound
/// rewrite-rule variable.
pub fn compile(function: &Function, options: &CompileOptions) -> Result<CompiledFunction> {
    let inlined = inline::inline(function);
    let advisories = collect_advisories(&inlined);

    let expanded = expand::expand(&inlined);
    let components = function.differentiable_components();
    let raw_gradients = diff::differentiate(&expanded, &components)?;

    let value = simplify::simplify(&expanded);
    let gradients: Vec<(ComponentPath, Expression)> = components
        .iter()
        .map(|&c| (c, simplify::simplify(&raw_gradients[&c])))
        .collect();

    let deepest = gradients
        .iter()
        .map(|(_, g)| expr_depth(g))
        .fold(expr_depth(&value), usize::max);

    if deepest > options.max_ast_depth {
        let gradients = gradients.into_iter().collect();
        return Ok(CompiledFunction {
            value,
            gradients,
            temps: Vec::new(),
            total_cost: 0,
            stats: SaturationStats::default(),
            advisories,
            depth_guard_tripped: true,
        });
    }

    let mut graph = EGraph::new();
    let value_root = egraph::insert_expr(&mut graph, &value);
    let gradient_roots: Vec<_> = gradients
        .iter()
        .map(|(c, g)| (*c, egraph::insert_expr(&mut graph, g)))
        .collect();

    let rule_set = RuleSet::standard()?;
    let limits = options.limits();
    let stats = if options.phased {
        egraph::run_phased(&mut graph, &rule_set, limits)
    } else {
        egraph::run(&mut graph, &rule_set.all(), limits)
    };

    let mut roots = vec![value_root];
    roots.extend(gradient_roots.iter().map(|(_, id)| *id));
    let extracted = egraph::extract(&graph, &roots, &options.extract_options());

    let mut root_exprs = extracted.roots.into_iter();
    let value = root_exprs.next().unwrap_or_else(|| Expression::number(0.0));
    let gradients = gradient_roots
        .iter()
        .zip(root_exprs)
        .map(|((c, _), expr)| (*c, expr))
        .collect();

    Ok(CompiledFunction {
        value,
        gradients,
        temps: extracted.temps,
        total_cost: extracted.total_cost,
        stats,
        advisories,
        depth_guard_tripped: false,
    })
}

#[cfg(test)]
#[allow(clippy::panic, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::ir::{symbol::intern, BinOp, Param, ParamType};

    fn scalar_param(name: &str) -> Param {
        Param {
            name: intern(name),
            ty: ParamType::Scalar,
            differentiable: true,
        }
    }

    #[test]
    fn x_squared_compiles_to_value_and_gradient() {
        let x = intern("gradc-compile-test-xsq");
        let function = Function {
            params: vec![scalar_param("gradc-compile-test-xsq")],
            bindings: vec![],
            ret: Expression::variable(x).mul(Expression::variable(x)),
        };
        let compiled = compile(&function, &CompileOptions::default()).expect("compiles");
        let target = ComponentPath {
            param: x,
            field: intern("default"),
        };
        let grad = &compiled.gradients[&target];
        match grad.kind() {
            ExprKind::Binary(BinOp::Mul, l, r) => {
                let has_two = matches!(l.kind(), ExprKind::Number(n) if (*n - 2.0).abs() < 1e-9)
                    || matches!(r.kind(), ExprKind::Number(n) if (*n - 2.0).abs() < 1e-9);
                assert!(has_two, "expected 2*x, got {grad:?}");
            }
            other => panic!("expected a multiplication, got {other:?}"),
        }
        assert!(compiled.advisories.is_empty());
        assert!(!compiled.depth_guard_tripped);
    }

    #[test]
    fn atan2_call_produces_a_branch_cut_advisory() {
        let u = intern("gradc-compile-test-atan2-u");
        let function = Function {
            params: vec![scalar_param("gradc-compile-test-atan2-u")],
            bindings: vec![],
            ret: Expression::call(
                intern("atan2"),
                vec![Expression::variable(u), Expression::number(1.0)],
            ),
        };
        let compiled = compile(&function, &CompileOptions::default()).expect("compiles");
        assert!(compiled
            .advisories
            .iter()
            .any(|a| a.kind == Discontinuity::Atan2BranchCut));
    }

    #[test]
    fn unknown_builtin_is_a_fatal_error() {
        let x = intern("gradc-compile-test-unknown");
        let function = Function {
            params: vec![scalar_param("gradc-compile-test-unknown")],
            bindings: vec![],
            ret: Expression::call(
                intern("gradc-compile-test-no-such-builtin"),
                vec![Expression::variable(x)],
            ),
        };
        let err = compile(&function, &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, crate::error::CompileError::UnknownBuiltin { .. }));
    }

    #[test]
    fn deep_expression_trips_the_depth_guard() {
        let x = intern("gradc-compile-test-deep");
        let mut expr = Expression::variable(x);
        for _ in 0..20 {
            expr = expr.add(Expression::number(1.0));
        }
        let function = Function {
            params: vec![scalar_param("gradc-compile-test-deep")],
            bindings: vec![],
            ret: expr,
        };
        let options = CompileOptions::new().max_ast_depth(3);
        let compiled = compile(&function, &options).expect("compiles");
        assert!(compiled.depth_guard_tripped);
        assert!(compiled.temps.is_empty());
    }

    #[test]
    fn determinism_across_identical_runs() {
        let u = intern("gradc-compile-test-det-u");
        let v = intern("gradc-compile-test-det-v");
        let function = Function {
            params: vec![scalar_param("gradc-compile-test-det-u"), scalar_param("gradc-compile-test-det-v")],
            bindings: vec![],
            ret: Expression::variable(u)
                .mul(Expression::variable(v))
                .add(Expression::variable(u).mul(Expression::variable(v))),
        };
        let r1 = compile(&function, &CompileOptions::default()).expect("compiles");
        let r2 = compile(&function, &CompileOptions::default()).expect("compiles");
        assert_eq!(r1.total_cost, r2.total_cost);
        assert_eq!(r1.value, r2.value);
    }
}
