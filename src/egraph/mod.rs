//! The equality-saturation e-graph: e-nodes, e-classes, union-find,
//! hashcons table, patterns, rules, substitutions, extraction, and cost
//! model.
//!
//! Submodules: a congruence-closed union-find under a hash-consed arena
//! ([`graph`], [`eclass`], [`unionfind`], [`node`]), a pattern language
//! and matcher ([`pattern`]), a saturating rewriter over a graded rule
//! library ([`rules`], [`saturate`]), and a cost-model-driven extractor
//! with CSE ([`cost`], [`extract`]). [`build`] is the forward half of
//! [`extract`], turning an already-built [`crate::ir::Expression`] into
//! e-graph nodes.

mod build;
mod cost;
mod eclass;
mod extract;
mod graph;
mod node;
mod pattern;
mod rules;
mod saturate;
mod unionfind;

pub use build::insert_expr;
pub use cost::CostModel;
pub use eclass::EClass;
pub use extract::{compute_costs, expr_cost, extract, ExtractOptions, ExtractionResult, Temp};
pub use graph::{EClassId, EGraph};
pub use node::ENode;
pub use pattern::{instantiate, match_pattern, parse_pattern, Pattern, Subst};
pub use rules::{Rule, RuleSet};
pub use saturate::{run, run_phased, SaturationLimits, SaturationStats};
