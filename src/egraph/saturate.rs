//! The saturation driver.
//!
//! Runs rewrite rules to a fixpoint, or to an iteration/class-size
//! ceiling, tracking per-rule match counts so callers can see which
//! rules actually fired.

use super::pattern::{instantiate, match_pattern};
use super::rules::{Rule, RuleSet};
use super::{EClassId, EGraph};

/// Statistics from a saturation run.
#[derive(Debug, Clone, Default)]
pub struct SaturationStats {
    /// Number of passes actually run.
    pub iterations: usize,
    /// `true` if saturation reached a fixpoint (no rule fired in the
    /// final pass) before hitting any ceiling.
    pub converged: bool,
    /// `true` if the iteration ceiling was hit before convergence.
    pub hit_iteration_limit: bool,
    /// `true` if the class-count ceiling was hit before convergence.
    pub hit_class_limit: bool,
    /// Per-rule name -> number of distinct `(rule, match)` applications
    /// that actually changed the e-graph, across the whole run.
    pub rule_fire_counts: Vec<(String, usize)>,
}

impl SaturationStats {
    fn record_fire(&mut self, rule_name: &str, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(entry) = self.rule_fire_counts.iter_mut().find(|(n, _)| n == rule_name) {
            entry.1 += count;
        } else {
            self.rule_fire_counts.push((rule_name.to_owned(), count));
        }
    }
}

/// Ceilings that bound a saturation run: an iteration ceiling and a
/// total e-class count ceiling.
#[derive(Debug, Clone, Copy)]
pub struct SaturationLimits {
    /// Maximum number of passes.
    pub max_iterations: usize,
    /// Maximum number of live e-classes before the run stops early.
    pub max_classes: usize,
}

impl Default for SaturationLimits {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            max_classes: 10_000,
        }
    }
}

/// Try every rule in `rules` against every current e-class once,
/// applying every match found. Matching reads a read-only snapshot of
/// match sites first, so a rule firing mid-pass never changes which
/// matches an earlier rule in the same pass sees: matches are
/// collected against the e-graph's state at the start of the pass.
///
/// Returns the number of `(rule, match)` pairs that actually triggered
/// a new union (i.e. the rewrite changed the e-graph).
fn one_pass(graph: &mut EGraph, rules: &[Rule], stats: &mut SaturationStats) -> usize {
    // Phase 1: collect all matches against the pre-pass graph.
    let class_ids = graph.class_ids();
    let mut planned: Vec<(&Rule, EClassId, super::pattern::Subst)> = Vec::new();
    for rule in rules {
        for &class in &class_ids {
            for subst in match_pattern(&rule.lhs, class, graph) {
                planned.push((rule, class, subst));
            }
        }
    }

    // Phase 2: apply. `instantiate` may add fresh nodes/classes; `merge`
    // only ever unifies existing ones, so applying matches found against
    // the pre-pass snapshot is still sound.
    let mut fired = 0;
    for (rule, class, subst) in planned {
        let rhs_class = instantiate(&rule.rhs, &subst, graph);
        let already_equal = graph.find(class) == graph.find(rhs_class);
        graph.merge(class, rhs_class);
        if !already_equal {
            fired += 1;
            stats.record_fire(&rule.name, 1);
        }
    }
    graph.rebuild();
    fired
}

/// Run `rules` to a fixpoint, or until a [`SaturationLimits`] ceiling is
/// hit.
pub fn run(graph: &mut EGraph, rules: &[Rule], limits: SaturationLimits) -> SaturationStats {
    let mut stats = SaturationStats::default();
    let trace = EGraph::tracing_enabled();
    loop {
        if stats.iterations >= limits.max_iterations {
            stats.hit_iteration_limit = true;
            break;
        }
        if graph.class_count() > limits.max_classes {
            stats.hit_class_limit = true;
            break;
        }
        let fired = one_pass(graph, rules, &mut stats);
        stats.iterations += 1;
        if trace {
            #[allow(clippy::print_stderr, reason = "GRADC_TRACE opts into stderr diagnostics")]
            {
                eprintln!(
                    "[gradc] saturation pass {}: {fired} rewrites fired, {} classes",
                    stats.iterations,
                    graph.class_count()
                );
            }
        }
        if fired == 0 {
            stats.converged = true;
            break;
        }
    }
    stats
}

/// Run the phased driver: core+algebra+function rules in growing
/// subsets so cheap, high-value rewrites (commutativity, identities)
/// saturate before the pricier distribution/function rules run, which
/// in practice reaches the same fixpoint in far fewer total match
/// attempts than running every rule from pass one.
pub fn run_phased(graph: &mut EGraph, rule_set: &RuleSet, limits: SaturationLimits) -> SaturationStats {
    let trace = EGraph::tracing_enabled();
    let phases: [(&str, Vec<Rule>); 3] = [
        ("core", rule_set.core.clone()),
        ("core+algebra", {
            let mut r = rule_set.core.clone();
            r.extend(rule_set.algebra.clone());
            r
        }),
        ("core+algebra+function", rule_set.all()),
    ];

    let mut combined = SaturationStats::default();
    for (phase_name, rules) in phases {
        let phase_limits = SaturationLimits {
            max_iterations: limits.max_iterations.saturating_sub(combined.iterations),
            max_classes: limits.max_classes,
        };
        if phase_limits.max_iterations == 0 {
            combined.hit_iteration_limit = true;
            break;
        }
        let phase_stats = run(graph, &rules, phase_limits);
        if trace {
            #[allow(clippy::print_stderr, reason = "GRADC_TRACE opts into stderr diagnostics")]
            {
                eprintln!(
                    "[gradc] phase '{phase_name}' done in {} pass(es), converged={}",
                    phase_stats.iterations, phase_stats.converged
                );
            }
        }
        combined.iterations += phase_stats.iterations;
        combined.hit_iteration_limit |= phase_stats.hit_iteration_limit;
        combined.hit_class_limit |= phase_stats.hit_class_limit;
        for (name, count) in phase_stats.rule_fire_counts {
            combined.record_fire(&name, count);
        }
        if phase_stats.hit_class_limit {
            combined.converged = false;
            return combined;
        }
    }
    combined.converged = !combined.hit_iteration_limit && !combined.hit_class_limit;
    combined
}
