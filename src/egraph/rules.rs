//! The rewrite-rule library.
//!
//! Three graded subsets — core, algebra, function — built once from
//! their s-expression source text via [`super::pattern::parse_pattern`].
//! The rule shapes follow the `egg` crate's own documented test suite,
//! the reference equality-saturation implementation, re-expressed over
//! this crate's own e-graph and pattern matcher rather than depending on
//! `egg` itself.

use crate::error::{CompileError, Result};

use super::pattern::{parse_pattern, Pattern};

/// A named, directional rewrite rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The rule's name, used in diagnostics and traces.
    pub name: String,
    /// Left-hand side: matched against an e-class.
    pub lhs: Pattern,
    /// Right-hand side: instantiated under the match's substitution.
    pub rhs: Pattern,
}

fn rule(name: &str, lhs: &str, rhs: &str) -> Result<Rule> {
    let lhs = parse_pattern(lhs)?;
    let rhs = parse_pattern(rhs)?;
    validate_rule(name, &lhs, &rhs)?;
    Ok(Rule {
        name: name.to_owned(),
        lhs,
        rhs,
    })
}

/// Every pattern variable in `rhs` must appear in `lhs`.
///
/// # Errors
/// Returns [`CompileError::UnboundPatternVariable`] otherwise.
fn validate_rule(name: &str, lhs: &Pattern, rhs: &Pattern) -> Result<()> {
    let mut lhs_vars = Vec::new();
    lhs.collect_vars(&mut lhs_vars);
    let mut rhs_vars = Vec::new();
    rhs.collect_vars(&mut rhs_vars);
    for var in rhs_vars {
        if !lhs_vars.contains(&var) {
            return Err(CompileError::UnboundPatternVariable {
                rule: name.to_owned(),
                var: var.as_str().as_ref().to_owned(),
            });
        }
    }
    Ok(())
}

/// Build both directions of a bidirectional rule.
fn bidirectional(name: &str, lhs: &str, rhs: &str) -> Result<Vec<Rule>> {
    Ok(vec![
        rule(&format!("{name}-fwd"), lhs, rhs)?,
        rule(&format!("{name}-rev"), rhs, lhs)?,
    ])
}

/// Commutativity/associativity/identity/cancellation: rules that never
/// materially expand the e-graph, so they stay enabled in every phase.
///
/// # Errors
/// Propagates a parse/validation failure from any rule's source text —
/// this only happens if the hardcoded rule text itself is malformed,
/// which a test in this module guards against.
pub fn core_rules() -> Result<Vec<Rule>> {
    let mut rules = Vec::new();
    rules.extend(bidirectional("comm-add", "(+ ?a ?b)", "(+ ?b ?a)")?);
    rules.extend(bidirectional("comm-mul", "(* ?a ?b)", "(* ?b ?a)")?);
    rules.extend(bidirectional(
        "assoc-add",
        "(+ ?a (+ ?b ?c))",
        "(+ (+ ?a ?b) ?c)",
    )?);
    rules.extend(bidirectional(
        "assoc-mul",
        "(* ?a (* ?b ?c))",
        "(* (* ?a ?b) ?c)",
    )?);
    rules.push(rule("zero-add", "(+ ?a 0)", "?a")?);
    rules.push(rule("add-zero", "?a", "(+ ?a 0)")?);
    rules.push(rule("zero-mul", "(* ?a 0)", "0")?);
    rules.push(rule("one-mul", "(* ?a 1)", "?a")?);
    rules.push(rule("mul-one", "?a", "(* ?a 1)")?);
    rules.push(rule("self-sub", "(- ?a ?a)", "0")?);
    rules.push(rule("self-div", "(/ ?a ?a)", "1")?);
    rules.extend(bidirectional("double-neg", "(neg (neg ?a))", "?a")?);
    rules.extend(bidirectional("neg-as-mul", "(neg ?a)", "(* -1 ?a)")?);
    Ok(rules)
}

/// Distribution, negation/subtraction/division canonicalization,
/// powers: the rules that can materially grow the e-graph — most
/// importantly the *factoring* direction of distribution, which is what
/// lets sibling gradients discover a shared subexpression.
///
/// # Errors
/// See [`core_rules`].
pub fn algebra_rules() -> Result<Vec<Rule>> {
    let mut rules = Vec::new();
    rules.extend(bidirectional(
        "distribute-mul-add",
        "(* ?a (+ ?b ?c))",
        "(+ (* ?a ?b) (* ?a ?c))",
    )?);
    rules.extend(bidirectional(
        "distribute-mul-sub",
        "(* ?a (- ?b ?c))",
        "(- (* ?a ?b) (* ?a ?c))",
    )?);
    rules.extend(bidirectional("sub-as-add-neg", "(- ?a ?b)", "(+ ?a (neg ?b))")?);
    rules.extend(bidirectional("neg-over-add", "(neg (+ ?a ?b))", "(+ (neg ?a) (neg ?b))")?);
    rules.extend(bidirectional("neg-over-mul", "(neg (* ?a ?b))", "(* (neg ?a) ?b)")?);
    rules.extend(bidirectional("div-as-mul-inv", "(/ ?a ?b)", "(* ?a (inv ?b))")?);
    rules.extend(bidirectional("inv-of-inv", "(inv (inv ?a))", "?a")?);
    rules.push(rule("mul-inv-cancel", "(* ?a (inv ?a))", "1")?);
    rules.push(rule("div-self-sq", "(/ ?a (* ?a ?a))", "(inv ?a)")?);
    rules.extend(bidirectional("pow-as-self-mul", "(^ ?a 2)", "(* ?a ?a)")?);
    rules.push(rule("pow-mul-same-base", "(* (^ ?a ?b) (^ ?a ?c))", "(^ ?a (+ ?b ?c))")?);
    rules.push(rule("pow-zero", "(^ ?a 0)", "1")?);
    rules.push(rule("pow-one", "(^ ?a 1)", "?a")?);
    rules.push(rule("combine-like-terms", "(+ ?a ?a)", "(* 2 ?a)")?);
    Ok(rules)
}

/// Elementary built-in identities: square root, absolute value, trig at
/// canonical points, exponential/logarithm inverses.
///
/// # Errors
/// See [`core_rules`].
pub fn function_rules() -> Result<Vec<Rule>> {
    let mut rules = Vec::new();
    rules.extend(bidirectional("sqrt-self-mul", "(* (sqrt ?a) (sqrt ?a))", "?a")?);
    rules.extend(bidirectional(
        "sqrt-distributes-mul",
        "(sqrt (* ?a ?b))",
        "(* (sqrt ?a) (sqrt ?b))",
    )?);
    rules.push(rule("abs-idempotent", "(abs (abs ?a))", "(abs ?a)")?);
    rules.push(rule("abs-neg", "(abs (neg ?a))", "(abs ?a)")?);
    rules.push(rule("sin-zero", "(sin 0)", "0")?);
    rules.push(rule("cos-zero", "(cos 0)", "1")?);
    rules.extend(bidirectional("sin-odd", "(sin (neg ?a))", "(neg (sin ?a))")?);
    rules.extend(bidirectional("cos-even", "(cos (neg ?a))", "(cos ?a)")?);
    rules.push(rule("exp-zero", "(exp 0)", "1")?);
    rules.push(rule("log-one", "(log 1)", "0")?);
    rules.extend(bidirectional("log-of-exp", "(log (exp ?a))", "?a")?);
    rules.extend(bidirectional("exp-of-log", "(exp (log ?a))", "?a")?);
    rules.extend(bidirectional(
        "exp-sum",
        "(exp (+ ?a ?b))",
        "(* (exp ?a) (exp ?b))",
    )?);
    rules.extend(bidirectional(
        "log-product",
        "(log (* ?a ?b))",
        "(+ (log ?a) (log ?b))",
    )?);
    rules.extend(bidirectional(
        "log-quotient",
        "(log (/ ?a ?b))",
        "(- (log ?a) (log ?b))",
    )?);
    rules.extend(bidirectional(
        "log-power",
        "(log (^ ?a ?b))",
        "(* ?b (log ?a))",
    )?);
    Ok(rules)
}

/// The three graded rule subsets, built once and used both for
/// unphased saturation (all rules at once) and the phased driver
/// (each subset saturated in turn).
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Rules that never materially expand the e-graph.
    pub core: Vec<Rule>,
    /// Distribution/canonicalization/power rules.
    pub algebra: Vec<Rule>,
    /// Built-in function identities.
    pub function: Vec<Rule>,
}

impl RuleSet {
    /// Build the standard rule library.
    ///
    /// # Errors
    /// Propagates a malformed rule definition; this crate's own rule
    /// text is covered by `rules_parse_without_error` below.
    pub fn standard() -> Result<Self> {
        Ok(Self {
            core: core_rules()?,
            algebra: algebra_rules()?,
            function: function_rules()?,
        })
    }

    /// All rules, core first, in the order an unphased saturation pass
    /// should try them.
    #[must_use]
    pub fn all(&self) -> Vec<Rule> {
        let mut all = self.core.clone();
        all.extend(self.algebra.clone());
        all.extend(self.function.clone());
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_parse_without_error() {
        let set = RuleSet::standard().expect("the hardcoded rule library is well-formed");
        assert!(!set.core.is_empty());
        assert!(!set.algebra.is_empty());
        assert!(!set.function.is_empty());
    }

    #[test]
    fn bad_rule_reports_unbound_variable() {
        let err = rule("bad", "?a", "?b").unwrap_err();
        assert!(matches!(err, CompileError::UnboundPatternVariable { .. }));
    }
}
