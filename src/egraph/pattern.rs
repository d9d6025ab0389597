//! Patterns, substitutions, and the matcher.

use rustc_hash::FxHashMap;

use crate::error::{CompileError, Result};
use crate::ir::Ident;

use super::{ENode, EGraph, EClassId};

/// A rewrite-rule pattern. Parallels [`ENode`] with an added
/// `Var` variant that matches any e-class and binds it to a name.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// `?name`: matches any e-class.
    Var(Ident),
    /// A number literal pattern.
    Num(u64),
    /// `(+ lhs rhs)`
    Add(Box<Pattern>, Box<Pattern>),
    /// `(- lhs rhs)`
    Sub(Box<Pattern>, Box<Pattern>),
    /// `(* lhs rhs)`
    Mul(Box<Pattern>, Box<Pattern>),
    /// `(/ lhs rhs)`
    Div(Box<Pattern>, Box<Pattern>),
    /// `(^ lhs rhs)`
    Pow(Box<Pattern>, Box<Pattern>),
    /// `(neg operand)`
    Neg(Box<Pattern>),
    /// `(inv operand)`
    Inv(Box<Pattern>),
    /// `(name arg...)`, any other head symbol — a call pattern.
    Call(Ident, Vec<Pattern>),
}

impl Pattern {
    /// Collect every `?name` appearing in this pattern.
    pub(super) fn collect_vars(&self, out: &mut Vec<Ident>) {
        match self {
            Pattern::Var(name) => out.push(*name),
            Pattern::Num(_) => {}
            Pattern::Add(l, r)
            | Pattern::Sub(l, r)
            | Pattern::Mul(l, r)
            | Pattern::Div(l, r)
            | Pattern::Pow(l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
            Pattern::Neg(a) | Pattern::Inv(a) => a.collect_vars(out),
            Pattern::Call(_, args) => {
                for a in args {
                    a.collect_vars(out);
                }
            }
        }
    }
}

/// A binding from pattern-variable name to e-class id.
pub type Subst = FxHashMap<Ident, EClassId>;

/// Match `pattern` against `class`, returning every substitution that
/// makes it succeed.
#[must_use]
pub fn match_pattern(pattern: &Pattern, class: EClassId, graph: &EGraph) -> Vec<Subst> {
    match_with(pattern, class, graph, &Subst::default())
}

fn match_with(pattern: &Pattern, class: EClassId, graph: &EGraph, subst: &Subst) -> Vec<Subst> {
    let canon = graph.find(class);
    match pattern {
        Pattern::Var(name) => match subst.get(name) {
            Some(&bound) if graph.find(bound) == canon => vec![subst.clone()],
            Some(_) => Vec::new(),
            None => {
                let mut extended = subst.clone();
                extended.insert(*name, canon);
                vec![extended]
            }
        },
        Pattern::Num(bits) => {
            if graph
                .get_nodes(canon)
                .iter()
                .any(|n| matches!(n, ENode::Num(b) if b == bits))
            {
                vec![subst.clone()]
            } else {
                Vec::new()
            }
        }
        Pattern::Add(l, r) => match_binary(graph, canon, subst, l, r, node_as_add),
        Pattern::Sub(l, r) => match_binary(graph, canon, subst, l, r, node_as_sub),
        Pattern::Mul(l, r) => match_binary(graph, canon, subst, l, r, node_as_mul),
        Pattern::Div(l, r) => match_binary(graph, canon, subst, l, r, node_as_div),
        Pattern::Pow(l, r) => match_binary(graph, canon, subst, l, r, node_as_pow),
        Pattern::Neg(a) => match_unary(graph, canon, subst, a, node_as_neg),
        Pattern::Inv(a) => match_unary(graph, canon, subst, a, node_as_inv),
        Pattern::Call(name, args) => match_call(graph, canon, subst, *name, args),
    }
}

fn node_as_add(n: &ENode) -> Option<(EClassId, EClassId)> {
    match n {
        ENode::Add(l, r) => Some((*l, *r)),
        _ => None,
    }
}
fn node_as_sub(n: &ENode) -> Option<(EClassId, EClassId)> {
    match n {
        ENode::Sub(l, r) => Some((*l, *r)),
        _ => None,
    }
}
fn node_as_mul(n: &ENode) -> Option<(EClassId, EClassId)> {
    match n {
        ENode::Mul(l, r) => Some((*l, *r)),
        _ => None,
    }
}
fn node_as_div(n: &ENode) -> Option<(EClassId, EClassId)> {
    match n {
        ENode::Div(l, r) => Some((*l, *r)),
        _ => None,
    }
}
fn node_as_pow(n: &ENode) -> Option<(EClassId, EClassId)> {
    match n {
        ENode::Pow(l, r) => Some((*l, *r)),
        _ => None,
    }
}
fn node_as_neg(n: &ENode) -> Option<EClassId> {
    match n {
        ENode::Neg(a) => Some(*a),
        _ => None,
    }
}
fn node_as_inv(n: &ENode) -> Option<EClassId> {
    match n {
        ENode::Inv(a) => Some(*a),
        _ => None,
    }
}

fn match_binary(
    graph: &EGraph,
    class: EClassId,
    subst: &Subst,
    lhs: &Pattern,
    rhs: &Pattern,
    as_pair: fn(&ENode) -> Option<(EClassId, EClassId)>,
) -> Vec<Subst> {
    let mut out = Vec::new();
    for node in graph.get_nodes(class) {
        let Some((l, r)) = as_pair(node) else {
            continue;
        };
        for s1 in match_with(lhs, l, graph, subst) {
            out.extend(match_with(rhs, r, graph, &s1));
        }
    }
    out
}

fn match_unary(
    graph: &EGraph,
    class: EClassId,
    subst: &Subst,
    operand: &Pattern,
    as_child: fn(&ENode) -> Option<EClassId>,
) -> Vec<Subst> {
    let mut out = Vec::new();
    for node in graph.get_nodes(class) {
        if let Some(child) = as_child(node) {
            out.extend(match_with(operand, child, graph, subst));
        }
    }
    out
}

fn match_call(
    graph: &EGraph,
    class: EClassId,
    subst: &Subst,
    name: Ident,
    args: &[Pattern],
) -> Vec<Subst> {
    let mut out = Vec::new();
    for node in graph.get_nodes(class) {
        let ENode::Call(call_name, call_args) = node else {
            continue;
        };
        if *call_name != name || call_args.len() != args.len() {
            continue;
        }
        let mut substs = vec![subst.clone()];
        for (pattern_arg, &eclass_arg) in args.iter().zip(call_args.iter()) {
            let mut next = Vec::new();
            for s in &substs {
                next.extend(match_with(pattern_arg, eclass_arg, graph, s));
            }
            substs = next;
        }
        out.extend(substs);
    }
    out
}

/// Instantiate `pattern` under `subst`, inserting any missing nodes into
/// `graph`.
pub fn instantiate(pattern: &Pattern, subst: &Subst, graph: &mut EGraph) -> EClassId {
    match pattern {
        Pattern::Var(name) => subst.get(name).copied().unwrap_or_else(|| {
            // Rule construction already rejects RHS variables absent from
            // the LHS (`validate_rule`), so a well-formed rule never reaches
            // this arm; fall back to a scalar zero rather than panicking.
            graph.add(ENode::num(0.0))
        }),
        Pattern::Num(bits) => graph.add(ENode::Num(*bits)),
        Pattern::Add(l, r) => {
            let (l, r) = (instantiate(l, subst, graph), instantiate(r, subst, graph));
            graph.add(ENode::Add(l, r))
        }
        Pattern::Sub(l, r) => {
            let (l, r) = (instantiate(l, subst, graph), instantiate(r, subst, graph));
            graph.add(ENode::Sub(l, r))
        }
        Pattern::Mul(l, r) => {
            let (l, r) = (instantiate(l, subst, graph), instantiate(r, subst, graph));
            graph.add(ENode::Mul(l, r))
        }
        Pattern::Div(l, r) => {
            let (l, r) = (instantiate(l, subst, graph), instantiate(r, subst, graph));
            graph.add(ENode::Div(l, r))
        }
        Pattern::Pow(l, r) => {
            let (l, r) = (instantiate(l, subst, graph), instantiate(r, subst, graph));
            graph.add(ENode::Pow(l, r))
        }
        Pattern::Neg(a) => {
            let a = instantiate(a, subst, graph);
            graph.add(ENode::Neg(a))
        }
        Pattern::Inv(a) => {
            let a = instantiate(a, subst, graph);
            graph.add(ENode::Inv(a))
        }
        Pattern::Call(name, args) => {
            let args = args.iter().map(|a| instantiate(a, subst, graph)).collect();
            graph.add(ENode::Call(*name, args))
        }
    }
}

/// Parse a pattern from its s-expression syntax.
///
/// Grammar: whitespace-separated tokens; `?ident` is a variable; a
/// (possibly signed) integer/decimal literal is a number pattern;
/// `(op arg…)` with `op` one of `+ - * / ^ neg inv` is the matching
/// node pattern; any other `(name arg…)` is a call pattern.
///
/// # Errors
/// Returns [`CompileError::InvalidPattern`] if `source` is malformed or
/// contains an unexpected trailing token.
pub fn parse_pattern(source: &str) -> Result<Pattern> {
    let tokens = tokenize(source);
    let mut pos = 0;
    let pattern = parse_tokens(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(CompileError::InvalidPattern {
            token: tokens[pos].clone(),
            msg: "unexpected trailing token".to_owned(),
        });
    }
    Ok(pattern)
}

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' => {
                tokens.push(c.to_string());
                chars.next();
            }
            _ => {
                let mut tok = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    tok.push(c);
                    chars.next();
                }
                tokens.push(tok);
            }
        }
    }
    tokens
}

fn parse_tokens(tokens: &[String], pos: &mut usize) -> Result<Pattern> {
    let Some(tok) = tokens.get(*pos) else {
        return Err(CompileError::InvalidPattern {
            token: String::new(),
            msg: "unexpected end of pattern".to_owned(),
        });
    };
    if tok == "(" {
        *pos += 1;
        let head = tokens.get(*pos).cloned().ok_or_else(|| CompileError::InvalidPattern {
            token: String::new(),
            msg: "expected an operator after '('".to_owned(),
        })?;
        *pos += 1;
        let mut args = Vec::new();
        loop {
            match tokens.get(*pos) {
                Some(t) if t == ")" => {
                    *pos += 1;
                    break;
                }
                Some(_) => args.push(parse_tokens(tokens, pos)?),
                None => {
                    return Err(CompileError::InvalidPattern {
                        token: String::new(),
                        msg: "unterminated '('".to_owned(),
                    });
                }
            }
        }
        return build_composite(&head, args);
    }
    if tok == ")" {
        return Err(CompileError::InvalidPattern {
            token: tok.clone(),
            msg: "unexpected ')'".to_owned(),
        });
    }
    *pos += 1;
    parse_atom(tok)
}

fn two(op: &str, args: Vec<Pattern>) -> Result<(Box<Pattern>, Box<Pattern>)> {
    let got = args.len();
    let [l, r]: [Pattern; 2] = args.try_into().map_err(|_| CompileError::InvalidPattern {
        token: op.to_owned(),
        msg: format!("'{op}' expects exactly 2 arguments, got {got}"),
    })?;
    Ok((Box::new(l), Box::new(r)))
}

fn one(op: &str, args: Vec<Pattern>) -> Result<Box<Pattern>> {
    let got = args.len();
    let [a]: [Pattern; 1] = args.try_into().map_err(|_| CompileError::InvalidPattern {
        token: op.to_owned(),
        msg: format!("'{op}' expects exactly 1 argument, got {got}"),
    })?;
    Ok(Box::new(a))
}

fn build_composite(head: &str, args: Vec<Pattern>) -> Result<Pattern> {
    match head {
        "+" => {
            let (l, r) = two(head, args)?;
            Ok(Pattern::Add(l, r))
        }
        "-" => {
            let (l, r) = two(head, args)?;
            Ok(Pattern::Sub(l, r))
        }
        "*" => {
            let (l, r) = two(head, args)?;
            Ok(Pattern::Mul(l, r))
        }
        "/" => {
            let (l, r) = two(head, args)?;
            Ok(Pattern::Div(l, r))
        }
        "^" => {
            let (l, r) = two(head, args)?;
            Ok(Pattern::Pow(l, r))
        }
        "neg" => Ok(Pattern::Neg(one(head, args)?)),
        "inv" => Ok(Pattern::Inv(one(head, args)?)),
        name => Ok(Pattern::Call(crate::ir::symbol::intern(name), args)),
    }
}

fn parse_atom(tok: &str) -> Result<Pattern> {
    if let Some(name) = tok.strip_prefix('?') {
        if name.is_empty() {
            return Err(CompileError::InvalidPattern {
                token: tok.to_owned(),
                msg: "pattern variable needs a name after '?'".to_owned(),
            });
        }
        return Ok(Pattern::Var(crate::ir::symbol::intern(name)));
    }
    if let Ok(value) = tok.parse::<f64>() {
        return Ok(Pattern::Num(value.to_bits()));
    }
    Err(CompileError::InvalidPattern {
        token: tok.to_owned(),
        msg: "expected a pattern variable ('?name') or a number literal".to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::symbol::intern;

    #[test]
    fn parses_binary_pattern() {
        let pattern = parse_pattern("(+ ?a ?b)").expect("valid pattern");
        assert!(matches!(pattern, Pattern::Add(..)));
    }

    #[test]
    fn parses_negative_number_literal() {
        let pattern = parse_pattern("-1").expect("valid pattern");
        assert_eq!(pattern, Pattern::Num((-1.0f64).to_bits()));
    }

    #[test]
    fn parses_call_pattern() {
        let pattern = parse_pattern("(sqrt ?a)").expect("valid pattern");
        match pattern {
            Pattern::Call(name, args) => {
                assert_eq!(&*name.as_str(), "sqrt");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected a call pattern, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_pattern() {
        assert!(parse_pattern("(+ ?a)").is_err());
        assert!(parse_pattern("?").is_err());
    }

    #[test]
    fn repeated_pattern_variable_requires_same_class() {
        let mut graph = EGraph::new();
        let x = graph.add(ENode::Var(intern("gradc-pattern-test-x")));
        let y = graph.add(ENode::Var(intern("gradc-pattern-test-y")));
        let self_mul = graph.add(ENode::Mul(x, x));
        let cross_mul = graph.add(ENode::Mul(x, y));

        let pattern = parse_pattern("(* ?a ?a)").expect("valid pattern");
        assert_eq!(match_pattern(&pattern, self_mul, &graph).len(), 1);
        assert!(match_pattern(&pattern, cross_mul, &graph).is_empty());
    }
}
