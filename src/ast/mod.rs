//! # Cypher-subset AST (C4)
//!
//! Tagged node variants for the MATCH/WITH/WHERE/RETURN fragment of
//! Cypher described in §4.2's grammar. Every node records its source
//! `Span` for error messages, and `Expr` supports a uniform, non-recursive
//! traversal (`Expr::walk`) used by the evaluator and by aggregation
//! detection.

pub mod builders;

use crate::value::Scalar;
use std::collections::HashSet;

/// Byte-offset range in the original query string, used for error
/// messages (`SyntaxError` carries an offset into the same string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// Relationship arrow direction, per §4.2's grammar productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `-[r]->`
    Right,
    /// `<-[r]-`
    Left,
    /// `-[r]-`. §4.4's "Direction handling" requires this be resolved by
    /// producing the disjunction of both directed cases at CNF-compile
    /// time (chosen over rejecting at parse time per §9's open question).
    Either,
}

/// `(var:label)` — a node pattern element.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub span: Span,
    pub var: Option<String>,
    pub label: Option<String>,
    /// `{key: expr, ...}` property map. Not used by the CNF compiler
    /// (§4.4 matches only on label), kept for parse fidelity and
    /// available to WHERE-equivalent inline filtering if ever needed.
    pub props: Vec<(String, Expr)>,
}

/// `-[var:label]->` — a relationship pattern element.
#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    pub span: Span,
    pub var: Option<String>,
    pub label: Option<String>,
    pub direction: Direction,
}

/// One `node (rel node)*` chain from `rel_chain` (§4.2). `nodes.len() ==
/// rels.len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipChain {
    pub span: Span,
    pub nodes: Vec<NodePattern>,
    pub rels: Vec<RelPattern>,
}

impl RelationshipChain {
    /// Decompose a chain of length N into its N-1 consecutive (src, rel,
    /// tgt) triples — the unit the CNF compiler (§4.4) consumes.
    pub fn triples(&self) -> impl Iterator<Item = (&NodePattern, &RelPattern, &NodePattern)> {
        self.rels
            .iter()
            .enumerate()
            .map(move |(i, r)| (&self.nodes[i], r, &self.nodes[i + 1]))
    }

    pub fn node_vars(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|n| n.var.as_deref())
    }

    pub fn rel_vars(&self) -> impl Iterator<Item = &str> {
        self.rels.iter().filter_map(|r| r.var.as_deref())
    }
}

/// `rel_chain_list` — the full MATCH pattern, comma-separated chains.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    pub chains: Vec<RelationshipChain>,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Comparison operators (three-valued per §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// An expression node, with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Scalar),
    Variable(String),
    /// `var.attr` — §4.3's `ObjectAttributeLookup`.
    PropertyAccess { var: String, attr: String },
    Arithmetic {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Comparison {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `COLLECT(expr)` — aggregation (§4.6).
    Collect(Box<Expr>),
    /// `SIZE(expr)` — aggregation, typically `SIZE(COLLECT(expr))` (§4.6).
    Size(Box<Expr>),
    /// A generic function call, e.g. an arbitrary scalar function applied
    /// to its arguments. Kept for grammar completeness (§4.2's
    /// `function(expr, ...)` production); the evaluator only knows the
    /// builtins it registers and raises `TypeError` for the rest.
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Expr { span, kind }
    }

    /// Direct sub-expressions, in evaluation order. Leaves return `&[]`.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) | ExprKind::PropertyAccess { .. } => {
                vec![]
            }
            ExprKind::Arithmetic { lhs, rhs, .. } | ExprKind::Comparison { lhs, rhs, .. } => {
                vec![lhs, rhs]
            }
            ExprKind::And(l, r) | ExprKind::Or(l, r) => vec![l, r],
            ExprKind::Not(e) | ExprKind::Collect(e) | ExprKind::Size(e) => vec![e],
            ExprKind::Call { args, .. } => args.iter().collect(),
        }
    }

    /// Non-recursive pre-order traversal over this expression and all of
    /// its descendants (§9: explicit traversal iterator instead of a
    /// recursive generator mixin).
    pub fn walk(&self) -> TraversalIter<'_> {
        TraversalIter { stack: vec![self] }
    }

    /// An alias is "aggregated" iff any sub-node is `Collect` or `Size`
    /// (§4.6).
    pub fn is_aggregated(&self) -> bool {
        self.walk()
            .any(|e| matches!(e.kind, ExprKind::Collect(_) | ExprKind::Size(_)))
    }

    /// Every `Variable` and property-lookup base variable referenced,
    /// transitively.
    pub fn variables(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        for e in self.walk() {
            match &e.kind {
                ExprKind::Variable(name) => {
                    out.insert(name.clone());
                }
                ExprKind::PropertyAccess { var, .. } => {
                    out.insert(var.clone());
                }
                _ => {}
            }
        }
        out
    }
}

/// Non-recursive pre-order iterator over an `Expr` tree.
pub struct TraversalIter<'a> {
    stack: Vec<&'a Expr>,
}

impl<'a> Iterator for TraversalIter<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse so traversal order matches left-to-right.
        for child in node.children().into_iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// `expr [AS name]` — one projection element.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub span: Span,
    pub expr: Expr,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WithClause {
    pub span: Span,
    pub aliases: Vec<Alias>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub span: Span,
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnClause {
    pub span: Span,
    pub aliases: Vec<Alias>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub span: Span,
    pub pattern: Pattern,
    pub with: Option<WithClause>,
    pub where_: Option<WhereClause>,
}

/// The root AST node for a compiled query: `MATCH ... RETURN ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cypher {
    pub span: Span,
    pub match_: Match,
    pub return_: ReturnClause,
}

impl Cypher {
    /// All pattern node/relationship variables bound by the MATCH clause.
    pub fn pattern_variables(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        for chain in &self.match_.pattern.chains {
            out.extend(chain.node_vars().map(str::to_string));
            out.extend(chain.rel_vars().map(str::to_string));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(n: i64) -> Expr {
        Expr::new(Span::default(), ExprKind::Literal(Scalar::Int(n)))
    }

    #[test]
    fn collect_marks_alias_aggregated() {
        let e = Expr::new(Span::default(), ExprKind::Collect(Box::new(lit(1))));
        assert!(e.is_aggregated());
        assert!(!lit(1).is_aggregated());
    }

    #[test]
    fn walk_visits_every_descendant() {
        let inner = Expr::new(
            Span::default(),
            ExprKind::Arithmetic {
                op: ArithOp::Add,
                lhs: Box::new(lit(1)),
                rhs: Box::new(lit(2)),
            },
        );
        let outer = Expr::new(Span::default(), ExprKind::Not(Box::new(inner)));
        assert_eq!(outer.walk().count(), 4); // Not, Arithmetic, 1, 2
    }

    #[test]
    fn variables_collects_property_access_base() {
        let e = Expr::new(
            Span::default(),
            ExprKind::PropertyAccess {
                var: "p".into(),
                attr: "age".into(),
            },
        );
        let vars = e.variables();
        assert!(vars.contains("p"));
    }
}
