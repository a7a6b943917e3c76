//! Fluent builders for constructing AST nodes in tests, standing in for
//! hand-written pattern/expression literals so test setup stays readable.

use super::{
    Alias, CompareOp, Direction, Expr, ExprKind, NodePattern, Pattern, RelPattern,
    RelationshipChain, Span,
};
use crate::value::Scalar;

fn spanless<T>(kind: T) -> T {
    kind
}

/// Builder for a single `(var:label)` node pattern.
#[derive(Debug, Clone, Default)]
pub struct NodeBuilder {
    var: Option<String>,
    label: Option<String>,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: impl Into<String>) -> Self {
        self.var = Some(name.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn build(self) -> NodePattern {
        NodePattern {
            span: Span::default(),
            var: self.var,
            label: self.label,
            props: Vec::new(),
        }
    }
}

/// Builder for a single relationship chain: `(a)-[r:Label]->(b)`.
#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    nodes: Vec<NodePattern>,
    rels: Vec<RelPattern>,
}

impl ChainBuilder {
    pub fn start(node: NodePattern) -> Self {
        ChainBuilder {
            nodes: vec![node],
            rels: Vec::new(),
        }
    }

    pub fn rel(mut self, var: Option<&str>, label: Option<&str>, direction: Direction, next: NodePattern) -> Self {
        self.rels.push(RelPattern {
            span: Span::default(),
            var: var.map(str::to_string),
            label: label.map(str::to_string),
            direction,
        });
        self.nodes.push(next);
        self
    }

    pub fn build(self) -> RelationshipChain {
        RelationshipChain {
            span: Span::default(),
            nodes: self.nodes,
            rels: self.rels,
        }
    }
}

/// Builder for a `Pattern` (comma-separated chain list).
#[derive(Debug, Clone, Default)]
pub struct PatternBuilder {
    chains: Vec<RelationshipChain>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: RelationshipChain) -> Self {
        self.chains.push(chain);
        self
    }

    pub fn build(self) -> Pattern {
        spanless(Pattern { chains: self.chains })
    }
}

pub fn var_expr(name: impl Into<String>) -> Expr {
    Expr::new(Span::default(), ExprKind::Variable(name.into()))
}

pub fn lit_expr(value: Scalar) -> Expr {
    Expr::new(Span::default(), ExprKind::Literal(value))
}

pub fn prop_expr(var: impl Into<String>, attr: impl Into<String>) -> Expr {
    Expr::new(
        Span::default(),
        ExprKind::PropertyAccess {
            var: var.into(),
            attr: attr.into(),
        },
    )
}

pub fn compare_expr(op: CompareOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(
        Span::default(),
        ExprKind::Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    )
}

pub fn alias(expr: Expr, name: impl Into<String>) -> Alias {
    Alias {
        span: Span::default(),
        expr,
        name: name.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Direction;

    #[test]
    fn builds_a_city_state_chain() {
        let chain = ChainBuilder::start(NodeBuilder::new().var("c").label("City").build())
            .rel(Some("r"), Some("In"), Direction::Right, NodeBuilder::new().var("s").label("State").build())
            .build();
        assert_eq!(chain.nodes.len(), 2);
        assert_eq!(chain.rels.len(), 1);
        assert_eq!(chain.rels[0].direction, Direction::Right);
    }
}
