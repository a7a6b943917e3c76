//! # Parser (C3)
//!
//! Recursive-descent parser over the token stream from [`lexer`],
//! producing the typed `Cypher` AST (C4) for the grammar in §4.2:
//!
//! ```text
//! cypher      := query
//! query       := match_clause [with_clause] [where_clause] return_clause
//! match_clause:= "MATCH" rel_chain_list
//! rel_chain_list := rel_chain { "," rel_chain }
//! rel_chain   := node { relationship node }
//! node        := "(" [var] [":" label] [ "{" prop_map "}" ] ")"
//! relationship:= "-[" [var] [":" label] "]->" | "<-[" ... "]-" | "-[" ... "]-"
//! with_clause := "WITH" alias_list
//! where_clause:= "WHERE" bool_expr
//! return_clause := "RETURN" alias_list
//! ```
//!
//! The parser does no semantic checking (§4.2): unknown variables,
//! duplicate aliases, and type errors are all left to later stages.

pub mod lexer;

use crate::ast::{
    Alias, ArithOp, CompareOp, Cypher, Direction, Expr, ExprKind, Match, NodePattern, Pattern,
    RelPattern, RelationshipChain, ReturnClause, Span, WhereClause, WithClause,
};
use crate::value::Scalar;
use lexer::{tokenize, LexError, Token, TokenKind};
use thiserror::Error;

/// §7's `SyntaxError`: an offset into the source, what was expected, and
/// what was actually found.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("syntax error at offset {offset}: expected {expected}, got {got}")]
pub struct SyntaxError {
    pub offset: usize,
    pub expected: String,
    pub got: String,
}

impl From<LexError> for SyntaxError {
    fn from(e: LexError) -> Self {
        SyntaxError {
            offset: e.offset,
            expected: "a valid token".to_string(),
            got: e.message,
        }
    }
}

pub fn parse(source: &str) -> Result<Cypher, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut p = Parser { tokens, pos: 0 };
    let cypher = p.parse_cypher()?;
    p.expect(&TokenKind::Eof)?;
    Ok(cypher)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn error(&self, expected: impl Into<String>) -> SyntaxError {
        let tok = self.peek();
        SyntaxError {
            offset: tok.start,
            expected: expected.into(),
            got: tok.kind.to_string(),
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, SyntaxError> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("{kind}")))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("identifier")),
        }
    }

    // ---- top level ----

    fn parse_cypher(&mut self) -> Result<Cypher, SyntaxError> {
        let start = self.peek().start;
        let match_ = self.parse_match()?;
        let return_ = self.parse_return()?;
        let end = self.tokens[self.pos.saturating_sub(1)].end;
        Ok(Cypher {
            span: Span::new(start, end),
            match_,
            return_,
        })
    }

    fn parse_match(&mut self) -> Result<Match, SyntaxError> {
        let start_tok = self.expect(&TokenKind::Match)?;
        let pattern = self.parse_pattern()?;
        let with = if self.peek().kind == TokenKind::With {
            Some(self.parse_with()?)
        } else {
            None
        };
        let where_ = if self.peek().kind == TokenKind::Where {
            Some(self.parse_where()?)
        } else {
            None
        };
        let end = self.tokens[self.pos.saturating_sub(1)].end;
        Ok(Match {
            span: Span::new(start_tok.start, end),
            pattern,
            with,
            where_,
        })
    }

    fn parse_pattern(&mut self) -> Result<Pattern, SyntaxError> {
        let mut chains = vec![self.parse_chain()?];
        while self.eat(&TokenKind::Comma) {
            chains.push(self.parse_chain()?);
        }
        Ok(Pattern { chains })
    }

    fn parse_chain(&mut self) -> Result<RelationshipChain, SyntaxError> {
        let first = self.parse_node()?;
        let start = first.span.start;
        let mut nodes = vec![first];
        let mut rels = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Dash | TokenKind::ArrowLeft => {
                    let rel = self.parse_relationship()?;
                    let node = self.parse_node()?;
                    rels.push(rel);
                    nodes.push(node);
                }
                _ => break,
            }
        }
        let end = nodes.last().unwrap().span.end;
        Ok(RelationshipChain {
            span: Span::new(start, end),
            nodes,
            rels,
        })
    }

    fn parse_node(&mut self) -> Result<NodePattern, SyntaxError> {
        let open = self.expect(&TokenKind::LParen)?;
        let var = match self.peek().kind.clone() {
            TokenKind::Ident(_) => Some(self.ident()?),
            _ => None,
        };
        let label = if self.eat(&TokenKind::Colon) {
            Some(self.ident()?)
        } else {
            None
        };
        let props = if self.eat(&TokenKind::LBrace) {
            self.parse_prop_map()?
        } else {
            Vec::new()
        };
        let close = self.expect(&TokenKind::RParen)?;
        Ok(NodePattern {
            span: Span::new(open.start, close.end),
            var,
            label,
            props,
        })
    }

    fn parse_prop_map(&mut self) -> Result<Vec<(String, Expr)>, SyntaxError> {
        let mut props = Vec::new();
        if self.peek().kind != TokenKind::RBrace {
            loop {
                let key = self.ident()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expr()?;
                props.push((key, value));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(props)
    }

    fn parse_relationship(&mut self) -> Result<RelPattern, SyntaxError> {
        let start = self.peek().start;
        let left_arrow = self.eat(&TokenKind::ArrowLeft);
        if !left_arrow {
            self.expect(&TokenKind::Dash)?;
        }
        self.expect(&TokenKind::LBracket)?;
        let var = match self.peek().kind.clone() {
            TokenKind::Ident(_) => Some(self.ident()?),
            _ => None,
        };
        let label = if self.eat(&TokenKind::Colon) {
            Some(self.ident()?)
        } else {
            None
        };
        self.expect(&TokenKind::RBracket)?;
        let direction = if left_arrow {
            self.expect(&TokenKind::Dash)?;
            Direction::Left
        } else if self.eat(&TokenKind::ArrowRight) {
            Direction::Right
        } else {
            self.expect(&TokenKind::Dash)?;
            Direction::Either
        };
        let end = self.tokens[self.pos.saturating_sub(1)].end;
        Ok(RelPattern {
            span: Span::new(start, end),
            var,
            label,
            direction,
        })
    }

    fn parse_with(&mut self) -> Result<WithClause, SyntaxError> {
        let start = self.expect(&TokenKind::With)?.start;
        let aliases = self.parse_alias_list()?;
        let end = self.tokens[self.pos.saturating_sub(1)].end;
        Ok(WithClause {
            span: Span::new(start, end),
            aliases,
        })
    }

    fn parse_where(&mut self) -> Result<WhereClause, SyntaxError> {
        let start = self.expect(&TokenKind::Where)?.start;
        let predicate = self.parse_expr()?;
        let end = predicate.span.end;
        Ok(WhereClause {
            span: Span::new(start, end),
            predicate,
        })
    }

    fn parse_return(&mut self) -> Result<ReturnClause, SyntaxError> {
        let start = self.expect(&TokenKind::Return)?.start;
        let aliases = self.parse_alias_list()?;
        let end = self.tokens[self.pos.saturating_sub(1)].end;
        Ok(ReturnClause {
            span: Span::new(start, end),
            aliases,
        })
    }

    fn parse_alias_list(&mut self) -> Result<Vec<Alias>, SyntaxError> {
        let mut aliases = vec![self.parse_alias()?];
        while self.eat(&TokenKind::Comma) {
            aliases.push(self.parse_alias()?);
        }
        Ok(aliases)
    }

    fn parse_alias(&mut self) -> Result<Alias, SyntaxError> {
        let expr = self.parse_expr()?;
        let start = expr.span.start;
        let (name, end) = if self.eat(&TokenKind::As) {
            let n = self.ident()?;
            (n, self.tokens[self.pos.saturating_sub(1)].end)
        } else {
            (default_alias_name(&expr), expr.span.end)
        };
        Ok(Alias {
            span: Span::new(start, end),
            expr,
            name,
        })
    }

    // ---- expressions, precedence-climbing ----

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Expr::new(span, ExprKind::Or(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_not()?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Expr::new(span, ExprKind::And(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek().kind == TokenKind::Not {
            let start = self.advance().start;
            let inner = self.parse_not()?;
            let end = inner.span.end;
            Ok(Expr::new(Span::new(start, end), ExprKind::Not(Box::new(inner))))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek().kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Ge => CompareOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_additive()?;
        let span = Span::new(lhs.span.start, rhs.span.end);
        Ok(Expr::new(
            span,
            ExprKind::Comparison {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        ))
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Dash => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Expr::new(
                span,
                ExprKind::Arithmetic {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => ArithOp::Mul,
                TokenKind::Slash => ArithOp::Div,
                TokenKind::Percent => ArithOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Expr::new(
                span,
                ExprKind::Arithmetic {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek().kind == TokenKind::Dash {
            let start = self.advance().start;
            let inner = self.parse_unary()?;
            let end = inner.span.end;
            return Ok(Expr::new(
                Span::new(start, end),
                ExprKind::Arithmetic {
                    op: ArithOp::Sub,
                    lhs: Box::new(Expr::new(Span::new(start, start), ExprKind::Literal(Scalar::Int(0)))),
                    rhs: Box::new(inner),
                },
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::new(Span::new(tok.start, tok.end), ExprKind::Literal(Scalar::Int(n))))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(Expr::new(Span::new(tok.start, tok.end), ExprKind::Literal(Scalar::Float(x))))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::new(Span::new(tok.start, tok.end), ExprKind::Literal(Scalar::Str(s))))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(Span::new(tok.start, tok.end), ExprKind::Literal(Scalar::Bool(true))))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(Span::new(tok.start, tok.end), ExprKind::Literal(Scalar::Bool(false))))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::new(Span::new(tok.start, tok.end), ExprKind::Literal(Scalar::Null)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                let close = self.expect(&TokenKind::RParen)?;
                Ok(Expr::new(Span::new(tok.start, close.end), inner.kind))
            }
            TokenKind::Ident(name) => {
                self.advance();
                match name.to_uppercase().as_str() {
                    "COLLECT" if self.peek().kind == TokenKind::LParen => {
                        self.advance();
                        let inner = self.parse_expr()?;
                        let close = self.expect(&TokenKind::RParen)?;
                        Ok(Expr::new(
                            Span::new(tok.start, close.end),
                            ExprKind::Collect(Box::new(inner)),
                        ))
                    }
                    "SIZE" if self.peek().kind == TokenKind::LParen => {
                        self.advance();
                        let inner = self.parse_expr()?;
                        let close = self.expect(&TokenKind::RParen)?;
                        Ok(Expr::new(
                            Span::new(tok.start, close.end),
                            ExprKind::Size(Box::new(inner)),
                        ))
                    }
                    _ if self.peek().kind == TokenKind::LParen => {
                        self.advance();
                        let mut args = Vec::new();
                        if self.peek().kind != TokenKind::RParen {
                            args.push(self.parse_expr()?);
                            while self.eat(&TokenKind::Comma) {
                                args.push(self.parse_expr()?);
                            }
                        }
                        let close = self.expect(&TokenKind::RParen)?;
                        Ok(Expr::new(
                            Span::new(tok.start, close.end),
                            ExprKind::Call { name, args },
                        ))
                    }
                    _ if self.peek().kind == TokenKind::Dot => {
                        self.advance();
                        let attr = self.ident()?;
                        let end = self.tokens[self.pos.saturating_sub(1)].end;
                        Ok(Expr::new(
                            Span::new(tok.start, end),
                            ExprKind::PropertyAccess { var: name, attr },
                        ))
                    }
                    _ => Ok(Expr::new(Span::new(tok.start, tok.end), ExprKind::Variable(name))),
                }
            }
            _ => Err(self.error("an expression")),
        }
    }
}

fn default_alias_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Variable(name) => name.clone(),
        ExprKind::PropertyAccess { var, attr } => format!("{var}.{attr}"),
        _ => "expr".to_string(),
    }
}
