//! # Evaluator (C7)
//!
//! Evaluates WITH (grouping/aggregation), WHERE (filter), and RETURN
//! (projection) over the stream of pattern projections produced by C6,
//! per §4.6's pipeline: `pattern_projections -> with -> where -> return`.
//! Comparisons and boolean operators use three-valued (Kleene) logic so
//! that `NULL` propagates rather than silently coercing to `false`.

use crate::ast::{ArithOp, Alias, CompareOp, Cypher, Expr, ExprKind, WhereClause, WithClause, ReturnClause};
use crate::solver::Projection;
use crate::store::FactStore;
use crate::value::Scalar;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// A clause references a variable outside its scope (§7; the parser
    /// itself does no semantic checking per §4.2, so this is where an
    /// undeclared name is caught).
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Run the full WITH/WHERE/RETURN pipeline over one query's pattern
/// matches.
pub fn evaluate(
    store: &FactStore,
    cypher: &Cypher,
    pattern_projections: Vec<Projection>,
) -> EvalResult<Vec<Projection>> {
    run_pipeline(store, cypher, pattern_projections, false)
}

/// Like [`evaluate`], but every output row also carries forward the
/// pattern-variable bindings that produced it, overridden by any
/// same-named alias. `execute_query` never calls this: it exists for
/// trigger dispatch, where `OutputKind` may reference a pattern variable
/// (e.g. the node a relationship-valued alias was matched through) that
/// the trigger's own RETURN clause never names.
pub fn evaluate_with_bindings(
    store: &FactStore,
    cypher: &Cypher,
    pattern_projections: Vec<Projection>,
) -> EvalResult<Vec<Projection>> {
    run_pipeline(store, cypher, pattern_projections, true)
}

fn run_pipeline(
    store: &FactStore,
    cypher: &Cypher,
    pattern_projections: Vec<Projection>,
    carry: bool,
) -> EvalResult<Vec<Projection>> {
    let mut scope: HashSet<String> = cypher.pattern_variables();

    let after_with = match &cypher.match_.with {
        Some(with) => {
            for alias in &with.aliases {
                check_vars(&alias.expr, &scope)?;
            }
            let out = eval_with(store, with, &pattern_projections, carry)?;
            scope = with.aliases.iter().map(|a| a.name.clone()).collect();
            out
        }
        None => pattern_projections,
    };

    let after_where = match &cypher.match_.where_ {
        Some(where_) => {
            check_vars(&where_.predicate, &scope)?;
            eval_where(store, &where_.predicate, after_with)?
        }
        None => after_with,
    };

    for alias in &cypher.return_.aliases {
        check_vars(&alias.expr, &scope)?;
    }
    eval_return(store, &cypher.return_, after_where, carry)
}

fn check_vars(expr: &Expr, scope: &HashSet<String>) -> EvalResult<()> {
    for var in expr.variables() {
        if !scope.contains(&var) {
            return Err(EvalError::UnknownVariable(var));
        }
    }
    Ok(())
}

/// §4.6's WITH semantics: plain per-projection mapping if nothing is
/// aggregated, otherwise group-by-then-aggregate.
fn eval_with(store: &FactStore, with: &WithClause, inputs: &[Projection], carry: bool) -> EvalResult<Vec<Projection>> {
    let aggregated: Vec<&Alias> = with.aliases.iter().filter(|a| a.expr.is_aggregated()).collect();
    if aggregated.is_empty() {
        return map_aliases(store, &with.aliases, inputs, carry);
    }

    let group_aliases: Vec<&Alias> = with.aliases.iter().filter(|a| !a.expr.is_aggregated()).collect();
    let mut buckets: Vec<(Vec<Scalar>, Vec<Projection>)> = Vec::new();
    for proj in inputs {
        let mut key = Vec::with_capacity(group_aliases.len());
        for alias in &group_aliases {
            key.push(eval_expr(store, proj, &alias.expr)?);
        }
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(proj.clone()),
            None => buckets.push((key, vec![proj.clone()])),
        }
    }
    // §9's resolved open question: if every alias is aggregated, an empty
    // input still produces one group (the empty tuple) aggregating over
    // nothing.
    if buckets.is_empty() && group_aliases.is_empty() {
        buckets.push((Vec::new(), Vec::new()));
    }

    let mut out = Vec::with_capacity(buckets.len());
    for (key, members) in &buckets {
        let mut next = if carry {
            members.first().cloned().unwrap_or_default()
        } else {
            Projection::new()
        };
        for (alias, value) in group_aliases.iter().zip(key.iter()) {
            next.insert(alias.name.clone(), value.clone());
        }
        for alias in &aggregated {
            next.insert(alias.name.clone(), eval_aggregate(store, members, &alias.expr)?);
        }
        out.push(next);
    }
    Ok(out)
}

/// §4.6's WHERE semantics: keep only projections where the predicate
/// evaluates to the boolean `true`; both `null` and `false` reject.
fn eval_where(store: &FactStore, predicate: &Expr, inputs: Vec<Projection>) -> EvalResult<Vec<Projection>> {
    let mut out = Vec::with_capacity(inputs.len());
    for proj in inputs {
        match eval_expr(store, &proj, predicate)? {
            Scalar::Bool(true) => out.push(proj),
            Scalar::Bool(false) | Scalar::Null => {}
            other => {
                return Err(EvalError::TypeError(format!(
                    "WHERE predicate evaluated to non-boolean '{}'",
                    other.type_name()
                )))
            }
        }
    }
    Ok(out)
}

/// §4.6's RETURN semantics: one output projection per surviving input,
/// keyed by alias name. An aggregated RETURN alias (without an
/// intervening WITH) aggregates over the whole surviving set as a single
/// group.
fn eval_return(store: &FactStore, return_: &ReturnClause, inputs: Vec<Projection>, carry: bool) -> EvalResult<Vec<Projection>> {
    if return_.aliases.iter().any(|a| a.expr.is_aggregated()) {
        let mut next = if carry {
            inputs.first().cloned().unwrap_or_default()
        } else {
            Projection::new()
        };
        for alias in &return_.aliases {
            let value = if alias.expr.is_aggregated() {
                eval_aggregate(store, &inputs, &alias.expr)?
            } else {
                match inputs.first() {
                    Some(proj) => eval_expr(store, proj, &alias.expr)?,
                    None => Scalar::Null,
                }
            };
            next.insert(alias.name.clone(), value);
        }
        return Ok(vec![next]);
    }
    map_aliases(store, &return_.aliases, &inputs, carry)
}

fn map_aliases(store: &FactStore, aliases: &[Alias], inputs: &[Projection], carry: bool) -> EvalResult<Vec<Projection>> {
    let mut out = Vec::with_capacity(inputs.len());
    for proj in inputs {
        let mut next = if carry { proj.clone() } else { Projection::new() };
        for alias in aliases {
            next.insert(alias.name.clone(), eval_expr(store, proj, &alias.expr)?);
        }
        out.push(next);
    }
    Ok(out)
}

/// `Collect`/`Size` evaluated over a bucket of projections (§4.6's
/// aggregation rules). Only the two shapes spec.md names are supported:
/// `Collect(e)` and `Size(Collect(e))`.
fn eval_aggregate(store: &FactStore, bucket: &[Projection], expr: &Expr) -> EvalResult<Scalar> {
    match &expr.kind {
        ExprKind::Collect(inner) => {
            let mut items = Vec::with_capacity(bucket.len());
            for proj in bucket {
                items.push(eval_expr(store, proj, inner)?);
            }
            Ok(Scalar::List(items))
        }
        ExprKind::Size(inner) => match &inner.kind {
            ExprKind::Collect(_) => match eval_aggregate(store, bucket, inner)? {
                Scalar::List(items) => {
                    Ok(Scalar::Int(items.iter().filter(|v| !v.is_null()).count() as i64))
                }
                _ => unreachable!("Collect always evaluates to a List"),
            },
            _ => Err(EvalError::TypeError("SIZE expects COLLECT(...)".to_string())),
        },
        _ => Err(EvalError::TypeError(
            "unsupported aggregation expression (expected COLLECT or SIZE(COLLECT(...)))".to_string(),
        )),
    }
}

/// Evaluate a non-aggregated expression against one projection (§4.6's
/// per-node semantics).
fn eval_expr(store: &FactStore, proj: &Projection, expr: &Expr) -> EvalResult<Scalar> {
    match &expr.kind {
        ExprKind::Literal(v) => Ok(v.clone()),
        ExprKind::Variable(name) => Ok(proj.get(name).cloned().unwrap_or(Scalar::Null)),
        ExprKind::PropertyAccess { var, attr } => match proj.get(var) {
            Some(Scalar::Str(entity_id)) => Ok(store.get_attribute(entity_id, attr)?.unwrap_or(Scalar::Null)),
            _ => Ok(Scalar::Null),
        },
        ExprKind::Arithmetic { op, lhs, rhs } => {
            let l = eval_expr(store, proj, lhs)?;
            let r = eval_expr(store, proj, rhs)?;
            eval_arithmetic(*op, &l, &r)
        }
        ExprKind::Comparison { op, lhs, rhs } => {
            let l = eval_expr(store, proj, lhs)?;
            let r = eval_expr(store, proj, rhs)?;
            Ok(eval_comparison(*op, &l, &r))
        }
        ExprKind::And(l, r) => {
            let a = as_kleene(eval_expr(store, proj, l)?)?;
            let b = as_kleene(eval_expr(store, proj, r)?)?;
            Ok(from_kleene(kleene_and(a, b)))
        }
        ExprKind::Or(l, r) => {
            let a = as_kleene(eval_expr(store, proj, l)?)?;
            let b = as_kleene(eval_expr(store, proj, r)?)?;
            Ok(from_kleene(kleene_or(a, b)))
        }
        ExprKind::Not(inner) => {
            let a = as_kleene(eval_expr(store, proj, inner)?)?;
            Ok(from_kleene(a.map(|b| !b)))
        }
        ExprKind::Collect(_) | ExprKind::Size(_) => Err(EvalError::TypeError(
            "aggregation used outside of a WITH/RETURN alias".to_string(),
        )),
        ExprKind::Call { name, .. } => Err(EvalError::TypeError(format!("unknown function '{name}'"))),
    }
}

fn eval_arithmetic(op: ArithOp, l: &Scalar, r: &Scalar) -> EvalResult<Scalar> {
    if l.is_null() || r.is_null() {
        return Ok(Scalar::Null);
    }
    let (Some(lv), Some(rv)) = (l.as_numeric(), r.as_numeric()) else {
        return Err(EvalError::TypeError(format!(
            "cannot apply arithmetic to {} and {}",
            l.type_name(),
            r.type_name()
        )));
    };
    let result = match op {
        ArithOp::Add => lv + rv,
        ArithOp::Sub => lv - rv,
        ArithOp::Mul => lv * rv,
        ArithOp::Div | ArithOp::Mod => {
            if rv == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            if op == ArithOp::Div {
                lv / rv
            } else {
                lv % rv
            }
        }
    };
    if Scalar::both_int(l, r) && op != ArithOp::Div {
        Ok(Scalar::Int(result as i64))
    } else if Scalar::both_int(l, r) {
        // Integer division still widens to float (`/` is always true
        // division here, matching most Cypher-like engines).
        Ok(Scalar::Float(result))
    } else {
        Ok(Scalar::Float(result))
    }
}

/// Three-valued comparison (§4.6): `null` on either side yields `null`.
fn eval_comparison(op: CompareOp, l: &Scalar, r: &Scalar) -> Scalar {
    if l.is_null() || r.is_null() {
        return Scalar::Null;
    }
    match op {
        CompareOp::Eq => Scalar::Bool(l == r),
        CompareOp::Ne => Scalar::Bool(l != r),
        CompareOp::Lt => l.partial_cmp(r).map_or(Scalar::Null, |o| Scalar::Bool(o.is_lt())),
        CompareOp::Le => l.partial_cmp(r).map_or(Scalar::Null, |o| Scalar::Bool(o.is_le())),
        CompareOp::Gt => l.partial_cmp(r).map_or(Scalar::Null, |o| Scalar::Bool(o.is_gt())),
        CompareOp::Ge => l.partial_cmp(r).map_or(Scalar::Null, |o| Scalar::Bool(o.is_ge())),
    }
}

/// `None` represents Kleene's "unknown" (propagated `null`).
fn as_kleene(value: Scalar) -> EvalResult<Option<bool>> {
    match value {
        Scalar::Null => Ok(None),
        Scalar::Bool(b) => Ok(Some(b)),
        other => Err(EvalError::TypeError(format!(
            "expected boolean or null, got {}",
            other.type_name()
        ))),
    }
}

fn from_kleene(value: Option<bool>) -> Scalar {
    match value {
        Some(b) => Scalar::Bool(b),
        None => Scalar::Null,
    }
}

fn kleene_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn kleene_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{alias, compare_expr, lit_expr, prop_expr, var_expr};
    use crate::fact::Fact;
    use crate::store::kv::MemoryKvStore;
    use std::sync::Arc;

    fn store() -> FactStore {
        FactStore::new(Arc::new(MemoryKvStore::new()))
    }

    #[test]
    fn kleene_and_with_null_and_false() {
        assert_eq!(kleene_and(Some(false), None), Some(false));
        assert_eq!(kleene_and(Some(true), None), None);
        assert_eq!(kleene_and(None, None), None);
    }

    #[test]
    fn kleene_or_with_null_and_true() {
        assert_eq!(kleene_or(Some(true), None), Some(true));
        assert_eq!(kleene_or(Some(false), None), None);
    }

    #[test]
    fn comparison_with_null_is_null() {
        assert_eq!(eval_comparison(CompareOp::Eq, &Scalar::Null, &Scalar::Int(1)), Scalar::Null);
    }

    #[test]
    fn property_lookup_uses_bound_entity_id() {
        let s = store();
        s.put(&Fact::NodeHasAttribute {
            node_id: "n1".into(),
            attribute: "age".into(),
            value: Scalar::Int(40),
        })
        .unwrap();
        let mut proj = Projection::new();
        proj.insert("p".to_string(), Scalar::Str("n1".to_string()));
        let expr = prop_expr("p", "age");
        assert_eq!(eval_expr(&s, &proj, &expr).unwrap(), Scalar::Int(40));
    }

    #[test]
    fn where_filters_on_equality() {
        let s = store();
        let mut a = Projection::new();
        a.insert("a".to_string(), Scalar::Int(40));
        let mut b = Projection::new();
        b.insert("a".to_string(), Scalar::Int(20));
        let predicate = compare_expr(CompareOp::Eq, var_expr("a"), lit_expr(Scalar::Int(40)));
        let kept = eval_where(&s, &predicate, vec![a.clone(), b]).unwrap();
        assert_eq!(kept, vec![a]);
    }

    #[test]
    fn with_aggregates_by_group() {
        let s = store();
        let with = WithClause {
            span: Default::default(),
            aliases: vec![
                alias(var_expr("state"), "name"),
                Alias {
                    span: Default::default(),
                    expr: Expr::new(Default::default(), ExprKind::Collect(Box::new(var_expr("beach")))),
                    name: "bs".to_string(),
                },
            ],
        };
        let mut p1 = Projection::new();
        p1.insert("state".to_string(), Scalar::Str("s1".to_string()));
        p1.insert("beach".to_string(), Scalar::Bool(true));
        let mut p2 = Projection::new();
        p2.insert("state".to_string(), Scalar::Str("s1".to_string()));
        p2.insert("beach".to_string(), Scalar::Bool(false));
        let out = eval_with(&s, &with, &[p1, p2], false).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["bs"], Scalar::List(vec![Scalar::Bool(true), Scalar::Bool(false)]));
    }

    #[test]
    fn evaluate_with_bindings_carries_pattern_var_past_with() {
        let s = store();
        s.put(&Fact::NodeHasAttribute {
            node_id: "x".into(),
            attribute: "has_beach".into(),
            value: Scalar::Bool(true),
        })
        .unwrap();
        let cypher = crate::parser::parse("MATCH (c:City) WITH c.has_beach AS b RETURN b").unwrap();
        let mut proj = Projection::new();
        proj.insert("c".to_string(), Scalar::Str("x".to_string()));

        let out = evaluate_with_bindings(&s, &cypher, vec![proj]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["b"], Scalar::Bool(true));
        // Carried forward even though `c` isn't named by RETURN, so a
        // trigger's `OutputKind` can still resolve it.
        assert_eq!(out[0]["c"], Scalar::Str("x".to_string()));

        let plain = evaluate(&s, &cypher, vec![{
            let mut p = Projection::new();
            p.insert("c".to_string(), Scalar::Str("x".to_string()));
            p
        }])
        .unwrap();
        assert_eq!(plain.len(), 1);
        assert!(!plain[0].contains_key("c"));
    }
}
