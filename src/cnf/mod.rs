//! # Pattern-to-CNF compiler (C5)
//!
//! Compiles a [`Pattern`] plus an assumption projection into a CNF
//! instance whose satisfying assignments correspond exactly to pattern
//! matches (§4.4): per-variable candidate enumeration, exactly-one and
//! pairwise at-most-one clauses, relationship endpoint implication
//! clauses, and assumption unit clauses, lowered directly to signed
//! integer clauses as they're generated.

pub mod constraint;

use crate::ast::{Direction, Pattern};
use crate::store::{FactStore, StoreError};
use constraint::Candidate;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    /// No candidate set, an endpoint mismatch, or an assumption outside the
    /// candidate set makes the pattern trivially unsatisfiable. Per §7 this
    /// is not surfaced as a caller-visible error by `execute_query` — the
    /// evaluator layer (C7/engine) turns it into an empty `ProjectionList`.
    #[error("pattern is unsatisfiable")]
    Unsat,
    #[error("store error during compilation: {0}")]
    Store(#[from] StoreError),
}

pub type CompileResult<T> = Result<T, CompileError>;

/// A compiled CNF instance: a variable mapping plus a clause list, both in
/// DIMACS-style signed-integer form (positive = the literal, negative =
/// its complement; `0` never appears inside a clause).
#[derive(Debug, Clone)]
pub struct CnfProblem {
    pub num_vars: i32,
    pub clauses: Vec<Vec<i32>>,
    /// `id -> (pattern variable, candidate entity id)`, pattern variables
    /// only — auxiliary direction variables have no entry here.
    pub bindings: HashMap<i32, (String, String)>,
    /// `pattern variable -> candidate ids`, in the same order as
    /// `bindings` would decode them. Used both to build the exactly-one
    /// clauses and, by the solver (C6), to restrict model-blocking to
    /// pattern variables only (§4.5's "Performance note").
    pub pattern_var_ids: HashMap<String, Vec<i32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarKind {
    Node,
    Relationship,
}

struct VarInfo {
    kind: VarKind,
    label: Option<String>,
}

/// Compile `pattern` against `store` under `assumptions` (§4.4).
pub fn compile(
    pattern: &Pattern,
    store: &FactStore,
    assumptions: &HashMap<String, String>,
) -> CompileResult<CnfProblem> {
    let var_info = collect_variable_info(pattern);

    let mut next_id: i32 = 1;
    let mut bindings = HashMap::new();
    let mut pattern_var_ids: HashMap<String, Vec<i32>> = HashMap::new();
    let mut candidate_id_of: HashMap<(String, String), i32> = HashMap::new();
    let mut clauses: Vec<Vec<i32>> = Vec::new();

    for (var, info) in &var_info {
        let candidates = candidates_for(store, info)?;
        if candidates.is_empty() {
            return Err(CompileError::Unsat);
        }
        let mut ids = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let id = next_id;
            next_id += 1;
            bindings.insert(id, (var.clone(), candidate.id().to_string()));
            candidate_id_of.insert((var.clone(), candidate.id().to_string()), id);
            ids.push(id);
        }
        // at-least-one
        clauses.push(ids.clone());
        // pairwise at-most-one
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                clauses.push(vec![-ids[i], -ids[j]]);
            }
        }
        pattern_var_ids.insert(var.clone(), ids);
    }

    for chain in &pattern.chains {
        for (src, rel, tgt) in chain.triples() {
            let (Some(rel_var), Some(src_var), Some(tgt_var)) =
                (&rel.var, &src.var, &tgt.var)
            else {
                // An unnamed endpoint or relationship contributes no
                // variable to pin down, so endpoint implications don't
                // apply to it; the exactly-one clauses above already
                // constrain whatever named variables do exist.
                continue;
            };
            let Some(rel_ids) = pattern_var_ids.get(rel_var).cloned() else {
                continue;
            };
            for rel_id in rel_ids {
                let (_, rel_candidate) = bindings[&rel_id].clone();
                let source = store.source_of(&rel_candidate)?;
                let target = store.target_of(&rel_candidate)?;
                let (Some(s_c), Some(t_c)) = (source, target) else {
                    clauses.push(vec![-rel_id]);
                    continue;
                };
                add_endpoint_clauses(
                    &mut clauses,
                    &mut next_id,
                    rel_id,
                    rel.direction,
                    &candidate_id_of,
                    src_var,
                    &s_c,
                    tgt_var,
                    &t_c,
                );
            }
        }
    }

    for (var, entity_id) in assumptions {
        match candidate_id_of.get(&(var.clone(), entity_id.clone())) {
            Some(&id) => clauses.push(vec![id]),
            None => return Err(CompileError::Unsat),
        }
    }

    Ok(CnfProblem {
        num_vars: next_id - 1,
        clauses,
        bindings,
        pattern_var_ids,
    })
}

/// §4.4 step 3's endpoint implication clauses, with direction handling
/// (§4.4's "Direction handling" / §9's resolved open question): `Right`
/// and `Left` add a plain implication in the appropriate orientation;
/// `Either` adds both orientations behind a fresh auxiliary direction
/// variable so the two directed cases can't mix endpoints.
#[allow(clippy::too_many_arguments)]
fn add_endpoint_clauses(
    clauses: &mut Vec<Vec<i32>>,
    next_id: &mut i32,
    rel_id: i32,
    direction: Direction,
    candidate_id_of: &HashMap<(String, String), i32>,
    src_var: &str,
    s_c: &str,
    tgt_var: &str,
    t_c: &str,
) {
    let src_eq_s = lookup_or_unsat(clauses, candidate_id_of, rel_id, src_var, s_c);
    let tgt_eq_t = lookup_or_unsat(clauses, candidate_id_of, rel_id, tgt_var, t_c);
    let src_eq_t = lookup_or_unsat(clauses, candidate_id_of, rel_id, src_var, t_c);
    let tgt_eq_s = lookup_or_unsat(clauses, candidate_id_of, rel_id, tgt_var, s_c);

    match direction {
        Direction::Right => {
            if let Some(id) = src_eq_s {
                clauses.push(vec![-rel_id, id]);
            }
            if let Some(id) = tgt_eq_t {
                clauses.push(vec![-rel_id, id]);
            }
        }
        Direction::Left => {
            if let Some(id) = src_eq_t {
                clauses.push(vec![-rel_id, id]);
            }
            if let Some(id) = tgt_eq_s {
                clauses.push(vec![-rel_id, id]);
            }
        }
        Direction::Either => {
            let dir = *next_id;
            *next_id += 1;
            if let Some(id) = src_eq_s {
                clauses.push(vec![-rel_id, -dir, id]);
            }
            if let Some(id) = tgt_eq_t {
                clauses.push(vec![-rel_id, -dir, id]);
            }
            if let Some(id) = src_eq_t {
                clauses.push(vec![-rel_id, dir, id]);
            }
            if let Some(id) = tgt_eq_s {
                clauses.push(vec![-rel_id, dir, id]);
            }
        }
    }
}

/// Looks up `id(var, candidate)`. If `var` has no such candidate, the
/// implication can never hold for this `rel_id`, so we record a unit
/// clause forbidding `rel_id` and return `None` so the caller skips adding
/// a (vacuous) implication clause.
fn lookup_or_unsat(
    clauses: &mut Vec<Vec<i32>>,
    candidate_id_of: &HashMap<(String, String), i32>,
    rel_id: i32,
    var: &str,
    candidate: &str,
) -> Option<i32> {
    match candidate_id_of.get(&(var.to_string(), candidate.to_string())) {
        Some(&id) => Some(id),
        None => {
            clauses.push(vec![-rel_id]);
            None
        }
    }
}

fn candidates_for(store: &FactStore, info: &VarInfo) -> CompileResult<Vec<Candidate>> {
    match (info.kind, &info.label) {
        (VarKind::Node, Some(label)) => Ok(store
            .nodes_with_label(label)?
            .into_iter()
            .map(Candidate::Node)
            .collect()),
        (VarKind::Node, None) => Ok(store
            .all_node_ids()?
            .into_iter()
            .map(Candidate::Node)
            .collect()),
        (VarKind::Relationship, Some(label)) => Ok(store
            .relationships_with_label(label)?
            .into_iter()
            .map(Candidate::Relationship)
            .collect()),
        (VarKind::Relationship, None) => Ok(store
            .all_relationship_ids()?
            .into_iter()
            .map(Candidate::Relationship)
            .collect()),
    }
}

fn collect_variable_info(pattern: &Pattern) -> HashMap<String, VarInfo> {
    let mut vars: HashMap<String, VarInfo> = HashMap::new();
    for chain in &pattern.chains {
        for node in &chain.nodes {
            if let Some(var) = &node.var {
                let entry = vars.entry(var.clone()).or_insert_with(|| VarInfo {
                    kind: VarKind::Node,
                    label: None,
                });
                if entry.label.is_none() {
                    entry.label = node.label.clone();
                }
            }
        }
        for rel in &chain.rels {
            if let Some(var) = &rel.var {
                let entry = vars.entry(var.clone()).or_insert_with(|| VarInfo {
                    kind: VarKind::Relationship,
                    label: None,
                });
                if entry.label.is_none() {
                    entry.label = rel.label.clone();
                }
            }
        }
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::Fact;
    use crate::parser::parse;
    use crate::store::kv::MemoryKvStore;
    use std::sync::Arc;

    fn store() -> FactStore {
        FactStore::new(Arc::new(MemoryKvStore::new()))
    }

    #[test]
    fn label_match_yields_exactly_one_clause_per_candidate() {
        let s = store();
        s.put(&Fact::NodeHasLabel { node_id: "n1".into(), label: "Person".into() }).unwrap();
        s.put(&Fact::NodeHasLabel { node_id: "n2".into(), label: "Person".into() }).unwrap();
        let cypher = parse("MATCH (p:Person) RETURN p").unwrap();
        let cnf = compile(&cypher.match_.pattern, &s, &HashMap::new()).unwrap();
        assert_eq!(cnf.pattern_var_ids["p"].len(), 2);
        // at-least-one + one pairwise exclusion
        assert_eq!(cnf.clauses.len(), 2);
    }

    #[test]
    fn no_candidates_is_unsat() {
        let s = store();
        let cypher = parse("MATCH (p:Person) RETURN p").unwrap();
        assert_eq!(
            compile(&cypher.match_.pattern, &s, &HashMap::new()),
            Err(CompileError::Unsat)
        );
    }

    #[test]
    fn relationship_pattern_adds_endpoint_clauses() {
        let s = store();
        s.put(&Fact::NodeHasLabel { node_id: "kalamazoo".into(), label: "City".into() }).unwrap();
        s.put(&Fact::NodeHasLabel { node_id: "michigan".into(), label: "State".into() }).unwrap();
        s.put(&Fact::RelationshipHasLabel { rel_id: "r1".into(), label: "In".into() }).unwrap();
        s.put(&Fact::RelationshipHasSource { rel_id: "r1".into(), node_id: "kalamazoo".into() }).unwrap();
        s.put(&Fact::RelationshipHasTarget { rel_id: "r1".into(), node_id: "michigan".into() }).unwrap();
        let cypher = parse("MATCH (c:City)-[r:In]->(s:State) RETURN c, s").unwrap();
        let cnf = compile(&cypher.match_.pattern, &s, &HashMap::new()).unwrap();
        assert!(cnf.clauses.len() > 3);
    }

    #[test]
    fn assumption_outside_candidates_is_unsat() {
        let s = store();
        s.put(&Fact::NodeHasLabel { node_id: "n1".into(), label: "Person".into() }).unwrap();
        let cypher = parse("MATCH (p:Person) RETURN p").unwrap();
        let mut assumptions = HashMap::new();
        assumptions.insert("p".to_string(), "nonexistent".to_string());
        assert_eq!(
            compile(&cypher.match_.pattern, &s, &assumptions),
            Err(CompileError::Unsat)
        );
    }
}
