//! # SAT-based solution enumerator (C6)
//!
//! Drives a CDCL solver ([`splr`](https://docs.rs/splr)) over the CNF
//! produced by [`crate::cnf`], enumerating every model by adding a
//! blocking clause after each satisfying assignment and re-solving, per
//! §4.5. No SAT crate exists anywhere in the retrieval pack this crate
//! was built from; `splr` is a pure-Rust CDCL solver pulled in from the
//! wider ecosystem to fill that gap (see DESIGN.md).

use crate::cnf::CnfProblem;
use crate::value::Scalar;
use splr::{Certificate, Config, SatSolverIF};
use splr::solver::Solver;
use splr::types::CNFDescription;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Immutable variable-name → bound-value mapping; one per pattern match.
pub type Projection = HashMap<String, Scalar>;

/// Wraps whatever `splr` reports as a plain message rather than the raw
/// external error type, so this type (and everything built on top of it,
/// up through `EngineError`) can derive `Clone`/`PartialEq` without
/// depending on `splr::SolverError`'s own trait impls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("SAT solver error: {0}")]
    Solver(String),
}

pub type SolveResult<T> = Result<T, SolveError>;

/// Enumerate every satisfying model of `problem` and decode each to a
/// [`Projection`] over pattern variables (§4.5). An unsatisfiable `problem`
/// (including the trivial zero-variable case) yields an empty vector —
/// per §7, `UNSAT` is internal, never an error.
pub fn enumerate(problem: &CnfProblem) -> SolveResult<Vec<Projection>> {
    if problem.num_vars == 0 {
        return Ok(Vec::new());
    }
    let mut blocking_clauses: Vec<Vec<i32>> = Vec::new();
    let mut projections = Vec::new();

    loop {
        let mut clauses = problem.clauses.clone();
        clauses.extend(blocking_clauses.iter().cloned());

        let cnf_desc = CNFDescription {
            num_of_variables: problem.num_vars as usize,
            num_of_clauses: clauses.len(),
            pathname: String::new(),
        };
        let mut solver = Solver::instantiate(&Config::default(), &cnf_desc);
        let mut trivially_unsat = false;
        for clause in &clauses {
            if solver.add_clause(clause.clone()).is_err() {
                trivially_unsat = true;
                break;
            }
        }
        if trivially_unsat {
            break;
        }

        match solver.solve() {
            Ok(Certificate::SAT(model)) => {
                let proj = decode(problem, &model);
                blocking_clauses.push(blocking_clause(problem, &model));
                projections.push(proj);
            }
            Ok(Certificate::UNSAT) => break,
            Err(e) => {
                debug!(error = ?e, "solver reported an error mid-enumeration");
                return Err(SolveError::Solver(format!("{e:?}")));
            }
        }
    }

    Ok(projections)
}

/// Decode one model into a `Projection`: for each pattern variable, find
/// the one candidate id that's true and record its binding.
fn decode(problem: &CnfProblem, model: &[i32]) -> Projection {
    let mut proj = Projection::new();
    for (var, ids) in &problem.pattern_var_ids {
        for &id in ids {
            if is_true(model, id) {
                if let Some((_, entity_id)) = problem.bindings.get(&id) {
                    proj.insert(var.clone(), Scalar::Str(entity_id.clone()));
                }
                break;
            }
        }
    }
    proj
}

/// A blocking clause forbidding this exact combination of pattern-variable
/// bindings from being enumerated again. Restricted to pattern variables,
/// never auxiliary direction variables, per §4.5's "Performance note".
fn blocking_clause(problem: &CnfProblem, model: &[i32]) -> Vec<i32> {
    let mut clause = Vec::new();
    for ids in problem.pattern_var_ids.values() {
        for &id in ids {
            if is_true(model, id) {
                clause.push(-id);
            }
        }
    }
    clause
}

fn is_true(model: &[i32], id: i32) -> bool {
    model
        .get((id - 1) as usize)
        .is_some_and(|&lit| lit == id)
}
