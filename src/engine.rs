//! # Top-level fact engine (§6)
//!
//! `FactEngine` is the crate's single public entry point: it owns the
//! fact store, the trigger catalog, and the resubmission queue, and wires
//! together C3 (parser) through C8 (dispatcher) behind the two exposed
//! operations from §6 — `register_trigger` and `execute_query` — plus
//! `insert_fact`, the ingestion-side entry point §2's data-flow diagram
//! calls out as external to the core but which this crate still needs a
//! concrete front door for.

use crate::ast::Cypher;
use crate::cnf::{self, CompileError};
use crate::eval;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::fact::Fact;
use crate::parser::parse;
use crate::queue::{FactQueue, HaltSignal};
use crate::solver::{self, Projection};
use crate::store::FactStore;
use crate::trigger::{self, OutputKind, Trigger, TriggerCatalog, TriggerId};
use crate::value::Scalar;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct FactEngine {
    store: FactStore,
    triggers: TriggerCatalog,
    queue: FactQueue,
    halt: HaltSignal,
    fuel_limit: Option<u64>,
}

impl FactEngine {
    pub fn new(store: FactStore, config: &Config) -> Self {
        FactEngine {
            store,
            triggers: TriggerCatalog::new(),
            queue: FactQueue::bounded(4096),
            halt: HaltSignal::new(),
            fuel_limit: config.dispatch.fuel_limit,
        }
    }

    pub fn halt_signal(&self) -> HaltSignal {
        self.halt.clone()
    }

    /// §6's `register_trigger(query, fn, output) -> TriggerId`.
    pub fn register_trigger(
        &self,
        query: &str,
        parameter_names: Vec<String>,
        function: Arc<dyn Fn(&HashMap<String, Scalar>) -> Result<Scalar, trigger::TriggerFunctionError> + Send + Sync>,
        output: OutputKind,
    ) -> EngineResult<TriggerId> {
        self.triggers
            .register(query, parameter_names, function, output)
            .map_err(EngineError::from)
    }

    /// §6's `execute_query(query, assumptions = ∅) -> ProjectionList`.
    pub fn execute_query(
        &self,
        query: &str,
        assumptions: HashMap<String, String>,
    ) -> EngineResult<Vec<Projection>> {
        let cypher = parse(query)?;
        run_query(&self.store, &cypher, &assumptions)
    }

    /// Insert `fact` (idempotent per §3), then dispatch it and drain any
    /// facts triggers emit in response, to quiescence (§4.7/§5).
    pub fn insert_fact(&self, fact: Fact) -> EngineResult<()> {
        self.store.put(&fact)?;
        self.queue.push(fact).ok();
        self.drain_dispatch()
    }

    /// §4.7's dispatch loop, driven by the resubmission queue rather than
    /// direct recursion so a long trigger chain can't blow the stack.
    fn drain_dispatch(&self) -> EngineResult<()> {
        let mut fuel = self.fuel_limit;
        while let Some(fact) = self.queue.pop() {
            if self.halt.is_raised() {
                break;
            }
            if let Some(remaining) = fuel.as_mut() {
                if *remaining == 0 {
                    warn!("trigger dispatch fuel exhausted, abandoning remaining resubmissions");
                    break;
                }
                *remaining -= 1;
            }
            self.dispatch_one(&fact);
        }
        Ok(())
    }

    fn dispatch_one(&self, fact: &Fact) {
        self.triggers.for_each(|t| {
            let seeds = match trigger::seed_variables(t, fact, &self.store) {
                Ok(seeds) => seeds,
                Err(e) => {
                    error!(trigger = t.id, error = %e, "seed-variable lookup failed");
                    return;
                }
            };
            for (var, entity_id) in seeds {
                self.fire(t, &var, &entity_id);
            }
        });
    }

    fn fire(&self, trigger: &Trigger, var: &str, entity_id: &str) {
        let mut assumptions = HashMap::new();
        assumptions.insert(var.to_string(), entity_id.to_string());

        let projections = match run_query_for_trigger(&self.store, &trigger.compiled_ast, &assumptions) {
            Ok(p) => p,
            Err(e) => {
                error!(trigger = trigger.id, error = %e, "trigger re-query failed");
                return;
            }
        };

        for projection in projections {
            let mut params = HashMap::with_capacity(trigger.parameter_names.len());
            for name in &trigger.parameter_names {
                params.insert(name.clone(), projection.get(name).cloned().unwrap_or(Scalar::Null));
            }
            trigger.call_counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

            let result = (trigger.function)(&params);
            let return_value = match result {
                Ok(v) => v,
                Err(e) => {
                    warn!(trigger = trigger.id, fact = ?var, error = %e, "trigger function errored; skipping this invocation");
                    continue;
                }
            };

            for emitted in emit_facts(&trigger.output_kind, &projection, return_value) {
                if let Err(e) = self.queue.push(emitted.clone()) {
                    error!(trigger = trigger.id, error = %e, "resubmission queue rejected emitted fact");
                    continue;
                }
                if let Err(e) = self.store.put(&emitted) {
                    error!(trigger = trigger.id, error = %e, "failed to persist emitted fact");
                }
                info!(trigger = trigger.id, ?emitted, "trigger emitted fact");
            }
        }
    }
}

/// Compile and solve `cypher.match_.pattern` under `assumptions`, returning
/// `None` in place of an empty vector when the pattern is unsatisfiable so
/// callers can short-circuit before ever touching the evaluator.
fn solve_pattern(
    store: &FactStore,
    cypher: &Cypher,
    assumptions: &HashMap<String, String>,
) -> EngineResult<Option<Vec<Projection>>> {
    let problem = match cnf::compile(&cypher.match_.pattern, store, assumptions) {
        Ok(problem) => problem,
        Err(CompileError::Unsat) => return Ok(None),
        Err(CompileError::Store(e)) => return Err(EngineError::Store(e)),
    };
    Ok(Some(solver::enumerate(&problem)?))
}

fn run_query(store: &FactStore, cypher: &Cypher, assumptions: &HashMap<String, String>) -> EngineResult<Vec<Projection>> {
    match solve_pattern(store, cypher, assumptions)? {
        None => Ok(Vec::new()),
        Some(pattern_projections) => Ok(eval::evaluate(store, cypher, pattern_projections)?),
    }
}

/// Like [`run_query`], but resolves via [`eval::evaluate_with_bindings`] so
/// the returned projections still carry the pattern-variable bindings an
/// `OutputKind` may need even when the trigger's own RETURN clause drops
/// them (see `emit_facts`).
fn run_query_for_trigger(
    store: &FactStore,
    cypher: &Cypher,
    assumptions: &HashMap<String, String>,
) -> EngineResult<Vec<Projection>> {
    match solve_pattern(store, cypher, assumptions)? {
        None => Ok(Vec::new()),
        Some(pattern_projections) => Ok(eval::evaluate_with_bindings(store, cypher, pattern_projections)?),
    }
}

/// Turn a trigger's return value into the facts §4.7 step 2 describes.
/// `NodeRelationship` always emits the triple with a freshly generated
/// `rel_id`; the return value itself is not consumed by that variant
/// (see DESIGN.md's Open Question note).
fn emit_facts(output_kind: &OutputKind, projection: &Projection, return_value: Scalar) -> Vec<Fact> {
    match output_kind {
        OutputKind::VariableAttribute { var, attribute } => match projection.get(var) {
            Some(Scalar::Str(entity_id)) => vec![Fact::NodeHasAttribute {
                node_id: entity_id.clone(),
                attribute: attribute.clone(),
                value: return_value,
            }],
            _ => Vec::new(),
        },
        OutputKind::NodeRelationship { src_var, rel_label, tgt_var } => {
            let (Some(Scalar::Str(src)), Some(Scalar::Str(tgt))) =
                (projection.get(src_var), projection.get(tgt_var))
            else {
                return Vec::new();
            };
            let rel_id = uuid::Uuid::new_v4().to_string();
            vec![
                Fact::RelationshipHasLabel { rel_id: rel_id.clone(), label: rel_label.clone() },
                Fact::RelationshipHasSource { rel_id: rel_id.clone(), node_id: src.clone() },
                Fact::RelationshipHasTarget { rel_id, node_id: tgt.clone() },
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryKvStore;

    fn engine() -> FactEngine {
        FactEngine::new(FactStore::new(Arc::new(MemoryKvStore::new())), &Config::default())
    }

    #[test]
    fn execute_query_returns_matches() {
        let e = engine();
        e.insert_fact(Fact::NodeHasLabel { node_id: "n1".into(), label: "Person".into() }).unwrap();
        let out = e.execute_query("MATCH (p:Person) RETURN p", HashMap::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["p"], Scalar::Str("n1".to_string()));
    }

    #[test]
    fn trigger_fires_on_matching_fact() {
        let e = engine();
        let function: Arc<dyn Fn(&HashMap<String, Scalar>) -> Result<Scalar, trigger::TriggerFunctionError> + Send + Sync> =
            Arc::new(|params| Ok(params.get("b").cloned().unwrap_or(Scalar::Null)));
        e.register_trigger(
            "MATCH (c:City) WITH c.has_beach AS b RETURN b",
            vec!["b".to_string()],
            function,
            OutputKind::VariableAttribute { var: "c".into(), attribute: "sandy".into() },
        )
        .unwrap();

        e.insert_fact(Fact::NodeHasLabel { node_id: "x".into(), label: "City".into() }).unwrap();
        e.insert_fact(Fact::NodeHasAttribute {
            node_id: "x".into(),
            attribute: "has_beach".into(),
            value: Scalar::Bool(true),
        })
        .unwrap();

        let sandy = e.store.get_attribute("x", "sandy").unwrap();
        assert_eq!(sandy, Some(Scalar::Bool(true)));
    }

    #[test]
    fn assumption_restricts_results() {
        let e = engine();
        e.insert_fact(Fact::NodeHasLabel { node_id: "kalamazoo".into(), label: "City".into() }).unwrap();
        e.insert_fact(Fact::NodeHasLabel { node_id: "michigan".into(), label: "State".into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasLabel { rel_id: "r1".into(), label: "In".into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasSource { rel_id: "r1".into(), node_id: "kalamazoo".into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasTarget { rel_id: "r1".into(), node_id: "michigan".into() }).unwrap();

        let mut assumptions = HashMap::new();
        assumptions.insert("s".to_string(), "michigan".to_string());
        let out = e
            .execute_query("MATCH (c:City)-[r:In]->(s:State) RETURN c", assumptions)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["c"], Scalar::Str("kalamazoo".to_string()));

        let mut wrong = HashMap::new();
        wrong.insert("s".to_string(), "wisconsin".to_string());
        let out = e
            .execute_query("MATCH (c:City)-[r:In]->(s:State) RETURN c", wrong)
            .unwrap();
        assert!(out.is_empty());
    }
}
