//! # Trigger model and catalog (C8, registration half)
//!
//! A [`Trigger`] is the plain record §3 specifies: a compiled query, the
//! RETURN-alias-derived parameter names, a pure function, and an
//! `output_kind` describing how the function's result becomes new facts.
//! Dispatch itself — seed-variable detection and the re-entrant fact loop
//! — lives in `src/engine.rs`, which owns the fact store these triggers
//! run against.
//!
//! The catalog is a `RwLock`-guarded `Vec` of registered definitions
//! assigned incrementing ids, with a human-readable `describe()` for
//! operational visibility. No JSON persistence: trigger functions are
//! closures, not serializable rule bodies.

use crate::ast::{Alias, Cypher, ExprKind};
use crate::fact::Fact;
use crate::parser::{parse, SyntaxError};
use crate::store::{FactStore, StoreResult};
use crate::value::Scalar;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub type TriggerId = u64;

/// How a trigger function's return value becomes new facts (§3, §4.7).
#[derive(Debug, Clone, PartialEq)]
pub enum OutputKind {
    VariableAttribute {
        var: String,
        attribute: String,
    },
    NodeRelationship {
        src_var: String,
        rel_label: String,
        tgt_var: String,
    },
}

/// The offending fact and trigger are logged, not surfaced (§7's
/// `TriggerFunctionError` row).
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerFunctionError(pub String);

impl fmt::Display for TriggerFunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TriggerFunctionError {}

pub type TriggerFnResult = Result<Scalar, TriggerFunctionError>;

/// A registered trigger: the record from §3.
pub struct Trigger {
    pub id: TriggerId,
    pub cypher_source: String,
    pub compiled_ast: Cypher,
    pub parameter_names: Vec<String>,
    pub function: Arc<dyn Fn(&HashMap<String, Scalar>) -> TriggerFnResult + Send + Sync>,
    pub output_kind: OutputKind,
    pub call_counter: AtomicU64,
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("cypher_source", &self.cypher_source)
            .field("parameter_names", &self.parameter_names)
            .field("output_kind", &self.output_kind)
            .field("call_counter", &self.call_counter.load(Ordering::Relaxed))
            .finish()
    }
}

impl Trigger {
    pub fn calls(&self) -> u64 {
        self.call_counter.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TriggerError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// §6: the function's parameter names MUST exactly equal the set of
    /// RETURN alias names.
    #[error("trigger function parameters {given:?} don't match RETURN aliases {expected:?}")]
    ParameterMismatch { expected: Vec<String>, given: Vec<String> },
}

pub type TriggerResult<T> = Result<T, TriggerError>;

/// Parse `cypher_source` and build a `Trigger`, validating that
/// `parameter_names` matches the RETURN alias set (order-insensitive).
pub fn compile_trigger(
    cypher_source: &str,
    parameter_names: Vec<String>,
    function: Arc<dyn Fn(&HashMap<String, Scalar>) -> TriggerFnResult + Send + Sync>,
    output_kind: OutputKind,
    id: TriggerId,
) -> TriggerResult<Trigger> {
    let compiled_ast = parse(cypher_source)?;
    let expected: std::collections::HashSet<&str> =
        compiled_ast.return_.aliases.iter().map(|a| a.name.as_str()).collect();
    let given: std::collections::HashSet<&str> = parameter_names.iter().map(|s| s.as_str()).collect();
    if expected != given {
        return Err(TriggerError::ParameterMismatch {
            expected: compiled_ast.return_.aliases.iter().map(|a| a.name.clone()).collect(),
            given: parameter_names,
        });
    }
    Ok(Trigger {
        id,
        cypher_source: cypher_source.to_string(),
        compiled_ast,
        parameter_names,
        function,
        output_kind,
        call_counter: AtomicU64::new(0),
    })
}

/// `RwLock`-guarded registry of triggers, assigned incrementing ids.
#[derive(Default)]
pub struct TriggerCatalog {
    triggers: RwLock<Vec<Trigger>>,
    next_id: AtomicU64,
}

impl TriggerCatalog {
    pub fn new() -> Self {
        TriggerCatalog {
            triggers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(
        &self,
        cypher_source: &str,
        parameter_names: Vec<String>,
        function: Arc<dyn Fn(&HashMap<String, Scalar>) -> TriggerFnResult + Send + Sync>,
        output_kind: OutputKind,
    ) -> TriggerResult<TriggerId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let trigger = compile_trigger(cypher_source, parameter_names, function, output_kind, id)?;
        self.triggers.write().push(trigger);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.triggers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against every registered trigger in registration order.
    pub fn for_each(&self, mut f: impl FnMut(&Trigger)) {
        for trigger in self.triggers.read().iter() {
            f(trigger);
        }
    }

    /// Human-readable catalog dump, one line per trigger.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for trigger in self.triggers.read().iter() {
            out.push_str(&format!(
                "#{} {} -> {:?} (called {} times)\n",
                trigger.id,
                trigger.cypher_source,
                trigger.output_kind,
                trigger.calls()
            ));
        }
        out
    }
}

/// §4.7 step 1: candidate `(variable -> entity_id)` seeds for `trigger`
/// given a newly-inserted `fact`. Each seed is tried as an assumption
/// (§4.4 step 4) restricting the trigger's query to matches consistent
/// with the fact that just arrived.
pub fn seed_variables(trigger: &Trigger, fact: &Fact, store: &FactStore) -> StoreResult<Vec<(String, String)>> {
    let pattern = &trigger.compiled_ast.match_.pattern;
    let mut seeds = Vec::new();

    match fact {
        Fact::NodeHasLabel { node_id, label } => {
            for chain in &pattern.chains {
                for node in &chain.nodes {
                    if let (Some(var), Some(l)) = (&node.var, &node.label) {
                        if l == label {
                            seeds.push((var.clone(), node_id.clone()));
                        }
                    }
                }
            }
        }
        Fact::NodeHasAttribute { node_id, attribute, .. } => {
            let current_label = store.get_node_label(node_id)?;
            for chain in &pattern.chains {
                for node in &chain.nodes {
                    let Some(var) = &node.var else { continue };
                    if references_attribute(trigger, var, attribute) {
                        seeds.push((var.clone(), node_id.clone()));
                    } else if let (Some(l), Some(cur)) = (&node.label, &current_label) {
                        if l == cur {
                            seeds.push((var.clone(), node_id.clone()));
                        }
                    }
                }
            }
        }
        Fact::RelationshipHasLabel { rel_id, label } => {
            for chain in &pattern.chains {
                for rel in &chain.rels {
                    if let (Some(var), Some(l)) = (&rel.var, &rel.label) {
                        if l == label {
                            seeds.push((var.clone(), rel_id.clone()));
                        }
                    }
                }
            }
        }
        Fact::RelationshipHasAttribute { rel_id, attribute, .. } => {
            let current_label = store.get_relationship_label(rel_id)?;
            for chain in &pattern.chains {
                for rel in &chain.rels {
                    let Some(var) = &rel.var else { continue };
                    if references_attribute(trigger, var, attribute) {
                        seeds.push((var.clone(), rel_id.clone()));
                    } else if let (Some(l), Some(cur)) = (&rel.label, &current_label) {
                        if l == cur {
                            seeds.push((var.clone(), rel_id.clone()));
                        }
                    }
                }
            }
        }
        Fact::RelationshipHasSource { rel_id, .. } | Fact::RelationshipHasTarget { rel_id, .. } => {
            // Not named explicitly in §4.7 ("analogous rules for
            // relationship facts"); endpoints changing can only affect
            // matches through the relationship variable itself, so seed
            // every rel variable whose label (if any) still matches.
            let current_label = store.get_relationship_label(rel_id)?;
            for chain in &pattern.chains {
                for rel in &chain.rels {
                    let Some(var) = &rel.var else { continue };
                    match (&rel.label, &current_label) {
                        (Some(l), Some(cur)) if l == cur => seeds.push((var.clone(), rel_id.clone())),
                        (None, _) => seeds.push((var.clone(), rel_id.clone())),
                        _ => {}
                    }
                }
            }
        }
    }

    seeds.sort();
    seeds.dedup();
    Ok(seeds)
}

/// True if any WITH/RETURN alias contains `var.attribute`.
fn references_attribute(trigger: &Trigger, var: &str, attribute: &str) -> bool {
    let mentions = |alias: &Alias| {
        alias.expr.walk().any(|e| {
            matches!(&e.kind, ExprKind::PropertyAccess { var: v, attr } if v == var && attr == attribute)
        })
    };
    if let Some(with) = &trigger.compiled_ast.match_.with {
        if with.aliases.iter().any(mentions) {
            return true;
        }
    }
    trigger.compiled_ast.return_.aliases.iter().any(mentions)
}
