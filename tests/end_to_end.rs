//! End-to-end scenarios: simple label match, relationship match, WHERE
//! filter, aggregation, trigger firing, assumption restriction.

use factgraph::config::Config;
use factgraph::engine::FactEngine;
use factgraph::fact::Fact;
use factgraph::store::kv::MemoryKvStore;
use factgraph::store::FactStore;
use factgraph::trigger::{OutputKind, TriggerFunctionError};
use factgraph::value::Scalar;
use std::collections::HashMap;
use std::sync::Arc;

fn engine() -> FactEngine {
    FactEngine::new(FactStore::new(Arc::new(MemoryKvStore::new())), &Config::default())
}

#[test]
fn scenario_a_simple_label_match() {
    let e = engine();
    e.insert_fact(Fact::NodeHasLabel { node_id: "n1".into(), label: "Person".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "n2".into(), label: "Person".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "n3".into(), label: "City".into() }).unwrap();

    let mut rows = e.execute_query("MATCH (p:Person) RETURN p", HashMap::new()).unwrap();
    rows.sort_by_key(|r| r["p"].to_string());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["p"], Scalar::Str("n1".to_string()));
    assert_eq!(rows[1]["p"], Scalar::Str("n2".to_string()));
}

#[test]
fn scenario_b_relationship_match() {
    let e = engine();
    e.insert_fact(Fact::NodeHasLabel { node_id: "kalamazoo".into(), label: "City".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "michigan".into(), label: "State".into() }).unwrap();
    e.insert_fact(Fact::RelationshipHasLabel { rel_id: "r1".into(), label: "In".into() }).unwrap();
    e.insert_fact(Fact::RelationshipHasSource { rel_id: "r1".into(), node_id: "kalamazoo".into() }).unwrap();
    e.insert_fact(Fact::RelationshipHasTarget { rel_id: "r1".into(), node_id: "michigan".into() }).unwrap();

    let rows = e
        .execute_query("MATCH (c:City)-[r:In]->(s:State) RETURN c, s", HashMap::new())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["c"], Scalar::Str("kalamazoo".to_string()));
    assert_eq!(rows[0]["s"], Scalar::Str("michigan".to_string()));
}

#[test]
fn scenario_c_where_filter() {
    let e = engine();
    e.insert_fact(Fact::NodeHasLabel { node_id: "n1".into(), label: "Person".into() }).unwrap();
    e.insert_fact(Fact::NodeHasAttribute { node_id: "n1".into(), attribute: "age".into(), value: Scalar::Int(40) }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "n2".into(), label: "Person".into() }).unwrap();
    e.insert_fact(Fact::NodeHasAttribute { node_id: "n2".into(), attribute: "age".into(), value: Scalar::Int(20) }).unwrap();

    let rows = e
        .execute_query("MATCH (p:Person) WHERE p.age > 30 RETURN p", HashMap::new())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["p"], Scalar::Str("n1".to_string()));
}

#[test]
fn scenario_d_aggregation() {
    let e = engine();
    e.insert_fact(Fact::NodeHasLabel { node_id: "michigan".into(), label: "State".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "kalamazoo".into(), label: "City".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "lansing".into(), label: "City".into() }).unwrap();
    for (rel_id, city) in [("r1", "kalamazoo"), ("r2", "lansing")] {
        e.insert_fact(Fact::RelationshipHasLabel { rel_id: rel_id.into(), label: "In".into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasSource { rel_id: rel_id.into(), node_id: city.into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasTarget { rel_id: rel_id.into(), node_id: "michigan".into() }).unwrap();
    }

    let rows = e
        .execute_query(
            "MATCH (c:City)-[r:In]->(s:State) WITH s, COLLECT(c) AS cities RETURN s, cities",
            HashMap::new(),
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["s"], Scalar::Str("michigan".to_string()));
    match &rows[0]["cities"] {
        Scalar::List(items) => assert_eq!(items.len(), 2),
        other => panic!("expected a list, got {other:?}"),
    }
}

#[test]
fn scenario_e_trigger_firing() {
    let e = engine();
    let function: Arc<dyn Fn(&HashMap<String, Scalar>) -> Result<Scalar, TriggerFunctionError> + Send + Sync> =
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

    let rows = e
        .execute_query("MATCH (c:City) WHERE c.sandy = true RETURN c", HashMap::new())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["c"], Scalar::Str("x".to_string()));
}

#[test]
fn scenario_f_assumption_restricts() {
    let e = engine();
    e.insert_fact(Fact::NodeHasLabel { node_id: "kalamazoo".into(), label: "City".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "michigan".into(), label: "State".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "wisconsin".into(), label: "State".into() }).unwrap();
    e.insert_fact(Fact::RelationshipHasLabel { rel_id: "r1".into(), label: "In".into() }).unwrap();
    e.insert_fact(Fact::RelationshipHasSource { rel_id: "r1".into(), node_id: "kalamazoo".into() }).unwrap();
    e.insert_fact(Fact::RelationshipHasTarget { rel_id: "r1".into(), node_id: "michigan".into() }).unwrap();

    let mut matches = HashMap::new();
    matches.insert("s".to_string(), "michigan".to_string());
    let rows = e
        .execute_query("MATCH (c:City)-[r:In]->(s:State) RETURN c", matches)
        .unwrap();
    assert_eq!(rows, vec![HashMap::from([("c".to_string(), Scalar::Str("kalamazoo".to_string()))])]);

    let mut no_match = HashMap::new();
    no_match.insert("s".to_string(), "wisconsin".to_string());
    let rows = e
        .execute_query("MATCH (c:City)-[r:In]->(s:State) RETURN c", no_match)
        .unwrap();
    assert!(rows.is_empty());
}
